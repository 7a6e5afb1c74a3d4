/*!
    The video processing stage.
*/

use tracing::warn;

use media_types::{Pts, Result, VideoFrame};

use crate::filters;
use crate::gpu::RotationGpu;
use crate::scale::RgbConverter;

/// Consecutive GPU failures after which the stage stays on the CPU path.
const GPU_FAILURE_LIMIT: u32 = 3;

/**
    Configuration for the video processor.
*/
#[derive(Clone, Debug)]
pub struct VideoProcessorConfig {
    /// Playback speed factor; 1.0 disables the speed gate.
    pub speed_factor: f64,
    /// Rotation angle in degrees; 0.0 disables the GPU path.
    pub rotation_degrees: f32,
    /// 3x3 box blur on the luma plane.
    pub enable_blur: bool,
    /// Laplacian sharpen on the luma plane.
    pub enable_sharpen: bool,
    /// Neutralize both chroma planes.
    pub enable_grayscale: bool,
    /// Brightness multiplier; 1.0 is identity.
    pub brightness: f32,
    /// Contrast multiplier about mid level; 1.0 is identity.
    pub contrast: f32,
}

impl Default for VideoProcessorConfig {
    fn default() -> Self {
        Self {
            speed_factor: 1.0,
            rotation_degrees: 0.0,
            enable_blur: false,
            enable_sharpen: false,
            enable_grayscale: false,
            brightness: 1.0,
            contrast: 1.0,
        }
    }
}

/**
    The video processor: speed gate, optional GPU rotation, CPU pixel
    filters, and regeneration of a dense frame-indexed timeline.

    Every emitted frame (originals and duplicates alike) receives
    `pts = n` for the n-th emitted frame, so downstream stages see a
    contiguous timeline whatever the gate dropped or duplicated.

    The processor is not `Send`; the GPU context it may own is bound to
    the thread that created it, so the owning stage constructs it on its
    own thread.
*/
pub struct VideoProcessor {
    config: VideoProcessorConfig,
    rgb: Option<RgbConverter>,
    gpu: Option<RotationGpu>,
    gpu_failures: u32,
    input_index: u64,
    output_index: i64,
}

impl VideoProcessor {
    /**
        Create a processor for frames of the given dimensions.

        When rotation is requested, the RGB converters are required (their
        failure is fatal) but a GPU initialization failure only logs a
        warning and pins the stage to the CPU identity path, matching the
        degradation applied when the GPU fails later at runtime.
    */
    pub fn new(config: VideoProcessorConfig, width: u32, height: u32) -> Result<Self> {
        let (rgb, gpu) = if config.rotation_degrees != 0.0 {
            let rgb = RgbConverter::new(width, height)?;
            let gpu = match RotationGpu::new(width, height, config.rotation_degrees) {
                Ok(gpu) => Some(gpu),
                Err(e) => {
                    warn!("GPU rotation unavailable, frames pass through unrotated: {e}");
                    None
                }
            };
            (Some(rgb), gpu)
        } else {
            (None, None)
        };

        Ok(Self {
            config,
            rgb,
            gpu,
            gpu_failures: 0,
            input_index: 0,
            output_index: 0,
        })
    }

    /**
        Process one decoded frame.

        Returns zero frames when the speed gate drops the input, one
        frame ordinarily, and `floor(1/speed)` frames when slow-motion
        duplication is active.
    */
    pub fn process(&mut self, frame: &VideoFrame) -> Vec<VideoFrame> {
        self.input_index += 1;
        if !keep_frame(self.config.speed_factor, self.input_index) {
            return Vec::new();
        }

        let mut output = self.transform(frame);
        if self.config.enable_grayscale {
            filters::apply_grayscale(&mut output);
        }
        if self.config.brightness != 1.0 || self.config.contrast != 1.0 {
            filters::apply_brightness_contrast(
                &mut output,
                self.config.brightness,
                self.config.contrast,
            );
        }
        if self.config.enable_blur {
            filters::apply_blur(&mut output);
        }
        if self.config.enable_sharpen {
            filters::apply_sharpen(&mut output);
        }

        output.pts = Some(Pts(self.next_output_pts()));
        let mut emitted = vec![output];

        if self.config.speed_factor < 1.0 {
            let duplicates = (1.0 / self.config.speed_factor).floor() as usize - 1;
            for _ in 0..duplicates {
                let mut duplicate = emitted[0].clone();
                duplicate.pts = Some(Pts(self.next_output_pts()));
                emitted.push(duplicate);
            }
        }

        emitted
    }

    /**
        Total frames emitted so far.
    */
    pub fn output_frames(&self) -> i64 {
        self.output_index
    }

    fn next_output_pts(&mut self) -> i64 {
        let pts = self.output_index;
        self.output_index += 1;
        pts
    }

    /**
        Rotate through the GPU when available, degrading to an identity
        copy of the input frame on any failure.
    */
    fn transform(&mut self, frame: &VideoFrame) -> VideoFrame {
        if let (Some(rgb), Some(gpu)) = (self.rgb.as_mut(), self.gpu.as_mut()) {
            let rotated = rgb
                .to_rgb(frame)
                .and_then(|packed| gpu.rotate(&packed))
                .and_then(|packed| rgb.to_yuv(&packed));
            match rotated {
                Ok(output) => {
                    self.gpu_failures = 0;
                    return output;
                }
                Err(e) => {
                    warn!(pts = ?frame.pts, "GPU rotation failed, emitting identity frame: {e}");
                    self.gpu_failures += 1;
                    if self.gpu_failures >= GPU_FAILURE_LIMIT {
                        warn!("disabling GPU rotation for the remainder of the stream");
                        self.gpu = None;
                    }
                }
            }
        }
        frame.clone()
    }
}

/**
    The deterministic speed gate, applied to 1-based input frame indices.

    - 1.5x keeps indices where `k % 3 != 0` (two of every three)
    - 2.0x keeps odd indices (every other frame)
    - other factors above 1.0 keep `k % 100 < round(100 / speed)`
    - factors at or below 1.0 keep everything
*/
pub(crate) fn keep_frame(speed: f64, index: u64) -> bool {
    if speed <= 1.0 {
        return true;
    }
    if speed == 1.5 {
        index % 3 != 0
    } else if speed == 2.0 {
        index % 2 == 1
    } else {
        let keep = (100.0 / speed).round() as u64;
        index % 100 < keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::PixelFormat;

    fn processor(config: VideoProcessorConfig) -> VideoProcessor {
        VideoProcessor::new(config, 64, 48).unwrap()
    }

    fn run_frames(processor: &mut VideoProcessor, count: usize) -> Vec<VideoFrame> {
        let frame = VideoFrame::alloc_yuv420p(64, 48);
        let mut emitted = Vec::new();
        for _ in 0..count {
            emitted.extend(processor.process(&frame));
        }
        emitted
    }

    #[test]
    fn gate_keeps_everything_at_unit_speed() {
        assert!((1..=1000).all(|k| keep_frame(1.0, k)));
        assert!((1..=1000).all(|k| keep_frame(0.5, k)));
    }

    #[test]
    fn gate_double_speed_keeps_odd_indices() {
        assert!(keep_frame(2.0, 1));
        assert!(!keep_frame(2.0, 2));
        assert!(keep_frame(2.0, 3));
        let kept = (1..=1200).filter(|&k| keep_frame(2.0, k)).count();
        assert_eq!(kept, 600);
    }

    #[test]
    fn gate_one_and_a_half_drops_every_third() {
        assert!(keep_frame(1.5, 1));
        assert!(keep_frame(1.5, 2));
        assert!(!keep_frame(1.5, 3));
        let kept = (1..=1200).filter(|&k| keep_frame(1.5, k)).count();
        assert_eq!(kept, 800);
    }

    #[test]
    fn gate_generic_ratio_uses_modulo_window() {
        // round(100 / 3.0) = 33 kept per hundred
        let kept = (100..200).filter(|&k| keep_frame(3.0, k)).count();
        assert_eq!(kept, 33);
    }

    #[test]
    fn unit_speed_passes_frames_with_linear_pts() {
        let mut processor = processor(VideoProcessorConfig::default());
        let emitted = run_frames(&mut processor, 10);

        assert_eq!(emitted.len(), 10);
        for (index, frame) in emitted.iter().enumerate() {
            assert_eq!(frame.pts, Some(Pts(index as i64)));
        }
    }

    #[test]
    fn double_speed_halves_frame_count() {
        let mut processor = processor(VideoProcessorConfig {
            speed_factor: 2.0,
            ..Default::default()
        });
        let emitted = run_frames(&mut processor, 1200);

        assert_eq!(emitted.len(), 600);
        let pts: Vec<i64> = emitted.iter().map(|f| f.pts.unwrap().0).collect();
        assert_eq!(pts, (0..600).collect::<Vec<_>>());
    }

    #[test]
    fn one_and_a_half_speed_emits_two_thirds() {
        let mut processor = processor(VideoProcessorConfig {
            speed_factor: 1.5,
            ..Default::default()
        });
        let emitted = run_frames(&mut processor, 1200);

        assert_eq!(emitted.len(), 800);
        assert_eq!(emitted.last().unwrap().pts, Some(Pts(799)));
    }

    #[test]
    fn half_speed_duplicates_each_frame() {
        let mut processor = processor(VideoProcessorConfig {
            speed_factor: 0.5,
            ..Default::default()
        });
        let emitted = run_frames(&mut processor, 1200);

        assert_eq!(emitted.len(), 2400);
        // duplicates get their own contiguous timestamps
        let pts: Vec<i64> = emitted.iter().map(|f| f.pts.unwrap().0).collect();
        assert_eq!(pts, (0..2400).collect::<Vec<_>>());
    }

    #[test]
    fn quarter_speed_emits_four_per_input() {
        let mut processor = processor(VideoProcessorConfig {
            speed_factor: 0.25,
            ..Default::default()
        });
        let emitted = run_frames(&mut processor, 10);

        assert_eq!(emitted.len(), 40);
    }

    #[test]
    fn grayscale_applies_through_the_pipeline() {
        let mut processor = processor(VideoProcessorConfig {
            enable_grayscale: true,
            ..Default::default()
        });

        let mut frame = VideoFrame::alloc_yuv420p(64, 48);
        frame.u_plane_mut().fill(4);
        frame.v_plane_mut().fill(244);

        let emitted = processor.process(&frame);
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].u_plane().iter().all(|&u| u == 128));
        assert!(emitted[0].v_plane().iter().all(|&v| v == 128));
    }

    #[test]
    fn emitted_frames_keep_input_dimensions() {
        let mut processor = processor(VideoProcessorConfig {
            enable_sharpen: true,
            brightness: 1.2,
            contrast: 1.3,
            ..Default::default()
        });

        let emitted = run_frames(&mut processor, 3);
        for frame in &emitted {
            assert_eq!((frame.width, frame.height), (64, 48));
            assert_eq!(frame.format, PixelFormat::Yuv420p);
        }
    }
}
