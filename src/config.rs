/*!
    Transcoder configuration and validation.
*/

use std::path::PathBuf;

use media_encode::AudioTarget;
use media_process::FilterBankConfig;
use media_types::{MediaError, Result};

/**
    Bounds for the queues linking pipeline stages.

    Decoded video frames are large (a 4K frame is tens of megabytes), so
    the frame queues are kept tight; compressed packet queues can run
    deeper. None may be unbounded.
*/
#[derive(Clone, Copy, Debug)]
pub struct QueueCapacities {
    /// Demuxer to video decoder.
    pub video_packets: usize,
    /// Demuxer to audio decoder.
    pub audio_packets: usize,
    /// Video decoder to processor, and processor to encoder.
    pub video_frames: usize,
    /// Audio decoder to processor, and processor to encoder.
    pub audio_frames: usize,
    /// Video encoder to muxer.
    pub encoded_video: usize,
    /// Audio encoder to muxer.
    pub encoded_audio: usize,
}

impl Default for QueueCapacities {
    fn default() -> Self {
        Self {
            video_packets: 120,
            audio_packets: 240,
            video_frames: 32,
            audio_frames: 128,
            encoded_video: 128,
            encoded_audio: 256,
        }
    }
}

/**
    Everything `transcode` needs to run.
*/
#[derive(Clone, Debug)]
pub struct TranscodeConfig {
    /// Source container path.
    pub input_path: PathBuf,
    /// Destination container path.
    pub output_path: PathBuf,
    /// Output container format name.
    pub output_format: String,
    /// Stop after this many video packets; 0 means the whole file.
    pub max_video_frames: u64,
    /// Playback speed factor in [0.1, 5.0]; 1.0 disables speed change.
    pub speed_factor: f64,
    /// Rotation angle in degrees; 0.0 disables rotation.
    pub rotation_degrees: f32,
    /// 3x3 box blur toggle.
    pub enable_blur: bool,
    /// Laplacian sharpen toggle.
    pub enable_sharpen: bool,
    /// Grayscale toggle.
    pub enable_grayscale: bool,
    /// Brightness in [0.0, 2.0]; 1.0 is identity.
    pub brightness: f32,
    /// Contrast in [0.0, 2.0]; 1.0 is identity.
    pub contrast: f32,
    /// Audio target format.
    pub target_audio_format: AudioTarget,
    /// Video bitrate in bits per second.
    pub video_bitrate: usize,
    /// Audio bitrate in bits per second.
    pub audio_bitrate: usize,
    /// Audio filter bank, applied when speed change is disabled.
    pub audio_filters: FilterBankConfig,
    /// Queue bounds.
    pub queue_capacities: QueueCapacities,
}

impl TranscodeConfig {
    /**
        A default configuration for the given paths: no speed change, no
        rotation, no filters, AC-3 audio in an AVI container.
    */
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            output_format: "avi".to_string(),
            max_video_frames: 0,
            speed_factor: 1.0,
            rotation_degrees: 0.0,
            enable_blur: false,
            enable_sharpen: false,
            enable_grayscale: false,
            brightness: 1.0,
            contrast: 1.0,
            target_audio_format: AudioTarget::Ac3,
            video_bitrate: 800_000,
            audio_bitrate: 128_000,
            audio_filters: FilterBankConfig::default(),
            queue_capacities: QueueCapacities::default(),
        }
    }

    /**
        Check every parameter before any stage starts.
    */
    pub fn validate(&self) -> Result<()> {
        if !self.speed_factor.is_finite() || !(0.1..=5.0).contains(&self.speed_factor) {
            return Err(MediaError::ConfigInvalid(format!(
                "speed factor {} out of range [0.1, 5.0]",
                self.speed_factor
            )));
        }
        if !(0.0..=2.0).contains(&self.brightness) {
            return Err(MediaError::ConfigInvalid(format!(
                "brightness {} out of range [0.0, 2.0]",
                self.brightness
            )));
        }
        if !(0.0..=2.0).contains(&self.contrast) {
            return Err(MediaError::ConfigInvalid(format!(
                "contrast {} out of range [0.0, 2.0]",
                self.contrast
            )));
        }
        if self.video_bitrate == 0 || self.audio_bitrate == 0 {
            return Err(MediaError::ConfigInvalid("bitrates must be positive".into()));
        }

        let caps = &self.queue_capacities;
        if [
            caps.video_packets,
            caps.audio_packets,
            caps.video_frames,
            caps.audio_frames,
            caps.encoded_video,
            caps.encoded_audio,
        ]
        .contains(&0)
        {
            return Err(MediaError::ConfigInvalid(
                "queue capacities must be positive".into(),
            ));
        }

        if !self.input_path.is_file() {
            return Err(MediaError::ConfigInvalid(format!(
                "input file not found: {}",
                self.input_path.display()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TranscodeConfig {
        TranscodeConfig::new("/nonexistent/in.mp4", "/tmp/out.avi")
    }

    fn expect_invalid(config: &TranscodeConfig, needle: &str) {
        match config.validate() {
            Err(MediaError::ConfigInvalid(message)) => {
                assert!(message.contains(needle), "unexpected message: {message}");
            }
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn speed_bounds_are_inclusive() {
        let mut cfg = config();
        // parameter checks run before the input existence check, so the
        // boundary values surface the file error rather than a range one
        for speed in [0.1, 1.0, 5.0] {
            cfg.speed_factor = speed;
            expect_invalid(&cfg, "input file not found");
        }
    }

    #[test]
    fn speed_outside_bounds_fails() {
        let mut cfg = config();
        cfg.speed_factor = 0.099;
        expect_invalid(&cfg, "speed factor");
        cfg.speed_factor = 5.001;
        expect_invalid(&cfg, "speed factor");
        cfg.speed_factor = f64::NAN;
        expect_invalid(&cfg, "speed factor");
    }

    #[test]
    fn brightness_and_contrast_bounds() {
        let mut cfg = config();
        cfg.brightness = 2.01;
        expect_invalid(&cfg, "brightness");

        let mut cfg = config();
        cfg.contrast = -0.1;
        expect_invalid(&cfg, "contrast");
    }

    #[test]
    fn zero_bitrate_fails() {
        let mut cfg = config();
        cfg.video_bitrate = 0;
        expect_invalid(&cfg, "bitrates");
    }

    #[test]
    fn zero_queue_capacity_fails() {
        let mut cfg = config();
        cfg.queue_capacities.video_frames = 0;
        expect_invalid(&cfg, "queue capacities");
    }

    #[test]
    fn missing_input_fails() {
        expect_invalid(&config(), "input file not found");
    }

    #[test]
    fn valid_config_passes() {
        let input = std::env::temp_dir().join("vidshift-config-test-input");
        std::fs::write(&input, b"stub").unwrap();

        let mut cfg = TranscodeConfig::new(&input, "/tmp/out.avi");
        cfg.speed_factor = 2.0;
        cfg.rotation_degrees = 90.0;
        assert!(cfg.validate().is_ok());

        std::fs::remove_file(&input).unwrap();
    }
}
