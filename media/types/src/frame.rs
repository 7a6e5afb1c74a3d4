/*!
    Decoded frame types.
*/

use crate::{ChannelLayout, PixelFormat, Pts, SampleFormat};

/**
    A decoded video frame.

    Pixel data is tightly packed with no row padding. For planar formats
    the planes are stored back to back (Y, then U, then V for
    [`PixelFormat::Yuv420p`]), so the per-plane accessors can slice the
    buffer without carrying separate stride values.
*/
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Raw pixel data, tightly packed.
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format of the data.
    pub format: PixelFormat,
    /// Presentation timestamp (None for frames without timing).
    pub pts: Option<Pts>,
}

impl VideoFrame {
    /**
        Create a new video frame from existing pixel data.
    */
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        pts: Option<Pts>,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format,
            pts,
        }
    }

    /**
        Allocate a zero-filled YUV 4:2:0 frame.

        The luma plane is `width * height` bytes; each chroma plane is
        `ceil(width / 2) * ceil(height / 2)` bytes.
    */
    pub fn alloc_yuv420p(width: u32, height: u32) -> Self {
        let (luma, chroma) = Self::yuv420p_plane_sizes(width, height);
        Self {
            data: vec![0u8; luma + 2 * chroma],
            width,
            height,
            format: PixelFormat::Yuv420p,
            pts: None,
        }
    }

    fn yuv420p_plane_sizes(width: u32, height: u32) -> (usize, usize) {
        let luma = width as usize * height as usize;
        let chroma = (width as usize).div_ceil(2) * (height as usize).div_ceil(2);
        (luma, chroma)
    }

    /**
        Width of the chroma planes for YUV 4:2:0 data.
    */
    pub fn chroma_width(&self) -> u32 {
        self.width.div_ceil(2)
    }

    /**
        Height of the chroma planes for YUV 4:2:0 data.
    */
    pub fn chroma_height(&self) -> u32 {
        self.height.div_ceil(2)
    }

    /**
        The luma (Y) plane. Only valid for [`PixelFormat::Yuv420p`].
    */
    pub fn y_plane(&self) -> &[u8] {
        let (luma, _) = Self::yuv420p_plane_sizes(self.width, self.height);
        &self.data[..luma]
    }

    /**
        The first chroma (U) plane. Only valid for [`PixelFormat::Yuv420p`].
    */
    pub fn u_plane(&self) -> &[u8] {
        let (luma, chroma) = Self::yuv420p_plane_sizes(self.width, self.height);
        &self.data[luma..luma + chroma]
    }

    /**
        The second chroma (V) plane. Only valid for [`PixelFormat::Yuv420p`].
    */
    pub fn v_plane(&self) -> &[u8] {
        let (luma, chroma) = Self::yuv420p_plane_sizes(self.width, self.height);
        &self.data[luma + chroma..luma + 2 * chroma]
    }

    /// Mutable luma plane.
    pub fn y_plane_mut(&mut self) -> &mut [u8] {
        let (luma, _) = Self::yuv420p_plane_sizes(self.width, self.height);
        &mut self.data[..luma]
    }

    /// Mutable U plane.
    pub fn u_plane_mut(&mut self) -> &mut [u8] {
        let (luma, chroma) = Self::yuv420p_plane_sizes(self.width, self.height);
        &mut self.data[luma..luma + chroma]
    }

    /// Mutable V plane.
    pub fn v_plane_mut(&mut self) -> &mut [u8] {
        let (luma, chroma) = Self::yuv420p_plane_sizes(self.width, self.height);
        &mut self.data[luma + chroma..luma + 2 * chroma]
    }
}

/**
    A decoded block of audio samples.

    Sample data is interleaved for multi-channel audio: for stereo F32 the
    byte buffer holds `[L0, R0, L1, R1, ...]`. Decoders interleave planar
    codec output on the way in; the audio encoder re-plans at the codec
    boundary on the way out.
*/
#[derive(Clone, Debug)]
pub struct AudioFrame {
    /// Raw sample data as bytes, interleaved.
    pub data: Vec<u8>,
    /// Number of samples per channel.
    pub samples: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: ChannelLayout,
    /// Sample format.
    pub format: SampleFormat,
    /// Presentation timestamp (None for frames without timing).
    pub pts: Option<Pts>,
}

impl AudioFrame {
    /**
        Create a new audio frame from existing sample data.
    */
    pub fn new(
        data: Vec<u8>,
        samples: usize,
        sample_rate: u32,
        channels: ChannelLayout,
        format: SampleFormat,
        pts: Option<Pts>,
    ) -> Self {
        Self {
            data,
            samples,
            sample_rate,
            channels,
            format,
            pts,
        }
    }

    /**
        Create an F32 frame from interleaved float samples.

        `samples` is the per-channel count; `interleaved` must hold
        `samples * channels` values.
    */
    pub fn from_f32(
        interleaved: &[f32],
        samples: usize,
        sample_rate: u32,
        channels: ChannelLayout,
        pts: Option<Pts>,
    ) -> Self {
        debug_assert_eq!(interleaved.len(), samples * channels.channels() as usize);
        let mut data = Vec::with_capacity(interleaved.len() * 4);
        for sample in interleaved {
            data.extend_from_slice(&sample.to_ne_bytes());
        }
        Self {
            data,
            samples,
            sample_rate,
            channels,
            format: SampleFormat::F32,
            pts,
        }
    }

    /**
        Decode the byte buffer into interleaved f32 samples.

        Returns `None` if the frame is not in [`SampleFormat::F32`].
    */
    pub fn to_f32(&self) -> Option<Vec<f32>> {
        if self.format != SampleFormat::F32 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /**
        Returns the total number of samples (samples per channel * channels).
    */
    pub fn total_samples(&self) -> usize {
        self.samples * self.channels.channels() as usize
    }

    /**
        Returns the expected data length in bytes.
    */
    pub fn expected_data_len(&self) -> usize {
        self.total_samples() * self.format.bytes_per_sample()
    }

    /**
        Returns the duration of this frame based on sample count and rate.
    */
    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.samples as f64 / self.sample_rate as f64)
    }
}

// Ensure frames are Send + Sync
static_assertions::assert_impl_all!(VideoFrame: Send, Sync);
static_assertions::assert_impl_all!(AudioFrame: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn video_frame_construction() {
        let frame = VideoFrame::alloc_yuv420p(64, 48);

        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(frame.format, PixelFormat::Yuv420p);
        assert_eq!(frame.data.len(), 64 * 48 + 2 * 32 * 24);
    }

    #[test]
    fn video_frame_planes() {
        let mut frame = VideoFrame::alloc_yuv420p(64, 48);

        assert_eq!(frame.y_plane().len(), 64 * 48);
        assert_eq!(frame.u_plane().len(), 32 * 24);
        assert_eq!(frame.v_plane().len(), 32 * 24);

        frame.y_plane_mut().fill(200);
        frame.u_plane_mut().fill(100);
        frame.v_plane_mut().fill(50);

        assert!(frame.y_plane().iter().all(|&y| y == 200));
        assert!(frame.u_plane().iter().all(|&u| u == 100));
        assert!(frame.v_plane().iter().all(|&v| v == 50));
    }

    #[test]
    fn video_frame_odd_dimensions() {
        let frame = VideoFrame::alloc_yuv420p(63, 47);

        assert_eq!(frame.chroma_width(), 32);
        assert_eq!(frame.chroma_height(), 24);
        assert_eq!(frame.data.len(), 63 * 47 + 2 * 32 * 24);
    }

    #[test]
    fn audio_frame_f32_round_trip() {
        let samples = [0.0f32, 1.0, -1.0, 0.5, -0.5, 0.25];
        let frame = AudioFrame::from_f32(&samples, 3, 44100, ChannelLayout::Stereo, Some(Pts(0)));

        assert_eq!(frame.samples, 3);
        assert_eq!(frame.format, SampleFormat::F32);
        assert_eq!(frame.data.len(), frame.expected_data_len());
        assert_eq!(frame.to_f32().unwrap(), samples);
    }

    #[test]
    fn audio_frame_to_f32_rejects_other_formats() {
        let frame = AudioFrame::new(
            vec![0u8; 4],
            1,
            44100,
            ChannelLayout::Stereo,
            SampleFormat::S16,
            None,
        );

        assert!(frame.to_f32().is_none());
    }

    #[test]
    fn audio_frame_duration() {
        let frame = AudioFrame::new(
            vec![],
            44100,
            44100,
            ChannelLayout::Stereo,
            SampleFormat::F32,
            None,
        );

        assert_eq!(frame.duration(), Duration::from_secs(1));
    }

    #[test]
    fn audio_frame_total_samples() {
        let frame = AudioFrame::new(
            vec![],
            1536,
            44100,
            ChannelLayout::Stereo,
            SampleFormat::F32,
            None,
        );

        assert_eq!(frame.total_samples(), 1536 * 2);
        assert_eq!(frame.expected_data_len(), 1536 * 2 * 4);
    }
}
