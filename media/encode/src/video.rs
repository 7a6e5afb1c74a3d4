/*!
    Video encoder implementation.
*/

use ffmpeg_next::{
    codec::{self, encoder},
    ffi,
    format::Pixel,
    frame::Video as VideoFrameRaw,
    Dictionary, Rational as RawRational,
};
use tracing::debug;

use media_types::{
    CodecId, MediaDuration, MediaError, Packet, PixelFormat, Pts, Rational, Result, StreamType,
    VideoFrame,
};

/**
    Video encoder configuration.
*/
#[derive(Clone, Copy, Debug)]
pub struct VideoEncoderParams {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate; the encoder's time base is its inverse.
    pub fps: i32,
    /// Target bitrate in bits per second.
    pub bitrate: usize,
    /// Output codec.
    pub codec: CodecId,
    /// Keyframe interval.
    pub gop_size: u32,
    /// Maximum consecutive B-frames. Zero keeps dts equal to pts.
    pub max_b_frames: u32,
}

impl VideoEncoderParams {
    /**
        Default MPEG-4 parameters for the given geometry.
    */
    pub fn mpeg4(width: u32, height: u32, fps: i32, bitrate: usize) -> Self {
        Self {
            width,
            height,
            fps,
            bitrate,
            codec: CodecId::Mpeg4,
            gop_size: 12,
            max_b_frames: 0,
        }
    }
}

/**
    The video encoder stage component.

    Accepts planar 8-bit YUV frames at the configured geometry and stamps
    each with `pts = n` for the n-th encoded frame in the `(1, fps)` time
    base, ignoring incoming timestamps; the processor upstream already
    produces the same dense timeline, and re-stamping here keeps the
    encoder correct even if frames were dropped on the way.
*/
pub struct VideoEncoder {
    encoder: encoder::video::Encoder,
    params: VideoEncoderParams,
    time_base: Rational,
    frame_index: i64,
}

impl VideoEncoder {
    /**
        Initialize the encoder.
    */
    pub fn new(params: VideoEncoderParams) -> Result<Self> {
        let id = match params.codec {
            CodecId::Mpeg4 => codec::Id::MPEG4,
            CodecId::H264 => codec::Id::H264,
            other => {
                return Err(MediaError::ConfigInvalid(format!(
                    "{} is not a supported video codec",
                    other.name()
                )))
            }
        };

        let codec = encoder::find(id)
            .ok_or_else(|| MediaError::CodecMissing(format!("{} encoder", params.codec.name())))?;

        let mut context = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| MediaError::CodecInit(e.to_string()))?;

        context.set_width(params.width);
        context.set_height(params.height);
        context.set_format(Pixel::YUV420P);
        context.set_time_base(RawRational(1, params.fps));
        context.set_frame_rate(Some(RawRational(params.fps, 1)));
        context.set_bit_rate(params.bitrate);
        context.set_gop(params.gop_size);
        context.set_max_b_frames(params.max_b_frames as usize);

        let encoder = match params.codec {
            CodecId::Mpeg4 => {
                context.set_qmin(2);
                context.set_qmax(31);
                let mut options = Dictionary::new();
                options.set("mpeg_quant", "1");
                context.open_as_with(codec, options)
            }
            CodecId::H264 => {
                let mut options = Dictionary::new();
                options.set("preset", "fast");
                options.set("tune", "zerolatency");
                context.open_as_with(codec, options)
            }
            _ => context.open_as(codec),
        }
        .map_err(|e| MediaError::CodecInit(e.to_string()))?;

        debug!(
            codec = params.codec.name(),
            width = params.width,
            height = params.height,
            fps = params.fps,
            bitrate = params.bitrate,
            "video encoder opened"
        );

        Ok(Self {
            encoder,
            params,
            time_base: Rational::new(1, params.fps),
            frame_index: 0,
        })
    }

    /**
        Encode one frame, returning the packets the codec produced.

        Frames whose dimensions or layout do not match the configuration
        are rejected; the stage logs and skips them.
    */
    pub fn encode(&mut self, frame: &VideoFrame) -> Result<Vec<Packet>> {
        if frame.width != self.params.width || frame.height != self.params.height {
            return Err(MediaError::EncodeSubmit(format!(
                "frame is {}x{}, encoder configured for {}x{}",
                frame.width, frame.height, self.params.width, self.params.height
            )));
        }
        if frame.format != PixelFormat::Yuv420p {
            return Err(MediaError::UnsupportedFormat(format!(
                "video pixel format {:?}, expected yuv420p",
                frame.format
            )));
        }

        let mut raw = VideoFrameRaw::new(Pixel::YUV420P, frame.width, frame.height);
        fill_plane(
            &mut raw,
            0,
            frame.y_plane(),
            frame.width as usize,
            frame.height as usize,
        );
        let chroma_width = frame.chroma_width() as usize;
        let chroma_height = frame.chroma_height() as usize;
        fill_plane(&mut raw, 1, frame.u_plane(), chroma_width, chroma_height);
        fill_plane(&mut raw, 2, frame.v_plane(), chroma_width, chroma_height);

        raw.set_pts(Some(self.frame_index));
        self.frame_index += 1;

        self.encoder
            .send_frame(&raw)
            .map_err(|e| MediaError::EncodeSubmit(e.to_string()))?;

        self.receive_packets()
    }

    /**
        Drain the codec after the last frame.
    */
    pub fn flush(&mut self) -> Result<Vec<Packet>> {
        self.encoder
            .send_eof()
            .map_err(|e| MediaError::EncodeSubmit(e.to_string()))?;

        self.receive_packets()
    }

    /**
        Number of frames accepted so far.
    */
    pub fn frames_encoded(&self) -> i64 {
        self.frame_index
    }

    fn receive_packets(&mut self) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        let mut packet = ffmpeg_next::Packet::empty();

        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => packets.push(Packet::new(
                    packet.data().map(<[u8]>::to_vec).unwrap_or_default(),
                    packet.pts().map(Pts),
                    packet.dts().map(Pts),
                    MediaDuration(packet.duration()),
                    self.time_base,
                    packet.is_key(),
                    StreamType::Video,
                )),
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(MediaError::EncodeSubmit(e.to_string())),
            }
        }

        Ok(packets)
    }
}

fn fill_plane(raw: &mut VideoFrameRaw, plane: usize, src: &[u8], width: usize, height: usize) {
    let stride = raw.stride(plane);
    let data = raw.data_mut(plane);
    for row in 0..height {
        data[row * stride..row * stride + width].copy_from_slice(&src[row * width..(row + 1) * width]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpeg4_defaults() {
        let params = VideoEncoderParams::mpeg4(1280, 720, 24, 800_000);
        assert_eq!(params.codec, CodecId::Mpeg4);
        assert_eq!(params.gop_size, 12);
        assert_eq!(params.max_b_frames, 0);
        assert_eq!(params.fps, 24);
    }
}
