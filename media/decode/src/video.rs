/*!
    Video decoder implementation.
*/

use ffmpeg_next::{
    codec::{self, decoder::Video as VideoDecoderContext},
    ffi,
    format::Pixel,
    software::scaling::{context::Context as Scaler, flag::Flags},
    util::frame::video::Video as VideoFrameRaw,
};
use tracing::{debug, warn};

use media_source::CodecConfig;
use media_types::{MediaError, Packet, Pts, Result, VideoFrame};

/**
    Video decoder.

    Decodes compressed video packets into tightly packed planar YUV 4:2:0
    frames. Codecs that emit another pixel format are normalized through a
    lazily created software scaler, so every downstream stage sees one
    layout.
*/
pub struct VideoDecoder {
    decoder: VideoDecoderContext,
    scaler: Option<Scaler>,
}

impl VideoDecoder {
    /**
        Create a new video decoder from codec configuration.

        The configuration is consumed; its parameters now belong to the
        decoder's codec context.
    */
    pub fn new(codec_config: CodecConfig) -> Result<Self> {
        let decoder = codec::context::Context::from_parameters(codec_config.into_parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| MediaError::CodecInit(e.to_string()))?;

        Ok(Self {
            decoder,
            scaler: None,
        })
    }

    /**
        Get the coded frame width.
    */
    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    /**
        Get the coded frame height.
    */
    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /**
        Decode a packet, returning all frames the codec produced for it.
    */
    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<VideoFrame>> {
        let mut raw = if packet.data.is_empty() {
            ffmpeg_next::Packet::empty()
        } else {
            ffmpeg_next::Packet::copy(&packet.data)
        };

        raw.set_pts(packet.pts.map(i64::from));
        raw.set_dts(packet.dts.map(i64::from));
        raw.set_duration(packet.duration.0);

        self.decoder
            .send_packet(&raw)
            .map_err(|e| MediaError::DecodeSubmit(e.to_string()))?;

        self.receive_frames()
    }

    /**
        Flush the decoder, returning any remaining buffered frames.

        Call this once at end of stream.
    */
    pub fn flush(&mut self) -> Result<Vec<VideoFrame>> {
        self.decoder
            .send_eof()
            .map_err(|e| MediaError::DecodeSubmit(e.to_string()))?;

        self.receive_frames()
    }

    fn receive_frames(&mut self) -> Result<Vec<VideoFrame>> {
        let mut frames = Vec::new();
        let mut decoded = VideoFrameRaw::empty();

        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => match self.convert_frame(&decoded) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => {
                        warn!(pts = ?decoded.pts(), "video frame conversion failed: {e}");
                    }
                },
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(MediaError::DecodeSubmit(e.to_string())),
            }
        }

        Ok(frames)
    }

    /**
        Copy a raw codec frame into the pipeline's tight YUV 4:2:0 layout,
        converting pixel formats on the way when necessary.
    */
    fn convert_frame(&mut self, decoded: &VideoFrameRaw) -> Result<VideoFrame> {
        let pts = decoded.pts().map(Pts);

        if decoded.format() == Pixel::YUV420P {
            return Ok(copy_yuv420p(decoded, pts));
        }

        // lazily create the normalizing scaler on the first mismatched frame
        if self.scaler.is_none() {
            debug!(format = ?decoded.format(), "normalizing decoded video to yuv420p");
            let scaler = Scaler::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                Pixel::YUV420P,
                decoded.width(),
                decoded.height(),
                Flags::BICUBIC,
            )
            .map_err(|e| MediaError::CodecInit(e.to_string()))?;
            self.scaler = Some(scaler);
        }

        let mut converted = VideoFrameRaw::empty();
        self.scaler
            .as_mut()
            .unwrap()
            .run(decoded, &mut converted)
            .map_err(|e| MediaError::DecodeSubmit(e.to_string()))?;

        Ok(copy_yuv420p(&converted, pts))
    }
}

/**
    Copy the three planes of a YUV 4:2:0 frame row by row, dropping the
    codec's row padding.
*/
fn copy_yuv420p(raw: &VideoFrameRaw, pts: Option<Pts>) -> VideoFrame {
    let width = raw.width();
    let height = raw.height();
    let mut frame = VideoFrame::alloc_yuv420p(width, height);
    frame.pts = pts;

    let chroma_width = frame.chroma_width() as usize;
    let chroma_height = frame.chroma_height() as usize;

    copy_plane(
        frame.y_plane_mut(),
        raw.data(0),
        width as usize,
        height as usize,
        raw.stride(0),
    );
    copy_plane(
        frame.u_plane_mut(),
        raw.data(1),
        chroma_width,
        chroma_height,
        raw.stride(1),
    );
    copy_plane(
        frame.v_plane_mut(),
        raw.data(2),
        chroma_width,
        chroma_height,
        raw.stride(2),
    );

    frame
}

fn copy_plane(dst: &mut [u8], src: &[u8], width: usize, height: usize, stride: usize) {
    for row in 0..height {
        let src_row = &src[row * stride..row * stride + width];
        dst[row * width..(row + 1) * width].copy_from_slice(src_row);
    }
}

impl std::fmt::Debug for VideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("width", &self.decoder.width())
            .field("height", &self.decoder.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_plane_strips_row_padding() {
        // 4x2 plane stored with a stride of 6
        let src = [
            1, 2, 3, 4, 0, 0, //
            5, 6, 7, 8, 0, 0,
        ];
        let mut dst = [0u8; 8];
        copy_plane(&mut dst, &src, 4, 2, 6);
        assert_eq!(dst, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn copy_plane_identity_when_tight() {
        let src = [10u8, 20, 30, 40];
        let mut dst = [0u8; 4];
        copy_plane(&mut dst, &src, 2, 2, 2);
        assert_eq!(dst, src);
    }
}
