/*!
    Audio decoder implementation.
*/

use ffmpeg_next::{
    codec::{self, decoder::Audio as AudioDecoderContext},
    ffi,
    format::{sample, Sample},
    util::frame::audio::Audio as AudioFrameRaw,
};
use tracing::warn;

use media_source::CodecConfig;
use media_types::{AudioFrame, ChannelLayout, MediaError, Packet, Pts, Result};

/**
    Audio decoder.

    Decodes compressed audio packets into interleaved f32 frames.
*/
pub struct AudioDecoder {
    decoder: AudioDecoderContext,
}

impl AudioDecoder {
    /**
        Create a new audio decoder from codec configuration.

        The configuration is consumed; its parameters now belong to the
        decoder's codec context.
    */
    pub fn new(codec_config: CodecConfig) -> Result<Self> {
        let decoder = codec::context::Context::from_parameters(codec_config.into_parameters())
            .and_then(|ctx| ctx.decoder().audio())
            .map_err(|e| MediaError::CodecInit(e.to_string()))?;

        Ok(Self { decoder })
    }

    /**
        Get the sample rate of the decoded audio.
    */
    pub fn sample_rate(&self) -> u32 {
        self.decoder.rate()
    }

    /**
        Get the number of channels.
    */
    pub fn channels(&self) -> u16 {
        self.decoder.channels() as u16
    }

    /**
        Decode a packet, returning all frames the codec produced for it.
    */
    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<AudioFrame>> {
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
    pub fn flush(&mut self) -> Result<Vec<AudioFrame>> {
        self.decoder
            .send_eof()
            .map_err(|e| MediaError::DecodeSubmit(e.to_string()))?;

        self.receive_frames()
    }

    fn receive_frames(&mut self) -> Result<Vec<AudioFrame>> {
        let mut frames = Vec::new();
        let mut decoded = AudioFrameRaw::empty();

        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => match convert_frame(&decoded) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => {
                        warn!(pts = ?decoded.pts(), "audio frame conversion failed: {e}");
                    }
                },
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(MediaError::DecodeSubmit(e.to_string())),
            }
        }

        Ok(frames)
    }
}

/**
    Convert a raw codec frame into an interleaved f32 [`AudioFrame`].
*/
fn convert_frame(frame: &AudioFrameRaw) -> Result<AudioFrame> {
    let samples = frame.samples();
    if samples == 0 {
        return Err(MediaError::DecodeSubmit(
            "audio frame has zero samples".into(),
        ));
    }

    let channel_count = frame.channels() as usize;
    let interleaved = interleave_f32(frame, samples, channel_count)?;

    Ok(AudioFrame::from_f32(
        &interleaved,
        samples,
        frame.rate(),
        ChannelLayout::from_channels(channel_count as u16),
        frame.pts().map(Pts),
    ))
}

/**
    Gather the frame's samples into a single interleaved f32 buffer.

    Float input is the only layout the processors downstream accept, so
    anything else is reported as unsupported here rather than deeper in
    the pipeline.
*/
fn interleave_f32(frame: &AudioFrameRaw, samples: usize, channels: usize) -> Result<Vec<f32>> {
    match frame.format() {
        Sample::F32(sample::Type::Planar) => {
            let mut interleaved = vec![0.0f32; samples * channels];
            for ch in 0..channels {
                let plane = frame.data(ch);
                for s in 0..samples {
                    let offset = s * 4;
                    interleaved[s * channels + ch] = f32::from_ne_bytes([
                        plane[offset],
                        plane[offset + 1],
                        plane[offset + 2],
                        plane[offset + 3],
                    ]);
                }
            }
            Ok(interleaved)
        }
        Sample::F32(sample::Type::Packed) => {
            let plane = frame.data(0);
            Ok(plane[..samples * channels * 4]
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect())
        }
        other => Err(MediaError::UnsupportedFormat(format!(
            "audio sample format {other:?}, expected float"
        ))),
    }
}

impl std::fmt::Debug for AudioDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDecoder")
            .field("sample_rate", &self.decoder.rate())
            .field("channels", &self.decoder.channels())
            .finish_non_exhaustive()
    }
}
