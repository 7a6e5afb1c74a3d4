/*!
    Audio encoder implementations.
*/

use ffmpeg_next::{
    codec::{self, encoder},
    ffi,
    format::{sample, Sample},
    frame::Audio as AudioFrameRaw,
    ChannelLayout as RawChannelLayout, Rational as RawRational,
};
use tracing::debug;

use media_types::{
    AudioFrame, CodecId, MediaDuration, MediaError, Packet, Pts, Rational, Result, StreamType,
};

/**
    Audio encoder configuration.
*/
#[derive(Clone, Copy, Debug)]
pub struct AudioEncoderParams {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Target bitrate in bits per second.
    pub bitrate: usize,
}

/**
    The capability set every audio encoder provides.

    Initialization happens at construction; the remaining operations are
    `encode`, `flush`, and the introspection methods the pipeline uses to
    configure its upstream stages.
*/
pub trait AudioEncode {
    /**
        Encode one frame, returning the packets the codec produced.

        Frames whose sample count differs from a nonzero
        [`frame_size`](Self::frame_size) are rejected with
        [`MediaError::EncodeSubmit`]; the stage logs and skips them.
    */
    fn encode(&mut self, frame: &AudioFrame) -> Result<Vec<Packet>>;

    /**
        Drain the codec after the last frame.
    */
    fn flush(&mut self) -> Result<Vec<Packet>>;

    /**
        Human-readable encoder name.
    */
    fn name(&self) -> &'static str;

    /**
        The codec this encoder produces, if it produces one at all.
    */
    fn codec_id(&self) -> Option<CodecId>;

    /**
        Required samples per channel per frame; 0 means any size.
    */
    fn frame_size(&self) -> usize;
}

/**
    Shared body of the codec-backed encoders: owns the opened codec
    context and converts between pipeline frames and codec frames.
*/
struct FrameEncoder {
    encoder: encoder::audio::Encoder,
    channels: usize,
    time_base: Rational,
}

impl FrameEncoder {
    fn new(id: codec::Id, params: &AudioEncoderParams) -> Result<Self> {
        let codec = encoder::find(id)
            .ok_or_else(|| MediaError::CodecMissing(format!("{id:?} encoder")))?;

        let mut context = codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()
            .map_err(|e| MediaError::CodecInit(e.to_string()))?;

        context.set_rate(params.sample_rate as i32);
        context.set_channel_layout(RawChannelLayout::default(params.channels as i32));
        context.set_format(Sample::F32(sample::Type::Planar));
        context.set_bit_rate(params.bitrate);
        context.set_time_base(RawRational(1, params.sample_rate as i32));

        let encoder = context
            .open_as(codec)
            .map_err(|e| MediaError::CodecInit(e.to_string()))?;

        debug!(
            codec = ?id,
            sample_rate = params.sample_rate,
            channels = params.channels,
            bitrate = params.bitrate,
            frame_size = encoder.frame_size(),
            "audio encoder opened"
        );

        Ok(Self {
            encoder,
            channels: params.channels as usize,
            time_base: Rational::new(1, params.sample_rate as i32),
        })
    }

    fn frame_size(&self) -> usize {
        self.encoder.frame_size() as usize
    }

    fn encode(&mut self, frame: &AudioFrame) -> Result<Vec<Packet>> {
        let required = self.frame_size();
        if required > 0 && frame.samples != required {
            return Err(MediaError::EncodeSubmit(format!(
                "encoder requires {required} samples per frame, got {}",
                frame.samples
            )));
        }

        let samples = frame.to_f32().ok_or_else(|| {
            MediaError::UnsupportedFormat(format!(
                "audio sample format {:?}, expected f32",
                frame.format
            ))
        })?;

        // the codec consumes planar float; split the interleaved buffer
        let mut raw = AudioFrameRaw::new(
            Sample::F32(sample::Type::Planar),
            frame.samples,
            RawChannelLayout::default(self.channels as i32),
        );
        raw.set_rate(frame.sample_rate);
        raw.set_pts(frame.pts.map(i64::from));
        for ch in 0..self.channels {
            let plane = raw.data_mut(ch);
            for s in 0..frame.samples {
                let value = samples[s * self.channels + ch];
                plane[s * 4..s * 4 + 4].copy_from_slice(&value.to_ne_bytes());
            }
        }

        self.encoder
            .send_frame(&raw)
            .map_err(|e| MediaError::EncodeSubmit(e.to_string()))?;

        self.receive_packets()
    }

    fn flush(&mut self) -> Result<Vec<Packet>> {
        self.encoder
            .send_eof()
            .map_err(|e| MediaError::EncodeSubmit(e.to_string()))?;

        self.receive_packets()
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
                    StreamType::Audio,
                )),
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(MediaError::EncodeSubmit(e.to_string())),
            }
        }

        Ok(packets)
    }
}

macro_rules! codec_encoder {
    ($(#[$doc:meta])* $type:ident, $id:expr, $codec:expr, $name:literal) => {
        $(#[$doc])*
        pub struct $type {
            inner: FrameEncoder,
        }

        impl $type {
            /**
                Initialize the encoder for the given stream parameters.
            */
            pub fn new(params: &AudioEncoderParams) -> Result<Self> {
                Ok(Self {
                    inner: FrameEncoder::new($id, params)?,
                })
            }
        }

        impl AudioEncode for $type {
            fn encode(&mut self, frame: &AudioFrame) -> Result<Vec<Packet>> {
                self.inner.encode(frame)
            }

            fn flush(&mut self) -> Result<Vec<Packet>> {
                self.inner.flush()
            }

            fn name(&self) -> &'static str {
                $name
            }

            fn codec_id(&self) -> Option<CodecId> {
                Some($codec)
            }

            fn frame_size(&self) -> usize {
                self.inner.frame_size()
            }
        }
    };
}

codec_encoder!(
    /// AC-3 encoder. Requires exactly 1536 samples per frame.
    Ac3Encoder,
    codec::Id::AC3,
    CodecId::Ac3,
    "AC3 Encoder"
);
codec_encoder!(
    /// AAC encoder.
    AacEncoder,
    codec::Id::AAC,
    CodecId::Aac,
    "AAC Encoder"
);
codec_encoder!(
    /// MP3 encoder.
    Mp3Encoder,
    codec::Id::MP3,
    CodecId::Mp3,
    "MP3 Encoder"
);

/**
    Stream-copy placeholder.

    True stream copy operates on packets and bypasses the decode and
    process stages entirely, which this frame-level pipeline does not do;
    the encoder therefore rejects every frame, and a copy run produces an
    output without an audio track.
*/
pub struct CopyEncoder;

impl CopyEncoder {
    /**
        Initialize the passthrough encoder. The parameters are accepted
        for interface uniformity and otherwise unused.
    */
    pub fn new(_params: &AudioEncoderParams) -> Result<Self> {
        Ok(Self)
    }
}

impl AudioEncode for CopyEncoder {
    fn encode(&mut self, _frame: &AudioFrame) -> Result<Vec<Packet>> {
        Err(MediaError::UnsupportedFormat(
            "copy encoder accepts packets, not decoded frames".into(),
        ))
    }

    fn flush(&mut self) -> Result<Vec<Packet>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "Copy Encoder"
    }

    fn codec_id(&self) -> Option<CodecId> {
        None
    }

    fn frame_size(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::ChannelLayout;

    #[test]
    fn copy_encoder_rejects_frames() {
        let params = AudioEncoderParams {
            sample_rate: 44100,
            channels: 2,
            bitrate: 128_000,
        };
        let mut encoder = CopyEncoder::new(&params).unwrap();

        let frame = AudioFrame::from_f32(&[0.0; 8], 4, 44100, ChannelLayout::Stereo, None);
        assert!(matches!(
            encoder.encode(&frame),
            Err(MediaError::UnsupportedFormat(_))
        ));
        assert!(encoder.flush().unwrap().is_empty());
        assert_eq!(encoder.frame_size(), 0);
        assert_eq!(encoder.codec_id(), None);
    }
}
