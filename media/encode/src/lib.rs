/*!
    Frame encoding for the vidshift pipeline.

    Audio encoders are modeled as a capability set behind the
    [`AudioEncode`] trait: construction-time initialization plus
    `encode`, `flush`, `name`, `codec_id`, and `frame_size`. The concrete
    variant is chosen by [`create_audio_encoder`] from an
    [`AudioTarget`] tag; every encoder owns its codec context directly.

    [`VideoEncoder`] produces MPEG-4 (or H.264) packets with frame-index
    timestamps in its `(1, fps)` time base.

    Both encoders are drained with an end-of-stream submission via their
    `flush` methods; the stage must call it after the last input frame.
*/

pub use media_types::{AudioFrame, CodecId, MediaError, Packet, Result, VideoFrame};

mod audio;
mod factory;
mod video;

pub use audio::{Ac3Encoder, AacEncoder, AudioEncode, AudioEncoderParams, CopyEncoder, Mp3Encoder};
pub use factory::{create_audio_encoder, AudioTarget};
pub use video::{VideoEncoder, VideoEncoderParams};
