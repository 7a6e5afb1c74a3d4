/*!
    Frame processing for the vidshift pipeline.

    This crate holds the two synchronization-critical transformation
    stages that sit between the decoders and the encoders.

    # Video

    [`VideoProcessor`] applies the speed gate (deterministic frame drop or
    duplication), optional GPU rotation through an offscreen render target
    with CPU fallback, and the luma-plane pixel filters (grayscale,
    brightness/contrast, blur, sharpen). Every emitted frame receives a
    fresh presentation timestamp from a single monotonic counter, so the
    output timeline is dense and frame-indexed regardless of how the input
    timeline was reshaped.

    # Audio

    [`AudioProcessor`] reshapes the audio timeline to match: a WSOLA tempo
    stretcher ([`TempoStretcher`]) dilates or compresses the time axis
    without changing pitch, and a fixed-capacity ring buffer
    ([`SampleRing`]) repacketizes the stretcher's irregular output into
    exactly the frame size the downstream encoder requires. Output
    timestamps are the cumulative emitted sample count, independent of any
    input timing.

    When speed change is disabled, an optional string-described filter
    bank ([`FilterBank`]) runs instead of the stretcher; repacketization
    still applies so the encoder's frame-size contract holds at every
    speed.
*/

pub use media_types::{AudioFrame, MediaError, Result, VideoFrame};

mod audio;
mod filters;
mod gpu;
mod graph;
mod ring;
mod scale;
mod tempo;
mod video;

pub use audio::{AudioProcessor, AudioProcessorConfig};
pub use graph::{CompressorSettings, FilterBank, FilterBankConfig};
pub use ring::SampleRing;
pub use tempo::TempoStretcher;
pub use video::{VideoProcessor, VideoProcessorConfig};
