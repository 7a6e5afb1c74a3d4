/*!
    Shared types for the vidshift media pipeline.

    This crate defines the vocabulary of the pipeline — the types that cross
    crate boundaries. It has no dependency on FFmpeg, making it lightweight
    and enabling consumers to depend on it without pulling in codec bindings.

    # Core Types

    - [`Rational`] - Rational numbers for time bases and frame rates
    - [`Pts`] and [`MediaDuration`] - Timestamps in time_base units
    - [`VideoFrame`] and [`AudioFrame`] - Decoded frame data
    - [`Packet`] - Compressed packet data (demuxed or encoded)

    # Format Types

    - [`PixelFormat`] - Video pixel formats
    - [`SampleFormat`] - Audio sample formats
    - [`ChannelLayout`] - Audio channel layouts
    - [`CodecId`] - Codec identifiers

    # Stream Information

    - [`VideoStreamInfo`] and [`AudioStreamInfo`] - Stream metadata
    - [`MediaInfo`] - Combined media information

    # Pipeline Plumbing

    - [`MediaQueue`] - Bounded blocking queue connecting pipeline stages

    # Error Handling

    - [`MediaError`] and [`Result`] - Common error types
*/

mod codec;
mod error;
mod format;
mod frame;
mod packet;
mod queue;
mod rational;
mod stream;
mod timestamp;

pub use codec::CodecId;
pub use error::{MediaError, Result};
pub use format::{ChannelLayout, PixelFormat, SampleFormat};
pub use frame::{AudioFrame, VideoFrame};
pub use packet::{Packet, StreamType};
pub use queue::MediaQueue;
pub use rational::Rational;
pub use stream::{AudioStreamInfo, MediaInfo, VideoStreamInfo};
pub use timestamp::{MediaDuration, Pts};
