/*!
    Container output for the vidshift pipeline.

    This crate takes encoded packets and writes them into the output
    container, interleaved across the two streams by presentation time.

    # Basic Usage

    ```ignore
    use media_sink::{Muxer, SinkConfig};

    let mut muxer = Muxer::new(&config)?;
    for packet in encoded_packets {
        muxer.write(&packet)?;
    }

    // Finalize the container (critical!)
    muxer.finish()?;
    ```

    # Finalization

    Always call `finish()` to write the trailer. Without it the duration
    may be unknown to players and some players won't open the file at
    all.

    # Interleaving

    The muxer stage holds one pending packet per stream and uses
    [`next_is_video`] to pick the one with the smaller presentation time
    on the common seconds axis, breaking ties in favor of video. The
    decision is a pure function so the ordering contract stays
    unit-testable away from any container I/O.
*/

pub use media_types::{MediaError, Packet, Result};

mod config;
mod mux;

pub use config::{AudioTrackSettings, SinkConfig, VideoTrackSettings};
pub use mux::{next_is_video, Muxer};
