/*!
    Container input for the vidshift media pipeline.

    This crate opens media containers, identifies the first video and first
    audio stream, and feeds compressed packets into the pipeline's queues.

    # Probing

    [`probe`] is a one-shot operation that opens the container, extracts
    [`MediaInfo`] for both streams, deep-copies their codec parameters into
    [`CodecConfig`] values, and closes the container again. The copies make
    decoder teardown independent of the demuxer's lifetime.

    ```ignore
    let probed = media_source::probe("input.mp4")?;
    let decoder = VideoDecoder::new(probed.video_codec)?;
    ```

    # Demuxing

    [`Demuxer`] owns the container for the duration of the packet loop:

    ```ignore
    let demuxer = Demuxer::open("input.mp4")?;
    demuxer.run(&video_packets, &audio_packets, 0);
    // both queues are finished when run returns
    ```

    Per-packet read errors are treated as end-of-stream; the queues are
    finished on every exit path so downstream stages always observe a
    clean end of stream.
*/

pub use media_types::{MediaError, MediaInfo, Packet, Result};

mod config;
mod demux;

pub use config::CodecConfig;
pub use demux::{probe, Demuxer, ProbeResult};
