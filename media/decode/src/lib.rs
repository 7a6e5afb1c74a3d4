/*!
    Media decoding for the vidshift pipeline.

    This crate transforms compressed packets into raw frames. A codec may
    emit zero, one, or many frames per packet; the decoders drain
    everything that is available after each submission.

    # Example

    ```ignore
    use media_decode::VideoDecoder;

    let probed = media_source::probe("input.mp4")?;
    let mut decoder = VideoDecoder::new(probed.video_codec)?;

    while let Some(packet) = packet_queue.pop() {
        for frame in decoder.decode(&packet)? {
            frame_queue.push(frame);
        }
    }
    for frame in decoder.flush()? {
        frame_queue.push(frame);
    }
    frame_queue.finish();
    ```

    # Normalization

    Decoded video is normalized to tightly packed planar YUV 4:2:0; a
    software scaler is created lazily if the codec emits anything else.
    Decoded audio is normalized to interleaved f32 samples.

    # Error policy

    A submission error on a single packet is logged by the caller and the
    packet is skipped. Frame conversion failures are logged here and the
    frame is skipped. Allocation failures are fatal to the stage.
*/

pub use media_source::CodecConfig;
pub use media_types::{AudioFrame, MediaError, Packet, Result, VideoFrame};

mod audio;
mod video;

pub use audio::AudioDecoder;
pub use video::VideoDecoder;
