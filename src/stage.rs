/*!
    The per-stage run loops.

    Each function here is the body of one pipeline thread: it builds its
    stage component, moves units between its queues until the input side
    reports end of stream, flushes, and finishes its outputs. Both sides
    are finished on every exit path, including fatal errors: finishing
    the outputs unwinds the downstream stages as a clean end of stream,
    and finishing the inputs releases an upstream producer blocked on a
    full queue, so a failing stage never deadlocks the pipeline.

    Per-unit errors (a packet the codec rejects, a frame of the wrong
    size) are logged with the unit's timestamp and skipped; errors that
    poison the whole stage are returned and take the pipeline down
    cleanly.
*/

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use media_decode::{AudioDecoder, VideoDecoder};
use media_encode::{
    create_audio_encoder, AudioEncoderParams, AudioTarget, VideoEncoder, VideoEncoderParams,
};
use media_process::{
    AudioProcessor, AudioProcessorConfig, VideoProcessor, VideoProcessorConfig,
};
use media_sink::{next_is_video, Muxer, SinkConfig};
use media_source::{CodecConfig, Demuxer};
use media_types::{AudioFrame, MediaError, MediaQueue, Packet, Result, StreamType, VideoFrame};

/**
    The demux stage: open the container and dispatch packets.
*/
pub fn run_demux(
    path: PathBuf,
    max_video_packets: u64,
    video_out: Arc<MediaQueue<Packet>>,
    audio_out: Arc<MediaQueue<Packet>>,
) -> Result<(u64, u64)> {
    let result = (|| {
        let demuxer = Demuxer::open(&path)?;
        Ok(demuxer.run(&video_out, &audio_out, max_video_packets))
    })();

    // Demuxer::run finishes both queues itself; this covers the open
    // error path (finish is idempotent)
    video_out.finish();
    audio_out.finish();

    if let Ok((video, audio)) = &result {
        info!(video_packets = video, audio_packets = audio, "demux stage finished");
    }
    result
}

/**
    The video decode stage.
*/
pub fn run_video_decoder(
    packets_in: Arc<MediaQueue<Packet>>,
    frames_out: Arc<MediaQueue<VideoFrame>>,
    codec_config: CodecConfig,
) -> Result<u64> {
    let result = (|| {
        let mut decoder = VideoDecoder::new(codec_config)?;
        let mut decoded = 0u64;

        while let Some(packet) = packets_in.pop() {
            match decoder.decode(&packet) {
                Ok(frames) => {
                    for frame in frames {
                        frames_out.push(frame);
                        decoded += 1;
                    }
                }
                Err(e @ MediaError::DecodeSubmit(_)) => {
                    warn!(pts = ?packet.pts, "skipping video packet: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        match decoder.flush() {
            Ok(frames) => {
                for frame in frames {
                    frames_out.push(frame);
                    decoded += 1;
                }
            }
            Err(e) => warn!("video decoder flush failed: {e}"),
        }

        Ok(decoded)
    })();

    // finishing the input as well unblocks the demuxer if this stage
    // bailed out early
    packets_in.finish();
    frames_out.finish();
    if let Ok(decoded) = &result {
        info!(frames = decoded, "video decode stage finished");
    }
    result
}

/**
    The audio decode stage.
*/
pub fn run_audio_decoder(
    packets_in: Arc<MediaQueue<Packet>>,
    frames_out: Arc<MediaQueue<AudioFrame>>,
    codec_config: CodecConfig,
) -> Result<u64> {
    let result = (|| {
        let mut decoder = AudioDecoder::new(codec_config)?;
        let mut decoded = 0u64;

        while let Some(packet) = packets_in.pop() {
            match decoder.decode(&packet) {
                Ok(frames) => {
                    for frame in frames {
                        frames_out.push(frame);
                        decoded += 1;
                    }
                }
                Err(e @ MediaError::DecodeSubmit(_)) => {
                    warn!(pts = ?packet.pts, "skipping audio packet: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        match decoder.flush() {
            Ok(frames) => {
                for frame in frames {
                    frames_out.push(frame);
                    decoded += 1;
                }
            }
            Err(e) => warn!("audio decoder flush failed: {e}"),
        }

        Ok(decoded)
    })();

    packets_in.finish();
    frames_out.finish();
    if let Ok(decoded) = &result {
        info!(frames = decoded, "audio decode stage finished");
    }
    result
}

/**
    The video processing stage. The processor (and any GPU context it
    owns) is created on this thread and never leaves it.
*/
pub fn run_video_processor(
    frames_in: Arc<MediaQueue<VideoFrame>>,
    frames_out: Arc<MediaQueue<VideoFrame>>,
    config: VideoProcessorConfig,
    width: u32,
    height: u32,
) -> Result<u64> {
    let result = (|| {
        let mut processor = VideoProcessor::new(config, width, height)?;
        let mut emitted = 0u64;

        while let Some(frame) = frames_in.pop() {
            for output in processor.process(&frame) {
                frames_out.push(output);
                emitted += 1;
            }
        }

        Ok(emitted)
    })();

    frames_in.finish();
    frames_out.finish();
    if let Ok(emitted) = &result {
        info!(frames = emitted, "video process stage finished");
    }
    result
}

/**
    The audio processing stage.
*/
pub fn run_audio_processor(
    frames_in: Arc<MediaQueue<AudioFrame>>,
    frames_out: Arc<MediaQueue<AudioFrame>>,
    config: AudioProcessorConfig,
    sample_rate: u32,
    channels: u16,
) -> Result<u64> {
    let result = (|| {
        let layout = media_types::ChannelLayout::from_channels(channels);
        let mut processor = AudioProcessor::new(&config, sample_rate, layout)?;
        let mut emitted = 0u64;

        while let Some(frame) = frames_in.pop() {
            for output in processor.process(&frame)? {
                frames_out.push(output);
                emitted += 1;
            }
        }

        for output in processor.flush()? {
            frames_out.push(output);
            emitted += 1;
        }

        Ok(emitted)
    })();

    frames_in.finish();
    frames_out.finish();
    if let Ok(emitted) = &result {
        info!(frames = emitted, "audio process stage finished");
    }
    result
}

/**
    The video encode stage.
*/
pub fn run_video_encoder(
    frames_in: Arc<MediaQueue<VideoFrame>>,
    packets_out: Arc<MediaQueue<Packet>>,
    params: VideoEncoderParams,
) -> Result<u64> {
    let result = (|| {
        let mut encoder = VideoEncoder::new(params)?;
        let mut encoded = 0u64;

        while let Some(frame) = frames_in.pop() {
            match encoder.encode(&frame) {
                Ok(packets) => {
                    for packet in packets {
                        packets_out.push(packet);
                        encoded += 1;
                    }
                }
                Err(e @ (MediaError::EncodeSubmit(_) | MediaError::UnsupportedFormat(_))) => {
                    warn!(pts = ?frame.pts, "skipping video frame: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        for packet in encoder.flush()? {
            packets_out.push(packet);
            encoded += 1;
        }

        Ok(encoded)
    })();

    frames_in.finish();
    packets_out.finish();
    if let Ok(encoded) = &result {
        info!(packets = encoded, "video encode stage finished");
    }
    result
}

/**
    The audio encode stage, with the encoder selected by the factory.
*/
pub fn run_audio_encoder(
    frames_in: Arc<MediaQueue<AudioFrame>>,
    packets_out: Arc<MediaQueue<Packet>>,
    target: AudioTarget,
    params: AudioEncoderParams,
) -> Result<u64> {
    let result = (|| {
        let mut encoder = create_audio_encoder(target, &params)?;
        info!(encoder = encoder.name(), frame_size = encoder.frame_size(), "audio encoder ready");
        let mut encoded = 0u64;

        while let Some(frame) = frames_in.pop() {
            match encoder.encode(&frame) {
                Ok(packets) => {
                    for packet in packets {
                        packets_out.push(packet);
                        encoded += 1;
                    }
                }
                Err(e @ (MediaError::EncodeSubmit(_) | MediaError::UnsupportedFormat(_))) => {
                    warn!(pts = ?frame.pts, "skipping audio frame: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        for packet in encoder.flush()? {
            packets_out.push(packet);
            encoded += 1;
        }

        Ok(encoded)
    })();

    frames_in.finish();
    packets_out.finish();
    if let Ok(encoded) = &result {
        info!(packets = encoded, "audio encode stage finished");
    }
    result
}

/**
    The mux stage: interleave the two encoded streams by presentation
    time and finalize the container.
*/
pub fn run_muxer(
    video_in: Arc<MediaQueue<Packet>>,
    audio_in: Arc<MediaQueue<Packet>>,
    config: SinkConfig,
) -> Result<(u64, u64)> {
    let result = mux_loop(&video_in, &audio_in, &config);

    // a mux failure must not leave the encoders blocked on full queues
    video_in.finish();
    audio_in.finish();
    result
}

fn mux_loop(
    video_in: &MediaQueue<Packet>,
    audio_in: &MediaQueue<Packet>,
    config: &SinkConfig,
) -> Result<(u64, u64)> {
    let mut muxer = Muxer::new(config)?;

    let mut pending_video: Option<Packet> = None;
    let mut pending_audio: Option<Packet> = None;
    let mut video_done = false;
    let mut audio_done = false;

    loop {
        if pending_video.is_none() && !video_done {
            pending_video = video_in.pop();
            video_done = pending_video.is_none();
        }
        if pending_audio.is_none() && !audio_done {
            pending_audio = audio_in.pop();
            audio_done = pending_audio.is_none();
        }

        // packets without a pts sort to the front; the muxer synthesizes
        // their timestamps on write
        let video_head = pending_video.as_ref().map(|p| p.pts_seconds().unwrap_or(0.0));
        let audio_head = pending_audio.as_ref().map(|p| p.pts_seconds().unwrap_or(0.0));

        match next_is_video(video_head, audio_head) {
            Some(StreamType::Video) => {
                if let Some(packet) = pending_video.take() {
                    muxer.write(&packet)?;
                }
            }
            Some(StreamType::Audio) => {
                if let Some(packet) = pending_audio.take() {
                    muxer.write(&packet)?;
                }
            }
            None => break,
        }
    }

    muxer.finish()
}
