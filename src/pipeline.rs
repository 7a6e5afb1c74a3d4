/*!
    Pipeline construction: probe, wire the queues, spawn the stages,
    join them, and report.
*/

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use media_encode::{AudioEncoderParams, VideoEncoderParams};
use media_process::{AudioProcessorConfig, VideoProcessorConfig};
use media_sink::{AudioTrackSettings, SinkConfig, VideoTrackSettings};
use media_types::{
    AudioFrame, CodecId, MediaError, MediaQueue, Packet, Result, VideoFrame,
};

use crate::config::TranscodeConfig;
use crate::stage;

/// Frame rate assumed when the input does not declare one.
const FALLBACK_FPS: i32 = 24;

/// Repacketizer frame size used when the audio target has no fixed one.
const FALLBACK_AUDIO_FRAME_SIZE: usize = 1536;

/**
    Per-stage unit counts gathered after all threads have joined.
*/
#[derive(Clone, Copy, Debug, Default)]
pub struct TranscodeReport {
    pub video_packets_in: u64,
    pub audio_packets_in: u64,
    pub video_frames_decoded: u64,
    pub audio_frames_decoded: u64,
    pub video_frames_processed: u64,
    pub audio_frames_processed: u64,
    pub video_packets_encoded: u64,
    pub audio_packets_encoded: u64,
    pub video_packets_written: u64,
    pub audio_packets_written: u64,
}

/**
    Run the whole pipeline to completion.

    Seven stages run on their own threads, connected by eight bounded
    queues; the queues are the only shared state. Every stage finishes
    its output queues on all exit paths, so a fatal failure anywhere
    drains through the pipeline as a clean end of stream and all threads
    join. The first stage error, in pipeline order, is returned.
*/
pub fn transcode(config: &TranscodeConfig) -> Result<TranscodeReport> {
    config.validate()?;

    // process-wide codec registration, once, before any stage starts
    ffmpeg_next::init().map_err(|e| MediaError::CodecInit(e.to_string()))?;

    let probed = media_source::probe(&config.input_path)?;
    let video_info = probed
        .info
        .video
        .clone()
        .ok_or(MediaError::StreamNotFound("video"))?;
    let audio_info = probed
        .info
        .audio
        .clone()
        .ok_or(MediaError::StreamNotFound("audio"))?;

    let fps = if video_info.fps > 0 {
        video_info.fps
    } else {
        FALLBACK_FPS
    };
    let audio_frame_size = match config.target_audio_format.frame_size() {
        0 => FALLBACK_AUDIO_FRAME_SIZE,
        size => size,
    };

    info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        speed = config.speed_factor,
        rotation = config.rotation_degrees,
        audio = %config.target_audio_format,
        "starting transcode"
    );

    let caps = &config.queue_capacities;
    let video_packets: Arc<MediaQueue<Packet>> = Arc::new(MediaQueue::new(caps.video_packets));
    let audio_packets: Arc<MediaQueue<Packet>> = Arc::new(MediaQueue::new(caps.audio_packets));
    let video_frames: Arc<MediaQueue<VideoFrame>> = Arc::new(MediaQueue::new(caps.video_frames));
    let audio_frames: Arc<MediaQueue<AudioFrame>> = Arc::new(MediaQueue::new(caps.audio_frames));
    let video_processed: Arc<MediaQueue<VideoFrame>> =
        Arc::new(MediaQueue::new(caps.video_frames));
    let audio_processed: Arc<MediaQueue<AudioFrame>> =
        Arc::new(MediaQueue::new(caps.audio_frames));
    let video_encoded: Arc<MediaQueue<Packet>> = Arc::new(MediaQueue::new(caps.encoded_video));
    let audio_encoded: Arc<MediaQueue<Packet>> = Arc::new(MediaQueue::new(caps.encoded_audio));

    let video_processor_config = VideoProcessorConfig {
        speed_factor: config.speed_factor,
        rotation_degrees: config.rotation_degrees,
        enable_blur: config.enable_blur,
        enable_sharpen: config.enable_sharpen,
        enable_grayscale: config.enable_grayscale,
        brightness: config.brightness,
        contrast: config.contrast,
    };
    let audio_processor_config = AudioProcessorConfig {
        speed_factor: config.speed_factor,
        frame_size: audio_frame_size,
        filters: config.audio_filters.clone(),
    };
    let video_encoder_params = VideoEncoderParams::mpeg4(
        video_info.width,
        video_info.height,
        fps,
        config.video_bitrate,
    );
    let audio_encoder_params = AudioEncoderParams {
        sample_rate: audio_info.sample_rate,
        channels: audio_info.channels,
        bitrate: config.audio_bitrate,
    };

    let mut sink_config = SinkConfig::new(&config.output_path, &config.output_format).with_video(
        VideoTrackSettings {
            codec: CodecId::Mpeg4,
            width: video_info.width,
            height: video_info.height,
            fps,
            bitrate: config.video_bitrate,
        },
    );
    if let Some(codec) = config.target_audio_format.codec_id() {
        sink_config = sink_config.with_audio(AudioTrackSettings {
            codec,
            sample_rate: audio_info.sample_rate,
            channels: audio_info.channels,
            bitrate: config.audio_bitrate,
        });
    }

    let demux = spawn_stage("demux", {
        let path = config.input_path.clone();
        let max = config.max_video_frames;
        let video_out = Arc::clone(&video_packets);
        let audio_out = Arc::clone(&audio_packets);
        move || stage::run_demux(path, max, video_out, audio_out)
    })?;

    let video_decode = spawn_stage("video-decode", {
        let packets = Arc::clone(&video_packets);
        let frames = Arc::clone(&video_frames);
        let codec_config = probed.video_codec;
        move || stage::run_video_decoder(packets, frames, codec_config)
    })?;

    let audio_decode = spawn_stage("audio-decode", {
        let packets = Arc::clone(&audio_packets);
        let frames = Arc::clone(&audio_frames);
        let codec_config = probed.audio_codec;
        move || stage::run_audio_decoder(packets, frames, codec_config)
    })?;

    let video_process = spawn_stage("video-process", {
        let frames_in = Arc::clone(&video_frames);
        let frames_out = Arc::clone(&video_processed);
        let (width, height) = (video_info.width, video_info.height);
        move || stage::run_video_processor(frames_in, frames_out, video_processor_config, width, height)
    })?;

    let audio_process = spawn_stage("audio-process", {
        let frames_in = Arc::clone(&audio_frames);
        let frames_out = Arc::clone(&audio_processed);
        let sample_rate = audio_info.sample_rate;
        let channels = audio_info.channels;
        move || {
            stage::run_audio_processor(frames_in, frames_out, audio_processor_config, sample_rate, channels)
        }
    })?;

    let video_encode = spawn_stage("video-encode", {
        let frames = Arc::clone(&video_processed);
        let packets = Arc::clone(&video_encoded);
        move || stage::run_video_encoder(frames, packets, video_encoder_params)
    })?;

    let audio_encode = spawn_stage("audio-encode", {
        let frames = Arc::clone(&audio_processed);
        let packets = Arc::clone(&audio_encoded);
        let target = config.target_audio_format;
        move || stage::run_audio_encoder(frames, packets, target, audio_encoder_params)
    })?;

    let mux = spawn_stage("mux", {
        let video_in = Arc::clone(&video_encoded);
        let audio_in = Arc::clone(&audio_encoded);
        move || stage::run_muxer(video_in, audio_in, sink_config)
    })?;

    // join in pipeline order; the first failure wins but every thread is
    // always joined before returning
    let mut first_error = None;
    let mut report = TranscodeReport::default();

    if let Some((video, audio)) = join_stage("demux", demux, &mut first_error) {
        report.video_packets_in = video;
        report.audio_packets_in = audio;
    }
    if let Some(frames) = join_stage("video-decode", video_decode, &mut first_error) {
        report.video_frames_decoded = frames;
    }
    if let Some(frames) = join_stage("audio-decode", audio_decode, &mut first_error) {
        report.audio_frames_decoded = frames;
    }
    if let Some(frames) = join_stage("video-process", video_process, &mut first_error) {
        report.video_frames_processed = frames;
    }
    if let Some(frames) = join_stage("audio-process", audio_process, &mut first_error) {
        report.audio_frames_processed = frames;
    }
    if let Some(packets) = join_stage("video-encode", video_encode, &mut first_error) {
        report.video_packets_encoded = packets;
    }
    if let Some(packets) = join_stage("audio-encode", audio_encode, &mut first_error) {
        report.audio_packets_encoded = packets;
    }
    if let Some((video, audio)) = join_stage("mux", mux, &mut first_error) {
        report.video_packets_written = video;
        report.audio_packets_written = audio;
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(report),
    }
}

fn spawn_stage<F, T>(name: &str, body: F) -> Result<JoinHandle<Result<T>>>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| MediaError::ResourceExhausted(format!("failed to spawn {name} thread: {e}")))
}

fn join_stage<T>(
    name: &str,
    handle: JoinHandle<Result<T>>,
    first_error: &mut Option<MediaError>,
) -> Option<T> {
    match handle.join() {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!(stage = name, "stage failed: {e}");
            first_error.get_or_insert(e);
            None
        }
        Err(_) => {
            error!(stage = name, "stage thread panicked");
            first_error.get_or_insert(MediaError::ResourceExhausted(format!(
                "{name} thread panicked"
            )));
            None
        }
    }
}
