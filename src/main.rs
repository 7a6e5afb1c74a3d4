use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use media_encode::AudioTarget;

mod config;
mod pipeline;
mod stage;

use config::TranscodeConfig;

#[derive(Parser, Debug)]
#[command(name = "vidshift")]
#[command(about = "Multi-threaded audio/video transcoder with spatial filters and tempo-preserving speed change")]
#[command(version)]
struct Args {
    /// Input media file
    input: PathBuf,

    /// Output media file
    output: PathBuf,

    /// Playback speed factor, 0.1 to 5.0 (1.0 leaves timing unchanged)
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Rotation angle in degrees
    #[arg(long, default_value_t = 0.0)]
    rotate: f32,

    /// Apply a 3x3 box blur
    #[arg(long)]
    blur: bool,

    /// Apply a Laplacian sharpen
    #[arg(long)]
    sharpen: bool,

    /// Drop all color information
    #[arg(long)]
    grayscale: bool,

    /// Brightness multiplier, 0.0 to 2.0
    #[arg(long, default_value_t = 1.0)]
    brightness: f32,

    /// Contrast multiplier, 0.0 to 2.0
    #[arg(long, default_value_t = 1.0)]
    contrast: f32,

    /// Target audio format: ac3, aac, mp3, or copy
    #[arg(long, default_value = "ac3")]
    audio_format: AudioTarget,

    /// Output container format
    #[arg(long, default_value = "avi")]
    format: String,

    /// Stop after this many video packets (0 processes the whole file)
    #[arg(long, default_value_t = 0)]
    max_frames: u64,

    /// Video bitrate in bits per second
    #[arg(long, default_value_t = 800_000)]
    video_bitrate: usize,

    /// Audio bitrate in bits per second
    #[arg(long, default_value_t = 128_000)]
    audio_bitrate: usize,

    /// Audio volume gain (applies when speed is 1.0)
    #[arg(long)]
    volume: Option<f64>,

    /// Audio low-pass cutoff in Hz (applies when speed is 1.0)
    #[arg(long)]
    lowpass: Option<f64>,

    /// Audio high-pass cutoff in Hz (applies when speed is 1.0)
    #[arg(long)]
    highpass: Option<f64>,
}

impl Args {
    fn into_config(self) -> TranscodeConfig {
        let mut config = TranscodeConfig::new(self.input, self.output);
        config.output_format = self.format;
        config.max_video_frames = self.max_frames;
        config.speed_factor = self.speed;
        config.rotation_degrees = self.rotate;
        config.enable_blur = self.blur;
        config.enable_sharpen = self.sharpen;
        config.enable_grayscale = self.grayscale;
        config.brightness = self.brightness;
        config.contrast = self.contrast;
        config.target_audio_format = self.audio_format;
        config.video_bitrate = self.video_bitrate;
        config.audio_bitrate = self.audio_bitrate;
        if let Some(volume) = self.volume {
            config.audio_filters.volume = volume;
        }
        config.audio_filters.lowpass_hz = self.lowpass;
        config.audio_filters.highpass_hz = self.highpass;
        config
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();

    match pipeline::transcode(&config) {
        Ok(report) => {
            info!(
                video_frames = report.video_frames_processed,
                audio_frames = report.audio_frames_processed,
                video_packets = report.video_packets_written,
                audio_packets = report.audio_packets_written,
                output = %config.output_path.display(),
                "transcode complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("transcode failed: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
