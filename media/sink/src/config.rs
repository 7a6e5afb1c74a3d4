/*!
    Sink configuration types.
*/

use std::path::PathBuf;

use media_types::CodecId;

/**
    Video stream settings for the output container.
*/
#[derive(Clone, Debug)]
pub struct VideoTrackSettings {
    /// Codec the packets were encoded with.
    pub codec: CodecId,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate; the stream time base is its inverse and incoming
    /// packet timestamps are frame indices.
    pub fps: i32,
    /// Declared bitrate in bits per second.
    pub bitrate: usize,
}

/**
    Audio stream settings for the output container.
*/
#[derive(Clone, Debug)]
pub struct AudioTrackSettings {
    /// Codec the packets were encoded with.
    pub codec: CodecId,
    /// Sample rate in Hz; the stream time base is its inverse and
    /// incoming packet timestamps are sample counts.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Declared bitrate in bits per second.
    pub bitrate: usize,
}

/**
    Configuration for the output container.
*/
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Destination path.
    pub output_path: PathBuf,
    /// Container format name as the codec library knows it (e.g. "avi",
    /// "matroska", "mp4").
    pub format_name: String,
    /// Video stream settings; `None` writes an audio-only container.
    pub video: Option<VideoTrackSettings>,
    /// Audio stream settings; `None` writes a video-only container.
    pub audio: Option<AudioTrackSettings>,
}

impl SinkConfig {
    /**
        Create a configuration with no streams; add them with
        [`with_video`](Self::with_video) and
        [`with_audio`](Self::with_audio).
    */
    pub fn new(output_path: impl Into<PathBuf>, format_name: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            format_name: format_name.into(),
            video: None,
            audio: None,
        }
    }

    /**
        Set video stream settings.
    */
    pub fn with_video(mut self, settings: VideoTrackSettings) -> Self {
        self.video = Some(settings);
        self
    }

    /**
        Set audio stream settings.
    */
    pub fn with_audio(mut self, settings: AudioTrackSettings) -> Self {
        self.audio = Some(settings);
        self
    }
}
