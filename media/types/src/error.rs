/*!
    Error types for the vidshift pipeline.
*/

use thiserror::Error;

/**
    Error type shared by every pipeline stage.

    Variants map one-to-one onto the failure classes of the pipeline:
    validation, input, codec setup, per-unit codec work, the GPU path,
    buffering, and container output.
*/
#[derive(Debug, Error)]
pub enum MediaError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The input container could not be opened or probed.
    #[error("failed to open input: {0}")]
    InputOpen(String),

    /// The input has no stream of the required kind.
    #[error("no {0} stream found in input")]
    StreamNotFound(&'static str),

    /// The requested codec is not available in the codec library.
    #[error("codec not found: {0}")]
    CodecMissing(String),

    /// A codec context could not be configured or opened.
    #[error("codec initialization failed: {0}")]
    CodecInit(String),

    /// A packet was rejected by the decoder.
    #[error("decode submission failed: {0}")]
    DecodeSubmit(String),

    /// A frame was rejected by the encoder.
    #[error("encode submission failed: {0}")]
    EncodeSubmit(String),

    /// The GPU context could not be created.
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),

    /// A GPU operation failed while processing a frame.
    #[error("GPU operation failed: {0}")]
    GpuRuntime(String),

    /// A fixed-capacity buffer could not accept more data.
    #[error("buffer overflow: {0}")]
    BufferOverflow(String),

    /// Writing to the output container failed.
    #[error("mux write failed: {0}")]
    MuxWrite(String),

    /// A media unit uses a layout the stage cannot process.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An allocation or thread resource was exhausted.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// I/O error (file not found, disk full, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /**
        The process exit status reserved for this class of error.

        0 is success; 1 invalid argument, 2 I/O, 3 codec not found,
        4 encoding/processing failure, 5 muxing failure.
    */
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigInvalid(_) => 1,
            Self::InputOpen(_) | Self::StreamNotFound(_) | Self::Io(_) => 2,
            Self::CodecMissing(_) => 3,
            Self::CodecInit(_)
            | Self::DecodeSubmit(_)
            | Self::EncodeSubmit(_)
            | Self::GpuInit(_)
            | Self::GpuRuntime(_)
            | Self::BufferOverflow(_)
            | Self::UnsupportedFormat(_)
            | Self::ResourceExhausted(_) => 4,
            Self::MuxWrite(_) => 5,
        }
    }
}

/**
    Result type alias for the vidshift pipeline.
*/
pub type Result<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = MediaError::ConfigInvalid("speed factor 9.0 out of range".into());
        assert_eq!(
            format!("{e}"),
            "invalid configuration: speed factor 9.0 out of range"
        );

        let e = MediaError::StreamNotFound("video");
        assert_eq!(format!("{e}"), "no video stream found in input");

        let e = MediaError::GpuRuntime("framebuffer incomplete".into());
        assert_eq!(format!("{e}"), "GPU operation failed: framebuffer incomplete");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: MediaError = io_err.into();
        assert!(matches!(e, MediaError::Io(_)));
        assert!(format!("{e}").contains("file not found"));
    }

    #[test]
    fn exit_codes_are_reserved_per_class() {
        assert_eq!(MediaError::ConfigInvalid(String::new()).exit_code(), 1);
        assert_eq!(MediaError::InputOpen(String::new()).exit_code(), 2);
        assert_eq!(MediaError::StreamNotFound("audio").exit_code(), 2);
        assert_eq!(MediaError::CodecMissing(String::new()).exit_code(), 3);
        assert_eq!(MediaError::EncodeSubmit(String::new()).exit_code(), 4);
        assert_eq!(MediaError::GpuRuntime(String::new()).exit_code(), 4);
        assert_eq!(MediaError::MuxWrite(String::new()).exit_code(), 5);
    }
}
