/*!
    Audio encoder selection.
*/

use std::fmt;
use std::str::FromStr;

use media_types::{CodecId, Result};

use crate::audio::{
    Ac3Encoder, AacEncoder, AudioEncode, AudioEncoderParams, CopyEncoder, Mp3Encoder,
};

/**
    The audio formats the transcoder can target.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioTarget {
    /// AC-3 (the default).
    Ac3,
    /// AAC.
    Aac,
    /// MP3.
    Mp3,
    /// Stream copy.
    Copy,
}

impl AudioTarget {
    /**
        Samples per channel the target's encoder consumes per frame.

        The audio processor's repacketizer is parameterized with this
        value; 0 (stream copy) means no frame-size requirement.
    */
    pub const fn frame_size(self) -> usize {
        match self {
            Self::Ac3 => 1536,
            Self::Aac => 1024,
            Self::Mp3 => 1152,
            Self::Copy => 0,
        }
    }

    /**
        The codec the target maps to, if any.
    */
    pub const fn codec_id(self) -> Option<CodecId> {
        match self {
            Self::Ac3 => Some(CodecId::Ac3),
            Self::Aac => Some(CodecId::Aac),
            Self::Mp3 => Some(CodecId::Mp3),
            Self::Copy => None,
        }
    }
}

impl fmt::Display for AudioTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ac3 => "ac3",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Copy => "copy",
        };
        f.write_str(name)
    }
}

impl FromStr for AudioTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ac3" => Ok(Self::Ac3),
            "aac" => Ok(Self::Aac),
            "mp3" => Ok(Self::Mp3),
            "copy" => Ok(Self::Copy),
            other => Err(format!(
                "unknown audio format '{other}' (expected ac3, aac, mp3, or copy)"
            )),
        }
    }
}

/**
    Build the encoder for a target format.
*/
pub fn create_audio_encoder(
    target: AudioTarget,
    params: &AudioEncoderParams,
) -> Result<Box<dyn AudioEncode>> {
    Ok(match target {
        AudioTarget::Ac3 => Box::new(Ac3Encoder::new(params)?),
        AudioTarget::Aac => Box::new(AacEncoder::new(params)?),
        AudioTarget::Mp3 => Box::new(Mp3Encoder::new(params)?),
        AudioTarget::Copy => Box::new(CopyEncoder::new(params)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for target in [
            AudioTarget::Ac3,
            AudioTarget::Aac,
            AudioTarget::Mp3,
            AudioTarget::Copy,
        ] {
            assert_eq!(target.to_string().parse::<AudioTarget>(), Ok(target));
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("AC3".parse::<AudioTarget>(), Ok(AudioTarget::Ac3));
        assert_eq!("Aac".parse::<AudioTarget>(), Ok(AudioTarget::Aac));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!("opus".parse::<AudioTarget>().is_err());
    }

    #[test]
    fn frame_sizes_match_encoders() {
        assert_eq!(AudioTarget::Ac3.frame_size(), 1536);
        assert_eq!(AudioTarget::Aac.frame_size(), 1024);
        assert_eq!(AudioTarget::Mp3.frame_size(), 1152);
        assert_eq!(AudioTarget::Copy.frame_size(), 0);
    }

    #[test]
    fn codec_ids() {
        assert_eq!(AudioTarget::Ac3.codec_id(), Some(CodecId::Ac3));
        assert_eq!(AudioTarget::Copy.codec_id(), None);
    }
}
