/*!
    Codec identification.
*/

/**
    Codec identifiers.

    This is the subset of codecs the transcoder can produce. Decoding is
    not restricted to this set; inputs are identified by the codec
    library from their container parameters.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// MPEG-4 Part 2 (the default video target)
    Mpeg4,
    /// H.264 / AVC
    H264,
    /// AC-3 (Dolby Digital, the default audio target)
    Ac3,
    /// AAC (Advanced Audio Coding)
    Aac,
    /// MP3 (MPEG Audio Layer 3)
    Mp3,
}

impl CodecId {
    /**
        Short lowercase name, matching the codec library's naming.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mpeg4 => "mpeg4",
            Self::H264 => "h264",
            Self::Ac3 => "ac3",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_names() {
        assert_eq!(CodecId::Mpeg4.name(), "mpeg4");
        assert_eq!(CodecId::H264.name(), "h264");
        assert_eq!(CodecId::Ac3.name(), "ac3");
        assert_eq!(CodecId::Aac.name(), "aac");
        assert_eq!(CodecId::Mp3.name(), "mp3");
    }
}
