/*!
    Codec configuration handed from the demuxer to a decoder.
*/

use ffmpeg_next::codec;

/**
    A deep copy of a stream's codec parameters.

    Probing copies the parameters out of the container context so that the
    decoder owning this value can be created and torn down independently of
    the demuxer. The value is consumed when the decoder is built.
*/
pub struct CodecConfig {
    parameters: codec::Parameters,
}

// SAFETY: the wrapped parameters are an exclusively owned deep copy with no
// pointers back into the container context. Exactly one thread holds the
// config at a time; it is moved into the decoder thread before first use.
unsafe impl Send for CodecConfig {}

impl CodecConfig {
    /// Deep-copies the parameters; the original stays tied to its
    /// container context.
    pub(crate) fn from_parameters(parameters: &codec::Parameters) -> Self {
        Self {
            parameters: parameters.clone(),
        }
    }

    /**
        Consume the config, yielding the underlying codec parameters.
    */
    pub fn into_parameters(self) -> codec::Parameters {
        self.parameters
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig").finish_non_exhaustive()
    }
}
