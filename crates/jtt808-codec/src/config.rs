/// Controls message decoding behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecConfig {
    /// When true, decode fails with `CodecError::BodyLengthMismatch` if the
    /// header's body length differs from the body bytes in the frame.
    ///
    /// Off by default: segmented messages may legitimately disagree.
    pub strict_body_length: bool,
}

impl CodecConfig {
    /// Config that rejects body length mismatches.
    pub fn strict() -> Self {
        Self {
            strict_body_length: true,
        }
    }
}
