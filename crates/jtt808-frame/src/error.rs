/// Errors that can occur while wrapping or unwrapping frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Not enough bytes for a header and a checksum.
    #[error("frame too short ({len} bytes, need at least {min})")]
    FrameTooShort { len: usize, min: usize },

    /// A `0x7d` escape byte was last in the frame or followed by a byte other
    /// than `0x01`/`0x02`.
    #[error("malformed escape sequence at offset {offset}")]
    MalformedEscape { offset: usize },

    /// The trailing checksum does not match the XOR of the frame content.
    #[error("checksum mismatch (frame carries {expected:#04x}, computed {actual:#04x})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
