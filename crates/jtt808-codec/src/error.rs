use std::fmt;

use crate::bcd::BcdError;

/// Which half of a body codec was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encode => f.write_str("encode"),
            Direction::Decode => f.write_str("decode"),
        }
    }
}

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Frame-level error (delimiters, escaping, checksum).
    #[error("frame error: {0}")]
    Frame(#[from] jtt808_frame::FrameError),

    /// Fewer bytes than the fixed header (plus segment info) requires.
    #[error("header too short ({len} bytes, need {required})")]
    HeaderTooShort { len: usize, required: usize },

    /// The BCD phone field holds a non-decimal nibble. The fields around it
    /// were still readable.
    #[error("invalid phone digits in message {message_id:#06x}: {source}")]
    InvalidPhoneDigits {
        message_id: u16,
        serial_num: u16,
        #[source]
        source: BcdError,
    },

    /// The phone number needs more than 12 decimal digits.
    #[error("phone number {0} does not fit in 12 BCD digits")]
    PhoneOutOfRange(u64),

    /// The BCD timestamp is not a valid `YYMMDDhhmmss` date-time.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Latitude or longitude cannot be represented on the wire.
    #[error("coordinate {0} out of range")]
    InvalidCoordinate(f64),

    /// No body codec is registered for the message id.
    #[error("message id {0:#06x} not supported")]
    UnsupportedMessageId(u16),

    /// An additional-info record runs past the end of the body.
    #[error("additional info at body offset {offset} needs {needed} bytes, {available} available")]
    TruncatedAdditionalInfo {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// An additional-info payload is inconsistent with its own layout.
    #[error("invalid additional info {id:#04x}: {reason}")]
    InvalidAdditionalInfo { id: u8, reason: String },

    /// The body is shorter than its fixed layout.
    #[error("body of message {message_id:#06x} too short ({len} bytes, need {required})")]
    BodyTooShort {
        message_id: u16,
        required: usize,
        len: usize,
    },

    /// The encoded body does not fit in the 10-bit length field.
    #[error("body too long ({0} bytes, max 1023)")]
    BodyTooLong(usize),

    /// Header body length disagrees with the bytes present (strict mode).
    #[error("body length mismatch (header declares {declared}, frame carries {actual})")]
    BodyLengthMismatch { declared: u16, actual: usize },

    /// The segmentation flag and the presence of segment info disagree.
    #[error("segmentation flag and segment info disagree")]
    SegmentationMismatch,

    /// The body variant does not belong to the message id being encoded.
    #[error("body does not match message id {message_id:#06x} (expected {expected})")]
    BodyMismatch {
        message_id: u16,
        expected: &'static str,
    },

    /// The registered codec does not implement this direction.
    #[error("{direction} not implemented for message id {message_id:#06x}")]
    NotImplemented {
        message_id: u16,
        direction: Direction,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;
