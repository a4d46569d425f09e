use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Start/end flag delimiting every frame.
pub const FLAG: u8 = 0x7e;

/// Escape byte introducing a two-byte stuffed sequence.
pub const ESCAPE: u8 = 0x7d;

const ESCAPED_FLAG: u8 = 0x02;
const ESCAPED_ESCAPE: u8 = 0x01;

/// Shortest frame content: the fixed 12-byte message header.
pub const MIN_CONTENT_SIZE: usize = 12;

/// Default maximum raw frame size (flags and escapes included): 4 KiB.
///
/// A 16-byte header, a 1023-byte body and the checksum, all escaped, fit
/// in 2082 bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024;

/// Unescaped frame content (header and body) with its verified checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header and body bytes, unescaped, without the checksum.
    pub content: Bytes,
    /// XOR of every byte in `content`.
    pub checksum: u8,
}

impl Frame {
    /// Create a frame from content bytes, computing its checksum.
    pub fn new(content: impl Into<Bytes>) -> Self {
        let content = content.into();
        let checksum = checksum(&content);
        Self { content, checksum }
    }

    /// The total wire size of this frame (flags, escapes and checksum).
    pub fn wire_size(&self) -> usize {
        let stuffed = |b: &u8| if matches!(*b, FLAG | ESCAPE) { 2usize } else { 1 };
        2 + self.content.iter().map(stuffed).sum::<usize>() + stuffed(&self.checksum)
    }

    /// Encode this frame into the wire format.
    pub fn encode(&self, dst: &mut BytesMut) {
        encode_frame(&self.content, dst);
    }
}

/// XOR of all bytes in `data`.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Check an unescaped payload whose last byte is the checksum of the rest.
///
/// XOR catches every single-bit error, but two flips of the same bit
/// position in different bytes cancel out and go unnoticed.
pub fn verify_checksum(payload: &[u8]) -> bool {
    match payload.split_last() {
        Some((sum, data)) => checksum(data) == *sum,
        None => false,
    }
}

/// Byte-stuff `src` into `dst`: `0x7e -> 0x7d 0x02`, `0x7d -> 0x7d 0x01`.
pub fn escape(src: &[u8], dst: &mut BytesMut) {
    dst.reserve(src.len());
    for &byte in src {
        match byte {
            FLAG => dst.put_slice(&[ESCAPE, ESCAPED_FLAG]),
            ESCAPE => dst.put_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            other => dst.put_u8(other),
        }
    }
}

/// Reverse [`escape`], appending the restored bytes to `dst`.
///
/// `offset` in the error points at the offending `0x7d` within `src`.
pub fn unescape(src: &[u8], dst: &mut BytesMut) -> Result<()> {
    dst.reserve(src.len());
    let mut bytes = src.iter().enumerate();
    while let Some((offset, &byte)) = bytes.next() {
        if byte != ESCAPE {
            dst.put_u8(byte);
            continue;
        }
        match bytes.next() {
            Some((_, &ESCAPED_FLAG)) => dst.put_u8(FLAG),
            Some((_, &ESCAPED_ESCAPE)) => dst.put_u8(ESCAPE),
            _ => return Err(FrameError::MalformedEscape { offset }),
        }
    }
    Ok(())
}

/// Encode frame content into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬───────────────────────────────────────────┬──────┐
/// │ 0x7e │ escaped( header ‖ body ‖ xor-checksum )   │ 0x7e │
/// └──────┴───────────────────────────────────────────┴──────┘
/// ```
/// The checksum covers the unescaped content and is appended before
/// escaping.
pub fn encode_frame(content: &[u8], dst: &mut BytesMut) {
    dst.reserve(content.len() + 3);
    dst.put_u8(FLAG);
    escape(content, dst);
    escape(&[checksum(content)], dst);
    dst.put_u8(FLAG);
}

/// Unwrap a raw frame into its unescaped content followed by the checksum.
///
/// A single leading and trailing `0x7e` are stripped when present, so both
/// the bytes between the flags and the full frame are accepted. The
/// checksum is not verified here; see [`open_frame`].
pub fn decode_frame(frame: &[u8]) -> Result<Bytes> {
    if frame.len() < MIN_CONTENT_SIZE {
        return Err(FrameError::FrameTooShort {
            len: frame.len(),
            min: MIN_CONTENT_SIZE,
        });
    }

    let inner = frame.strip_prefix(&[FLAG]).unwrap_or(frame);
    let inner = inner.strip_suffix(&[FLAG]).unwrap_or(inner);

    let mut unescaped = BytesMut::with_capacity(inner.len());
    unescape(inner, &mut unescaped)?;

    if unescaped.len() < MIN_CONTENT_SIZE + 1 {
        return Err(FrameError::FrameTooShort {
            len: unescaped.len(),
            min: MIN_CONTENT_SIZE + 1,
        });
    }

    Ok(unescaped.freeze())
}

/// Unwrap a raw frame and verify its checksum.
///
/// A mismatch is final: the frame must be rejected.
pub fn open_frame(frame: &[u8]) -> Result<Frame> {
    let unescaped = decode_frame(frame)?;
    let split = unescaped.len() - 1;
    let expected = unescaped[split];
    let content = unescaped.slice(..split);

    let actual = checksum(&content);
    if actual != expected {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    Ok(Frame {
        content,
        checksum: expected,
    })
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum raw frame size in bytes. Default: 4 KiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
