//! `tokio_util::codec` adapter for async transports.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, FrameConfig, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};
use crate::reader::split_frame;

/// Splits a byte stream into raw `0x7e`-delimited frames and wraps outgoing
/// header‖body content into frames.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a codec with the default maximum frame size.
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a codec limited by `config.max_frame_size`.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_frame_size: config.max_frame_size,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        split_frame(src, self.max_frame_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl<'a> Encoder<&'a [u8]> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, content: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        encode_frame(content, dst);
        Ok(())
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, content: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&content, dst);
        Ok(())
    }
}
