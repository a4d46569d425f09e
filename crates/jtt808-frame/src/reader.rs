use std::io::{ErrorKind, Read};
use std::net::TcpStream;

use bytes::{Buf, Bytes, BytesMut};

use crate::codec::{FrameConfig, FLAG};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Extract the next raw frame from a stream buffer.
///
/// Bytes before a start flag are discarded. On success the returned frame
/// still carries both `0x7e` flags and is consumed from `src`. Two adjacent
/// flags yield nothing: the second one starts the next frame.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// An oversized frame is dropped from `src` before `FrameTooLarge` is
/// returned, so the next call resumes at the following flag.
pub fn split_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    loop {
        let Some(start) = src.iter().position(|&b| b == FLAG) else {
            if !src.is_empty() {
                tracing::debug!(discarded = src.len(), "no frame start flag in buffer");
                src.clear();
            }
            return Ok(None);
        };
        if start > 0 {
            tracing::debug!(discarded = start, "skipping bytes before frame start");
            src.advance(start);
        }

        match src[1..].iter().position(|&b| b == FLAG) {
            Some(0) => src.advance(1),
            Some(end) => {
                let size = end + 2;
                if size > max_frame_size {
                    src.advance(size);
                    return Err(FrameError::FrameTooLarge {
                        size,
                        max: max_frame_size,
                    });
                }
                return Ok(Some(src.split_to(size).freeze()));
            }
            None => {
                if src.len() > max_frame_size {
                    let size = src.len();
                    src.clear();
                    return Err(FrameError::FrameTooLarge {
                        size,
                        max: max_frame_size,
                    });
                }
                return Ok(None); // Need more data
            }
        }
    }
}

/// Reads complete `0x7e`-delimited frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get whole frames,
/// flags included, ready for the message codec.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = split_frame(&mut self.buf, self.config.max_frame_size)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<TcpStream> {
    /// Create a frame reader for a TCP stream and apply read timeout from config.
    pub fn with_config_tcp(inner: TcpStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
