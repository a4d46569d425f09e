use std::io::{ErrorKind, Write};
use std::net::TcpStream;

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.content.as_ref())
    }

    /// Checksum, escape and wrap unescaped header‖body bytes, then send them.
    pub fn send(&mut self, content: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(content, &mut self.buf);
        if self.buf.len() > self.config.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: self.buf.len(),
                max: self.config.max_frame_size,
            });
        }
        self.write_buffered()
    }

    /// Send bytes that are already a complete wire frame.
    pub fn send_raw(&mut self, frame: &[u8]) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(frame);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<TcpStream> {
    /// Create a frame writer for a TCP stream and apply write timeout from config.
    pub fn with_config_tcp(inner: TcpStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::open_frame;
    use crate::reader::split_frame;

    const CONTENT: [u8; 13] = [
        0x80, 0x01, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x7e,
    ];

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&CONTENT).unwrap();

        let wire = writer.into_inner().into_inner();
        let frame = open_frame(&wire).unwrap();
        assert_eq!(frame.content.as_ref(), &CONTENT[..]);
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&CONTENT).unwrap();
        writer.write_frame(&Frame::new(CONTENT.to_vec())).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        for _ in 0..2 {
            let raw = split_frame(&mut wire, usize::MAX).unwrap().unwrap();
            assert_eq!(open_frame(&raw).unwrap().content.as_ref(), &CONTENT[..]);
        }
        assert!(wire.is_empty());
    }

    #[test]
    fn write_raw_frame_verbatim() {
        let raw = [0x7e, 0x01, 0x02, 0x7e];
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_raw(&raw).unwrap();
        assert_eq!(writer.into_inner().into_inner(), raw.to_vec());
    }

    #[test]
    fn oversized_frame_rejected() {
        let config = FrameConfig {
            max_frame_size: 8,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), config);
        let err = writer.send(&CONTENT).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { max: 8, .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn zero_write_reports_closed() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(&CONTENT).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn interrupted_write_retries() {
        let mut writer = FrameWriter::new(InterruptedOnce {
            interrupted: false,
            written: Vec::new(),
        });
        writer.send(&CONTENT).unwrap();
        let wire = writer.into_inner().written;
        assert_eq!(open_frame(&wire).unwrap().content.as_ref(), &CONTENT[..]);
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        written: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
