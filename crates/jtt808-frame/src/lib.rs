//! Frame layer of the JT/T 808 protocol.
//!
//! Every message travels on the wire as:
//! - a `0x7e` start flag
//! - the header and body bytes followed by a one-byte XOR checksum, with
//!   `0x7e` and `0x7d` byte-stuffed as `0x7d 0x02` / `0x7d 0x01`
//! - a `0x7e` end flag
//!
//! This crate only deals with those bytes. Header and body semantics live in
//! `jtt808-codec`.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::FrameCodec;
pub use codec::{
    checksum, decode_frame, encode_frame, escape, open_frame, unescape, verify_checksum, Frame,
    FrameConfig, DEFAULT_MAX_FRAME_SIZE, ESCAPE, FLAG, MIN_CONTENT_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::{split_frame, FrameReader};
pub use writer::FrameWriter;
