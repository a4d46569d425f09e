//! JT/T 808 vehicle terminal protocol.
//!
//! # Crate Structure
//!
//! - [`frame`]: `0x7e` delimiting, byte stuffing and the XOR checksum, plus
//!   stream readers and writers for transports
//! - [`codec`]: header, body registry, response and location bodies, and
//!   the [`Message`](codec::Message) assembler
//!
//! The `jtt808` binary (feature `cli`) wraps both in a demo TCP server,
//! a client and a one-shot hex decoder.

/// Re-export frame types.
pub mod frame {
    pub use jtt808_frame::*;
}

/// Re-export codec types.
pub mod codec {
    pub use jtt808_codec::*;
}

pub use jtt808_codec::{decode, encode, Body, Codec, CodecConfig, CodecError, Header, Message};
