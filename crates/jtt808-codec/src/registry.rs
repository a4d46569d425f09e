use std::collections::HashMap;
use std::fmt;

use bytes::BytesMut;

use crate::body::{self, location, response, Body};
use crate::error::{CodecError, Direction, Result};
use crate::message_id::{CLIENT_RESPONSE, LOCATION_REPORT, SERVER_RESPONSE};

/// Appends the encoded body to the buffer.
pub type EncodeFn = fn(&Body, &mut BytesMut) -> Result<()>;

/// Parses body bytes (everything after the header).
pub type DecodeFn = fn(&[u8]) -> Result<Body>;

/// Body encoder/decoder pair for one message id.
///
/// A codec is a pair of plain function pointers, so selecting one hands out
/// a fresh copy with no state shared between calls.
#[derive(Clone, Copy)]
pub struct BodyCodec {
    message_id: u16,
    name: &'static str,
    encode: Option<EncodeFn>,
    decode: Option<DecodeFn>,
}

impl BodyCodec {
    /// A codec with either direction optional; a missing direction fails
    /// with [`CodecError::NotImplemented`].
    pub const fn new(
        message_id: u16,
        name: &'static str,
        encode: Option<EncodeFn>,
        decode: Option<DecodeFn>,
    ) -> Self {
        Self {
            message_id,
            name,
            encode,
            decode,
        }
    }

    /// Pass-through codec producing [`Body::Raw`].
    pub const fn raw(message_id: u16, name: &'static str) -> Self {
        Self::new(
            message_id,
            name,
            Some(body::encode_raw),
            Some(body::decode_raw),
        )
    }

    pub fn message_id(&self) -> u16 {
        self.message_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn can_encode(&self) -> bool {
        self.encode.is_some()
    }

    pub fn can_decode(&self) -> bool {
        self.decode.is_some()
    }

    pub fn encode(&self, body: &Body, dst: &mut BytesMut) -> Result<()> {
        match self.encode {
            Some(encode) => encode(body, dst),
            None => Err(self.not_implemented(Direction::Encode)),
        }
    }

    pub fn decode(&self, src: &[u8]) -> Result<Body> {
        match self.decode {
            Some(decode) => decode(src),
            None => Err(self.not_implemented(Direction::Decode)),
        }
    }

    fn not_implemented(&self, direction: Direction) -> CodecError {
        CodecError::NotImplemented {
            message_id: self.message_id,
            direction,
        }
    }
}

impl fmt::Debug for BodyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyCodec")
            .field("message_id", &format_args!("{:#06x}", self.message_id))
            .field("name", &self.name)
            .field("encode", &self.can_encode())
            .field("decode", &self.can_decode())
            .finish()
    }
}

const DEFAULT_CODECS: [BodyCodec; 3] = [
    BodyCodec::new(
        CLIENT_RESPONSE,
        "ClientResponse",
        Some(response::encode_client),
        Some(response::decode_client),
    ),
    BodyCodec::new(
        SERVER_RESPONSE,
        "ServerResponse",
        Some(response::encode_server),
        Some(response::decode_server),
    ),
    BodyCodec::new(
        LOCATION_REPORT,
        "LocationReport",
        Some(location::encode_location),
        Some(location::decode_location),
    ),
];

/// Built-in codec for a message id.
///
/// A pure lookup; unknown ids fail with [`CodecError::UnsupportedMessageId`].
pub fn select_body_codec(message_id: u16) -> Result<BodyCodec> {
    DEFAULT_CODECS
        .iter()
        .find(|codec| codec.message_id == message_id)
        .copied()
        .ok_or(CodecError::UnsupportedMessageId(message_id))
}

/// Message-id keyed table of body codecs.
///
/// Built once and then only read; lookups return codecs by value.
#[derive(Debug, Clone)]
pub struct BodyRegistry {
    codecs: HashMap<u16, BodyCodec>,
}

impl BodyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Registry holding the built-in codecs (`0x0001`, `0x8001`, `0x0200`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for codec in DEFAULT_CODECS {
            registry.register(codec);
        }
        registry
    }

    /// Register a codec, returning the one it replaced.
    pub fn register(&mut self, codec: BodyCodec) -> Option<BodyCodec> {
        self.codecs.insert(codec.message_id, codec)
    }

    pub fn select(&self, message_id: u16) -> Result<BodyCodec> {
        self.codecs
            .get(&message_id)
            .copied()
            .ok_or(CodecError::UnsupportedMessageId(message_id))
    }

    pub fn contains(&self, message_id: u16) -> bool {
        self.codecs.contains_key(&message_id)
    }

    /// Registered ids, sorted.
    pub fn message_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.codecs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for BodyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
