use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};
use jtt808_frame::{encode_frame, open_frame};
use serde::Serialize;

use crate::body::{Body, Response};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::header::{Header, MAX_BODY_LENGTH};
use crate::message_id::{message_name, SERVER_RESPONSE};
use crate::registry::BodyRegistry;

/// A complete protocol message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub header: Header,
    pub body: Body,
    /// XOR checksum seen on decode. Ignored on encode, which always
    /// computes it afresh.
    pub checksum: u8,
}

impl Message {
    pub fn new(header: Header, body: Body) -> Self {
        Self {
            header,
            body,
            checksum: 0,
        }
    }

    /// Platform general response (`0x8001`) acknowledging `request`.
    ///
    /// With no request header (it failed to parse) the phone, answered
    /// serial and answered id are all zero.
    pub fn server_ack(request: Option<&Header>, serial_num: u16, result: u8) -> Self {
        let (phone, answered_serial, answered_id) = request
            .map(|header| (header.phone, header.serial_num, header.message_id))
            .unwrap_or_default();

        Self::new(
            Header::new(SERVER_RESPONSE, phone, serial_num),
            Body::ServerResponse(Response::new(answered_serial, answered_id, result)),
        )
    }

    /// Display name of the message id.
    pub fn name(&self) -> &'static str {
        message_name(self.header.message_id)
    }
}

/// A failed decode, with the header if it was parsed before the failure.
///
/// When only the phone digits are bad, `header` still carries the message
/// id and serial with a zero phone.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DecodeFailure {
    pub header: Option<Header>,
    #[source]
    pub error: CodecError,
}

impl DecodeFailure {
    fn before_header(error: impl Into<CodecError>) -> Self {
        Self {
            header: None,
            error: error.into(),
        }
    }

    fn in_header(error: CodecError) -> Self {
        let header = match &error {
            CodecError::InvalidPhoneDigits {
                message_id,
                serial_num,
                ..
            } => Some(Header::new(*message_id, 0, *serial_num)),
            _ => None,
        };
        Self { header, error }
    }

    fn after_header(header: &Header, error: CodecError) -> Self {
        Self {
            header: Some(header.clone()),
            error,
        }
    }
}

impl From<DecodeFailure> for CodecError {
    fn from(failure: DecodeFailure) -> Self {
        failure.error
    }
}

/// Frame ⇄ [`Message`] codec.
///
/// Holds only read-only configuration; every call owns its scratch buffers
/// and selected body codec, so one `Codec` can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    registry: BodyRegistry,
    config: CodecConfig,
}

impl Codec {
    /// Codec with the built-in body codecs and default config.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            registry: BodyRegistry::with_defaults(),
            config,
        }
    }

    /// Replace the body registry.
    pub fn with_registry(mut self, registry: BodyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Decode one frame, with or without its `0x7e` delimiters.
    pub fn decode(&self, frame: &[u8]) -> Result<Message> {
        self.decode_traced(frame).map_err(CodecError::from)
    }

    /// Like [`decode`](Self::decode), but keeps the header on failures
    /// that happen after it was parsed.
    pub fn decode_traced(&self, frame: &[u8]) -> std::result::Result<Message, DecodeFailure> {
        let frame = open_frame(frame).map_err(DecodeFailure::before_header)?;
        let (header, header_len) =
            Header::decode(&frame.content).map_err(DecodeFailure::in_header)?;
        let body = &frame.content[header_len..];

        if self.config.strict_body_length && usize::from(header.attr.body_length) != body.len() {
            return Err(DecodeFailure::after_header(
                &header,
                CodecError::BodyLengthMismatch {
                    declared: header.attr.body_length,
                    actual: body.len(),
                },
            ));
        }

        let body = self
            .registry
            .select(header.message_id)
            .and_then(|codec| codec.decode(body))
            .map_err(|error| DecodeFailure::after_header(&header, error))?;

        Ok(Message {
            header,
            body,
            checksum: frame.checksum,
        })
    }

    /// Encode a message into a complete escaped frame.
    ///
    /// The header's body length is taken from the encoded body.
    pub fn encode(&self, message: &Message) -> Result<Bytes> {
        let codec = self.registry.select(message.header.message_id)?;

        let mut body = BytesMut::new();
        codec.encode(&message.body, &mut body)?;
        if body.len() > usize::from(MAX_BODY_LENGTH) {
            return Err(CodecError::BodyTooLong(body.len()));
        }

        let mut header = message.header.clone();
        header.attr.body_length = body.len() as u16;

        let mut content = BytesMut::with_capacity(header.encoded_len() + body.len());
        header.encode(&mut content)?;
        content.extend_from_slice(&body);

        let mut frame = BytesMut::with_capacity(content.len() * 2 + 3);
        encode_frame(&content, &mut frame);
        Ok(frame.freeze())
    }
}

fn shared() -> &'static Codec {
    static CODEC: OnceLock<Codec> = OnceLock::new();
    CODEC.get_or_init(Codec::new)
}

/// Decode one frame with the built-in codecs.
pub fn decode(frame: &[u8]) -> Result<Message> {
    shared().decode(frame)
}

/// Encode a message with the built-in codecs.
pub fn encode(message: &Message) -> Result<Bytes> {
    shared().encode(message)
}

#[cfg(test)]
mod tests {
    use jtt808_frame::FrameError;

    use super::*;
    use crate::body::RawBody;
    use crate::message_id::{CLIENT_HEARTBEAT, CLIENT_RESPONSE, LOCATION_REPORT};
    use crate::registry::BodyCodec;

    fn ack_frame() -> Bytes {
        let message = Message::new(
            Header::new(CLIENT_RESPONSE, 19_161_017_001, 3),
            Body::ClientResponse(Response::success(9, 0x8103)),
        );
        encode(&message).unwrap()
    }

    #[test]
    fn client_response_roundtrip() {
        let wire = ack_frame();
        assert_eq!(wire.first(), Some(&0x7e));
        assert_eq!(wire.last(), Some(&0x7e));

        let message = decode(&wire).unwrap();
        assert_eq!(message.header.message_id, CLIENT_RESPONSE);
        assert_eq!(message.header.attr.body_length, 5);
        assert_eq!(message.body, Body::ClientResponse(Response::success(9, 0x8103)));
        assert_eq!(message.name(), "CLIENT_RESPONSE");
    }

    #[test]
    fn decode_accepts_undelimited_frame() {
        let wire = ack_frame();
        let inner = &wire[1..wire.len() - 1];
        assert!(decode(inner).is_ok());
    }

    #[test]
    fn encode_replaces_declared_body_length() {
        let mut header = Header::new(SERVER_RESPONSE, 1, 1);
        header.attr.body_length = 999;
        let wire = encode(&Message::new(
            header,
            Body::ServerResponse(Response::success(1, 2)),
        ))
        .unwrap();
        assert_eq!(decode(&wire).unwrap().header.attr.body_length, 5);
    }

    #[test]
    fn encode_rejects_oversized_body() {
        let codec = Codec::new().with_registry({
            let mut registry = BodyRegistry::with_defaults();
            registry.register(BodyCodec::raw(CLIENT_HEARTBEAT, "Heartbeat"));
            registry
        });
        let message = Message::new(
            Header::new(CLIENT_HEARTBEAT, 1, 1),
            Body::Raw(RawBody::new(vec![0u8; 1024])),
        );
        assert!(matches!(
            codec.encode(&message),
            Err(CodecError::BodyTooLong(1024))
        ));
    }

    #[test]
    fn unsupported_id_keeps_header() {
        let mut content = BytesMut::new();
        Header::new(CLIENT_HEARTBEAT, 42, 7).encode(&mut content).unwrap();
        let mut wire = BytesMut::new();
        encode_frame(&content, &mut wire);

        let failure = Codec::new().decode_traced(&wire).unwrap_err();
        assert!(matches!(
            failure.error,
            CodecError::UnsupportedMessageId(CLIENT_HEARTBEAT)
        ));
        let header = failure.header.unwrap();
        assert_eq!(header.serial_num, 7);
        assert_eq!(header.phone, 42);
    }

    #[test]
    fn bad_phone_keeps_id_and_serial() {
        let content = hex::decode("0200000001916f17001000090b").unwrap();
        let mut wire = BytesMut::new();
        encode_frame(&content, &mut wire);

        let failure = Codec::new().decode_traced(&wire).unwrap_err();
        assert!(matches!(failure.error, CodecError::InvalidPhoneDigits { .. }));
        let header = failure.header.clone().unwrap();
        assert_eq!(header.message_id, LOCATION_REPORT);
        assert_eq!(header.serial_num, 9);
        assert_eq!(header.phone, 0);

        let ack = Message::server_ack(failure.header.as_ref(), 4, 1);
        assert_eq!(
            ack.body,
            Body::ServerResponse(Response::failure(9, LOCATION_REPORT))
        );
    }

    #[test]
    fn checksum_failure_has_no_header() {
        let mut wire = BytesMut::from(ack_frame().as_ref());
        let last_content = wire.len() - 3;
        wire[last_content] ^= 0x01;

        let failure = Codec::new().decode_traced(&wire).unwrap_err();
        assert!(failure.header.is_none());
        assert!(matches!(
            failure.error,
            CodecError::Frame(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn strict_body_length() {
        let mut content = BytesMut::new();
        let mut header = Header::new(SERVER_RESPONSE, 1, 1);
        header.attr.body_length = 6;
        header.encode(&mut content).unwrap();
        Response::success(1, 2).encode(&mut content);
        let mut wire = BytesMut::new();
        encode_frame(&content, &mut wire);

        assert!(Codec::new().decode(&wire).is_ok());
        let err = Codec::with_config(CodecConfig::strict())
            .decode(&wire)
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::BodyLengthMismatch {
                declared: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn server_ack_echoes_request() {
        let request = Header::new(LOCATION_REPORT, 19_161_017_001, 12);
        let ack = Message::server_ack(Some(&request), 3, 0);
        assert_eq!(ack.header.message_id, SERVER_RESPONSE);
        assert_eq!(ack.header.phone, 19_161_017_001);
        assert_eq!(ack.header.serial_num, 3);
        assert_eq!(
            ack.body,
            Body::ServerResponse(Response::success(12, LOCATION_REPORT))
        );

        let blind = Message::server_ack(None, 4, 1);
        assert_eq!(blind.header.phone, 0);
        assert_eq!(blind.body, Body::ServerResponse(Response::failure(0, 0)));
        assert!(encode(&blind).is_ok());
    }

    #[test]
    fn codec_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Codec>();

        let codec = std::sync::Arc::new(Codec::new());
        let wire = ack_frame();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let codec = codec.clone();
                let wire = wire.clone();
                std::thread::spawn(move || codec.decode(&wire).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().header.serial_num, 3);
        }
    }
}
