use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

use crate::body::Body;
use crate::error::{CodecError, Result};
use crate::message_id::{CLIENT_RESPONSE, SERVER_RESPONSE};

/// Acknowledged successfully.
pub const RESULT_SUCCESS: u8 = 0x00;

/// Acknowledged with failure.
pub const RESULT_FAILURE: u8 = 0x01;

const RESPONSE_SIZE: usize = 5;

/// General response body, shared by the terminal (`0x0001`) and platform
/// (`0x8001`) acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Response {
    /// Serial number of the message being answered.
    pub serial_num: u16,
    /// Id of the message being answered.
    pub message_id: u16,
    /// `0x00` success, `0x01` failure; other values pass through.
    pub result: u8,
}

impl Response {
    pub fn new(serial_num: u16, message_id: u16, result: u8) -> Self {
        Self {
            serial_num,
            message_id,
            result,
        }
    }

    pub fn success(serial_num: u16, message_id: u16) -> Self {
        Self::new(serial_num, message_id, RESULT_SUCCESS)
    }

    pub fn failure(serial_num: u16, message_id: u16) -> Self {
        Self::new(serial_num, message_id, RESULT_FAILURE)
    }

    pub fn outcome(&self) -> &'static str {
        match self.result {
            RESULT_SUCCESS => "success",
            RESULT_FAILURE => "failure",
            _ => "other",
        }
    }

    /// serial (2) ‖ answered message id (2) ‖ result (1).
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(RESPONSE_SIZE);
        dst.put_u16(self.serial_num);
        dst.put_u16(self.message_id);
        dst.put_u8(self.result);
    }

    /// Parse the 5-byte body; `carrier` is the enclosing message id, used
    /// for error reporting. Trailing bytes are ignored.
    pub fn decode(carrier: u16, src: &[u8]) -> Result<Self> {
        if src.len() < RESPONSE_SIZE {
            return Err(CodecError::BodyTooShort {
                message_id: carrier,
                required: RESPONSE_SIZE,
                len: src.len(),
            });
        }
        let mut buf = src;
        Ok(Self {
            serial_num: buf.get_u16(),
            message_id: buf.get_u16(),
            result: buf.get_u8(),
        })
    }
}

pub(crate) fn encode_server(body: &Body, dst: &mut BytesMut) -> Result<()> {
    match body {
        Body::ServerResponse(response) => {
            response.encode(dst);
            Ok(())
        }
        _ => Err(CodecError::BodyMismatch {
            message_id: SERVER_RESPONSE,
            expected: "ServerResponse",
        }),
    }
}

pub(crate) fn decode_server(src: &[u8]) -> Result<Body> {
    Response::decode(SERVER_RESPONSE, src).map(Body::ServerResponse)
}

pub(crate) fn encode_client(body: &Body, dst: &mut BytesMut) -> Result<()> {
    match body {
        Body::ClientResponse(response) => {
            response.encode(dst);
            Ok(())
        }
        _ => Err(CodecError::BodyMismatch {
            message_id: CLIENT_RESPONSE,
            expected: "ClientResponse",
        }),
    }
}

pub(crate) fn decode_client(src: &[u8]) -> Result<Body> {
    Response::decode(CLIENT_RESPONSE, src).map(Body::ClientResponse)
}
