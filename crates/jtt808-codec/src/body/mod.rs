//! Message bodies.

pub mod additional;
pub mod location;
pub mod response;

use bytes::{Bytes, BytesMut};
use serde::Serialize;

pub use additional::AdditionalInfo;
pub use location::{BasicInfo, LocationReport};
pub use response::Response;

use crate::error::Result;

/// A decoded message body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Body {
    /// `0x8001`, platform general response.
    ServerResponse(Response),
    /// `0x0001`, terminal general response.
    ClientResponse(Response),
    /// `0x0200`.
    LocationReport(LocationReport),
    /// Body bytes kept verbatim by a pass-through codec.
    Raw(RawBody),
}

impl Body {
    /// Variant name, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::ServerResponse(_) => "ServerResponse",
            Body::ClientResponse(_) => "ClientResponse",
            Body::LocationReport(_) => "LocationReport",
            Body::Raw(_) => "Raw",
        }
    }
}

/// Undecoded body bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RawBody {
    #[serde(serialize_with = "crate::hex_serde::serialize")]
    pub data: Bytes,
}

impl RawBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

/// Pass-through decode: any body becomes [`Body::Raw`].
pub(crate) fn decode_raw(src: &[u8]) -> Result<Body> {
    Ok(Body::Raw(RawBody::new(Bytes::copy_from_slice(src))))
}

/// Pass-through encode. Non-raw variants go through their own encoders so
/// a raw codec can stand in for any id.
pub(crate) fn encode_raw(body: &Body, dst: &mut BytesMut) -> Result<()> {
    match body {
        Body::Raw(raw) => dst.extend_from_slice(&raw.data),
        Body::ServerResponse(response) | Body::ClientResponse(response) => response.encode(dst),
        Body::LocationReport(report) => report.encode(dst)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_passthrough() {
        let body = decode_raw(&[0xde, 0xad]).unwrap();
        assert_eq!(body, Body::Raw(RawBody::new(vec![0xde, 0xad])));

        let mut out = BytesMut::new();
        encode_raw(&body, &mut out).unwrap();
        assert_eq!(out.as_ref(), &[0xde, 0xad][..]);
    }

    #[test]
    fn raw_encode_accepts_typed_bodies() {
        let mut out = BytesMut::new();
        encode_raw(&Body::ClientResponse(Response::success(1, 2)), &mut out).unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn serializes_adjacently_tagged() {
        let json = serde_json::to_value(Body::Raw(RawBody::new(vec![0x7e]))).unwrap();
        assert_eq!(json["kind"], "raw");
        assert_eq!(json["data"]["data"], "7e");

        let json = serde_json::to_value(Body::ServerResponse(Response::failure(3, 0x0200))).unwrap();
        assert_eq!(json["kind"], "server_response");
        assert_eq!(json["data"]["result"], 1);
    }
}
