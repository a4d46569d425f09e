//! Message codec for the JT/T 808 vehicle terminal protocol.
//!
//! Decoding runs frame → header → body registry → body codec and yields a
//! [`Message`]; encoding is the mirror path. Every operation is a pure,
//! synchronous transformation: a [`Codec`] holds no per-call state and can
//! be shared freely between connection threads.
//!
//! ```
//! use jtt808_codec::{decode, encode, Body, Header, Message, Response, SERVER_RESPONSE};
//!
//! let ack = Message::new(
//!     Header::new(SERVER_RESPONSE, 13_800_138_000, 1),
//!     Body::ServerResponse(Response::success(7, 0x0200)),
//! );
//! let wire = encode(&ack).unwrap();
//! let back = decode(&wire).unwrap();
//! assert_eq!(back.body, ack.body);
//! assert_eq!(back.header.attr.body_length, 5);
//! ```

pub mod bcd;
pub mod body;
pub mod config;
pub mod error;
pub mod header;
mod hex_serde;
pub mod message;
pub mod message_id;
pub mod registry;

pub use body::additional::{
    AdditionalInfo, Battery, UnknownInfo, WifiAccessPoint, WifiList, BATTERY, WIFI_LIST,
};
pub use body::location::{BasicInfo, LocationReport, BASIC_INFO_SIZE};
pub use body::response::{Response, RESULT_FAILURE, RESULT_SUCCESS};
pub use body::{Body, RawBody};
pub use config::CodecConfig;
pub use error::{CodecError, Direction, Result};
pub use header::{
    BodyAttr, EncryptionMethod, Header, SegmentInfo, HEADER_SIZE, MAX_BODY_LENGTH, MAX_PHONE,
    SEGMENTED_HEADER_SIZE,
};
pub use message::{decode, encode, Codec, DecodeFailure, Message};
pub use message_id::{message_name, CLIENT_RESPONSE, LOCATION_REPORT, SERVER_RESPONSE};
pub use registry::{select_body_codec, BodyCodec, BodyRegistry};
