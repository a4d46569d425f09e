//! Message ids.
//!
//! Ids with the high bit set travel platform → terminal; the rest travel
//! terminal → platform. Only the ids registered in
//! [`BodyRegistry::with_defaults`](crate::BodyRegistry::with_defaults) have
//! body codecs; the others are named for display.

/// Terminal general response.
pub const CLIENT_RESPONSE: u16 = 0x0001;

/// Terminal heartbeat (empty body).
pub const CLIENT_HEARTBEAT: u16 = 0x0002;

/// Terminal logout.
pub const CLIENT_LOGOUT: u16 = 0x0003;

/// Terminal registration.
pub const CLIENT_REGISTER: u16 = 0x0100;

/// Terminal authentication.
pub const CLIENT_AUTHENTICATION: u16 = 0x0102;

/// Location report.
pub const LOCATION_REPORT: u16 = 0x0200;

/// Location query response.
pub const LOCATION_QUERY_RESPONSE: u16 = 0x0201;

/// Platform general response.
pub const SERVER_RESPONSE: u16 = 0x8001;

/// Registration response.
pub const REGISTER_RESPONSE: u16 = 0x8100;

/// Set terminal parameters.
pub const SET_PARAMETERS: u16 = 0x8103;

/// Query terminal parameters.
pub const QUERY_PARAMETERS: u16 = 0x8104;

/// Location query.
pub const LOCATION_QUERY: u16 = 0x8201;

/// Returns a human-readable name for a message id.
pub fn message_name(id: u16) -> &'static str {
    match id {
        CLIENT_RESPONSE => "CLIENT_RESPONSE",
        CLIENT_HEARTBEAT => "CLIENT_HEARTBEAT",
        CLIENT_LOGOUT => "CLIENT_LOGOUT",
        CLIENT_REGISTER => "CLIENT_REGISTER",
        CLIENT_AUTHENTICATION => "CLIENT_AUTHENTICATION",
        LOCATION_REPORT => "LOCATION_REPORT",
        LOCATION_QUERY_RESPONSE => "LOCATION_QUERY_RESPONSE",
        SERVER_RESPONSE => "SERVER_RESPONSE",
        REGISTER_RESPONSE => "REGISTER_RESPONSE",
        SET_PARAMETERS => "SET_PARAMETERS",
        QUERY_PARAMETERS => "QUERY_PARAMETERS",
        LOCATION_QUERY => "LOCATION_QUERY",
        _ if is_platform_message(id) => "PLATFORM",
        _ => "TERMINAL",
    }
}

/// Returns true if the id is sent by the platform.
pub fn is_platform_message(id: u16) -> bool {
    id & 0x8000 != 0
}
