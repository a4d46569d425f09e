//! Location report (`0x0200`): a fixed 28-byte basic block followed by
//! additional-info records.

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Timelike, Utc};
use serde::Serialize;

use crate::bcd;
use crate::body::additional::{self, AdditionalInfo};
use crate::body::Body;
use crate::error::{CodecError, Result};
use crate::message_id::LOCATION_REPORT;

/// Size of the basic location block.
pub const BASIC_INFO_SIZE: usize = 28;

const TIMESTAMP_SIZE: usize = 6;
const COORDINATE_SCALE: f64 = 1e6;
const UTC_PLUS_8: i32 = 8 * 3600;

fn utc_plus_8() -> FixedOffset {
    FixedOffset::east_opt(UTC_PLUS_8).unwrap_or_else(|| Utc.fix())
}

/// Fixed part of a location report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicInfo {
    pub alert_flags: u32,
    pub state_flags: u32,
    /// Degrees. The hemisphere lives in `state_flags` and is not applied.
    pub latitude: f64,
    pub longitude: f64,
    /// Metres.
    pub altitude: u16,
    /// 0.1 km/h.
    pub speed: u16,
    /// Degrees clockwise from north, 0-359.
    pub direction: u16,
    /// Device time, UTC+8.
    pub timestamp: DateTime<FixedOffset>,
}

impl BasicInfo {
    /// Speed in km/h.
    pub fn speed_kmh(&self) -> f64 {
        f64::from(self.speed) / 10.0
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < BASIC_INFO_SIZE {
            return Err(CodecError::BodyTooShort {
                message_id: LOCATION_REPORT,
                required: BASIC_INFO_SIZE,
                len: src.len(),
            });
        }

        let mut buf = src;
        let alert_flags = buf.get_u32();
        let state_flags = buf.get_u32();
        let latitude = f64::from(buf.get_u32()) / COORDINATE_SCALE;
        let longitude = f64::from(buf.get_u32()) / COORDINATE_SCALE;
        let altitude = buf.get_u16();
        let speed = buf.get_u16();
        let direction = buf.get_u16();
        let timestamp = decode_timestamp(&buf[..TIMESTAMP_SIZE])?;

        Ok(Self {
            alert_flags,
            state_flags,
            latitude,
            longitude,
            altitude,
            speed,
            direction,
            timestamp,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let latitude = encode_coordinate(self.latitude)?;
        let longitude = encode_coordinate(self.longitude)?;

        dst.reserve(BASIC_INFO_SIZE);
        dst.put_u32(self.alert_flags);
        dst.put_u32(self.state_flags);
        dst.put_u32(latitude);
        dst.put_u32(longitude);
        dst.put_u16(self.altitude);
        dst.put_u16(self.speed);
        dst.put_u16(self.direction);
        encode_timestamp(&self.timestamp, dst)
    }
}

fn encode_coordinate(degrees: f64) -> Result<u32> {
    let scaled = (degrees * COORDINATE_SCALE).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > f64::from(u32::MAX) {
        return Err(CodecError::InvalidCoordinate(degrees));
    }
    Ok(scaled as u32)
}

/// `YYMMDDhhmmss` in BCD, year 2000 + YY, UTC+8.
fn decode_timestamp(src: &[u8]) -> Result<DateTime<FixedOffset>> {
    let invalid = || CodecError::InvalidTimestamp(hex::encode(src));

    let mut fields = [0u32; TIMESTAMP_SIZE];
    for (field, &byte) in fields.iter_mut().zip(src) {
        *field = u32::from(bcd::byte_value(byte).ok_or_else(invalid)?);
    }
    let [yy, month, day, hour, minute, second] = fields;

    let naive = NaiveDate::from_ymd_opt(2000 + yy as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(invalid)?;
    utc_plus_8()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(invalid)
}

fn encode_timestamp(timestamp: &DateTime<FixedOffset>, dst: &mut BytesMut) -> Result<()> {
    let local = timestamp.with_timezone(&utc_plus_8());
    let yy = local.year() - 2000;
    if !(0..100).contains(&yy) {
        return Err(CodecError::InvalidTimestamp(format!(
            "year {} outside 2000-2099",
            local.year()
        )));
    }

    for value in [
        yy as u32,
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
        local.second(),
    ] {
        dst.put_u8(bcd::value_byte(value as u8));
    }
    Ok(())
}

/// A decoded `0x0200` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub basic: BasicInfo,
    pub additional: Vec<AdditionalInfo>,
}

impl LocationReport {
    pub fn new(basic: BasicInfo) -> Self {
        Self {
            basic,
            additional: Vec::new(),
        }
    }

    pub fn with_info(mut self, info: AdditionalInfo) -> Self {
        self.additional.push(info);
        self
    }

    /// Basic block, then every additional-info record to the end of `src`.
    pub fn decode(src: &[u8]) -> Result<Self> {
        let basic = BasicInfo::decode(src)?;
        let additional = additional::decode_stream(&src[BASIC_INFO_SIZE..], BASIC_INFO_SIZE)?;
        Ok(Self { basic, additional })
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        self.basic.encode(dst)?;
        for info in &self.additional {
            info.encode(dst)?;
        }
        Ok(())
    }
}

pub(crate) fn decode_location(src: &[u8]) -> Result<Body> {
    LocationReport::decode(src).map(Body::LocationReport)
}

pub(crate) fn encode_location(body: &Body, dst: &mut BytesMut) -> Result<()> {
    match body {
        Body::LocationReport(report) => report.encode(dst),
        _ => Err(CodecError::BodyMismatch {
            message_id: LOCATION_REPORT,
            expected: "LocationReport",
        }),
    }
}
