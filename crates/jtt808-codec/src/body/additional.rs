//! Location additional-info records: a TLV stream of `id (1) ‖ length (1) ‖
//! payload (length)` following the basic location block.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Serialize, Serializer};

use crate::error::{CodecError, Result};

/// Wifi access point list.
pub const WIFI_LIST: u8 = 0x54;

/// Battery level.
pub const BATTERY: u8 = 0x56;

const TLV_HEADER_SIZE: usize = 2;
const MAC_SIZE: usize = 6;
const WIFI_RECORD_SIZE: usize = MAC_SIZE + 1;
const BATTERY_SIZE: usize = 2;

/// One scanned access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WifiAccessPoint {
    #[serde(serialize_with = "serialize_mac")]
    pub mac: [u8; MAC_SIZE],
    /// Two's-complement negation of the transmitted byte, i.e. the signal
    /// magnitude for a negative dBm reading.
    pub signal_strength: u8,
}

impl WifiAccessPoint {
    /// Build from the on-air record; `raw_signal` is negated with wraparound.
    pub fn from_wire(mac: [u8; MAC_SIZE], raw_signal: u8) -> Self {
        Self {
            mac,
            signal_strength: raw_signal.wrapping_neg(),
        }
    }

    /// The transmitted signal byte.
    pub fn raw_signal(&self) -> u8 {
        self.signal_strength.wrapping_neg()
    }

    /// Signal in dBm as transmitted (normally negative).
    pub fn dbm(&self) -> i8 {
        self.raw_signal() as i8
    }

    /// `aa:bb:cc:dd:ee:ff`.
    pub fn mac_string(&self) -> String {
        format_mac(&self.mac)
    }
}

fn format_mac(mac: &[u8; MAC_SIZE]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn serialize_mac<S: Serializer>(mac: &[u8; MAC_SIZE], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_mac(mac))
}

/// Record `0x54`: count (1) followed by count × (mac (6) ‖ signal (1)).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WifiList {
    pub access_points: Vec<WifiAccessPoint>,
    /// Declared payload bytes after the last access point, re-emitted as is.
    #[serde(
        skip_serializing_if = "Bytes::is_empty",
        serialize_with = "crate::hex_serde::serialize"
    )]
    pub trailing: Bytes,
}

impl WifiList {
    pub fn new(access_points: Vec<WifiAccessPoint>) -> Self {
        Self {
            access_points,
            trailing: Bytes::new(),
        }
    }
}

/// Record `0x56`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Battery {
    /// Charge in units of ten percent.
    pub percentage_tenths: u8,
    pub extension: u8,
    #[serde(
        skip_serializing_if = "Bytes::is_empty",
        serialize_with = "crate::hex_serde::serialize"
    )]
    pub trailing: Bytes,
}

impl Battery {
    pub fn new(percentage_tenths: u8, extension: u8) -> Self {
        Self {
            percentage_tenths,
            extension,
            trailing: Bytes::new(),
        }
    }

    /// Charge in percent.
    pub fn percentage(&self) -> f64 {
        f64::from(self.percentage_tenths) * 10.0
    }
}

/// A record with an id this codec does not interpret, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownInfo {
    pub id: u8,
    pub length: u8,
    #[serde(serialize_with = "crate::hex_serde::serialize")]
    pub raw: Bytes,
}

/// A decoded additional-info record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdditionalInfo {
    Wifi(WifiList),
    Battery(Battery),
    Unknown(UnknownInfo),
}

impl AdditionalInfo {
    /// Record id.
    pub fn id(&self) -> u8 {
        match self {
            Self::Wifi(_) => WIFI_LIST,
            Self::Battery(_) => BATTERY,
            Self::Unknown(info) => info.id,
        }
    }

    /// Payload length in bytes.
    pub fn length(&self) -> usize {
        match self {
            Self::Wifi(list) => {
                1 + list.access_points.len() * WIFI_RECORD_SIZE + list.trailing.len()
            }
            Self::Battery(battery) => BATTERY_SIZE + battery.trailing.len(),
            Self::Unknown(info) => info.raw.len(),
        }
    }

    /// Payload bytes as they appear on the wire.
    pub fn payload(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.length());
        self.encode_payload(&mut buf)?;
        Ok(buf.freeze())
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Self::Wifi(list) => {
                let count = u8::try_from(list.access_points.len()).map_err(|_| {
                    CodecError::InvalidAdditionalInfo {
                        id: WIFI_LIST,
                        reason: format!("{} access points", list.access_points.len()),
                    }
                })?;
                dst.put_u8(count);
                for ap in &list.access_points {
                    dst.put_slice(&ap.mac);
                    dst.put_u8(ap.raw_signal());
                }
                dst.put_slice(&list.trailing);
            }
            Self::Battery(battery) => {
                dst.put_u8(battery.percentage_tenths);
                dst.put_u8(battery.extension);
                dst.put_slice(&battery.trailing);
            }
            Self::Unknown(info) => dst.put_slice(&info.raw),
        }
        Ok(())
    }

    /// Append `id ‖ length ‖ payload`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let length = u8::try_from(self.length()).map_err(|_| CodecError::InvalidAdditionalInfo {
            id: self.id(),
            reason: format!("payload of {} bytes exceeds 255", self.length()),
        })?;
        dst.reserve(TLV_HEADER_SIZE + usize::from(length));
        dst.put_u8(self.id());
        dst.put_u8(length);
        self.encode_payload(dst)
    }

    /// Decode one record payload by id.
    pub fn decode(id: u8, payload: &[u8]) -> Result<Self> {
        match id {
            WIFI_LIST => decode_wifi(payload).map(Self::Wifi),
            BATTERY => decode_battery(payload).map(Self::Battery),
            _ => Ok(Self::Unknown(UnknownInfo {
                id,
                length: payload.len() as u8,
                raw: Bytes::copy_from_slice(payload),
            })),
        }
    }
}

fn decode_wifi(payload: &[u8]) -> Result<WifiList> {
    let Some((&count, records)) = payload.split_first() else {
        return Err(CodecError::InvalidAdditionalInfo {
            id: WIFI_LIST,
            reason: "missing access point count".to_string(),
        });
    };
    let count = usize::from(count);
    if records.len() < count * WIFI_RECORD_SIZE {
        return Err(CodecError::InvalidAdditionalInfo {
            id: WIFI_LIST,
            reason: format!(
                "{count} access points need {} bytes, {} present",
                count * WIFI_RECORD_SIZE,
                records.len()
            ),
        });
    }

    let (records, trailing) = records.split_at(count * WIFI_RECORD_SIZE);
    let access_points = records
        .chunks_exact(WIFI_RECORD_SIZE)
        .map(|record| {
            let mut mac = [0u8; MAC_SIZE];
            mac.copy_from_slice(&record[..MAC_SIZE]);
            WifiAccessPoint::from_wire(mac, record[MAC_SIZE])
        })
        .collect();

    Ok(WifiList {
        access_points,
        trailing: Bytes::copy_from_slice(trailing),
    })
}

fn decode_battery(payload: &[u8]) -> Result<Battery> {
    match payload {
        [percentage_tenths, extension, trailing @ ..] => Ok(Battery {
            percentage_tenths: *percentage_tenths,
            extension: *extension,
            trailing: Bytes::copy_from_slice(trailing),
        }),
        _ => Err(CodecError::InvalidAdditionalInfo {
            id: BATTERY,
            reason: format!("{} bytes, need {BATTERY_SIZE}", payload.len()),
        }),
    }
}

/// Walk a TLV stream to its end.
///
/// `base_offset` is the stream's position within the body and only feeds
/// error offsets. A record running past the end is a hard failure.
pub fn decode_stream(src: &[u8], base_offset: usize) -> Result<Vec<AdditionalInfo>> {
    let mut infos = Vec::new();
    let mut offset = 0usize;

    while offset < src.len() {
        let rest = &src[offset..];
        let truncated = |needed: usize| CodecError::TruncatedAdditionalInfo {
            offset: base_offset + offset,
            needed,
            available: rest.len(),
        };

        let (id, length) = match rest {
            [id, length, ..] => (*id, usize::from(*length)),
            _ => return Err(truncated(TLV_HEADER_SIZE)),
        };
        let payload = rest
            .get(TLV_HEADER_SIZE..TLV_HEADER_SIZE + length)
            .ok_or_else(|| truncated(TLV_HEADER_SIZE + length))?;

        infos.push(AdditionalInfo::decode(id, payload)?);
        offset += TLV_HEADER_SIZE + length;
    }

    Ok(infos)
}
