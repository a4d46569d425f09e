use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

use crate::bcd;
use crate::error::{CodecError, Result};

/// Fixed header: message id (2) + attributes (2) + phone (6) + serial (2).
pub const HEADER_SIZE: usize = 12;

/// Header with the segmentation extension: total segments (2) + segment number (2).
pub const SEGMENTED_HEADER_SIZE: usize = HEADER_SIZE + 4;

/// Largest body length the 10-bit attribute field can carry.
pub const MAX_BODY_LENGTH: u16 = 0x03ff;

/// Largest phone number that fits in 6 BCD bytes.
pub const MAX_PHONE: u64 = 999_999_999_999;

const PHONE_SIZE: usize = 6;

const SEGMENTATION_BIT: u16 = 0x2000;
const ENCRYPTION_SHIFT: u16 = 10;
const ENCRYPTION_MASK: u16 = 0b111;
const PRESERVED_SHIFT: u16 = 14;

/// Body encryption declared in the attribute bits 12-10.
///
/// The flag is carried through but never applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EncryptionMethod {
    #[default]
    None,
    Rsa,
    Reserved(u8),
}

impl EncryptionMethod {
    /// Interpret the 3-bit encryption field.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Self::None,
            1 => Self::Rsa,
            other => Self::Reserved(other),
        }
    }

    /// The 3-bit encryption field.
    pub fn bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Rsa => 1,
            Self::Reserved(bits) => bits & 0b111,
        }
    }
}

/// Message body attributes, packed big-endian into 16 bits:
///
/// ```text
///  15 14 │   13    │ 12 11 10 │ 9 ........ 0
/// preserved│segmented│encryption│ body length
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BodyAttr {
    pub segmentation_enabled: bool,
    /// Two reserved bits, kept as received.
    pub preserved: u8,
    pub encryption: EncryptionMethod,
    /// Byte length of the body, 0-1023.
    pub body_length: u16,
}

impl BodyAttr {
    /// Unpack the attribute word.
    pub fn from_bits(bits: u16) -> Self {
        Self {
            segmentation_enabled: bits & SEGMENTATION_BIT != 0,
            preserved: (bits >> PRESERVED_SHIFT) as u8,
            encryption: EncryptionMethod::from_bits(
                ((bits >> ENCRYPTION_SHIFT) & ENCRYPTION_MASK) as u8,
            ),
            body_length: bits & MAX_BODY_LENGTH,
        }
    }

    /// Pack into the attribute word. Out-of-range fields are masked.
    pub fn to_bits(&self) -> u16 {
        let mut bits = (u16::from(self.preserved) & 0b11) << PRESERVED_SHIFT;
        if self.segmentation_enabled {
            bits |= SEGMENTATION_BIT;
        }
        bits |= u16::from(self.encryption.bits()) << ENCRYPTION_SHIFT;
        bits | (self.body_length & MAX_BODY_LENGTH)
    }
}

/// Position of this frame within a segmented message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentInfo {
    pub total_segments: u16,
    /// 1-based.
    pub segment_num: u16,
}

/// Message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub message_id: u16,
    pub attr: BodyAttr,
    /// Terminal phone number, at most 12 decimal digits.
    pub phone: u64,
    pub serial_num: u16,
    /// Present exactly when `attr.segmentation_enabled` is set.
    pub segment: Option<SegmentInfo>,
}

impl Header {
    /// Unsegmented, unencrypted header. The body length is filled in on encode.
    pub fn new(message_id: u16, phone: u64, serial_num: u16) -> Self {
        Self {
            message_id,
            attr: BodyAttr::default(),
            phone,
            serial_num,
            segment: None,
        }
    }

    /// Attach segment info and raise the segmentation flag.
    pub fn with_segment(mut self, total_segments: u16, segment_num: u16) -> Self {
        self.attr.segmentation_enabled = true;
        self.segment = Some(SegmentInfo {
            total_segments,
            segment_num,
        });
        self
    }

    /// Encoded size: 12 bytes, or 16 with segment info.
    pub fn encoded_len(&self) -> usize {
        if self.attr.segmentation_enabled {
            SEGMENTED_HEADER_SIZE
        } else {
            HEADER_SIZE
        }
    }

    /// Append the header to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if self.phone > MAX_PHONE {
            return Err(CodecError::PhoneOutOfRange(self.phone));
        }
        if self.attr.body_length > MAX_BODY_LENGTH {
            return Err(CodecError::BodyTooLong(usize::from(self.attr.body_length)));
        }
        let segment = match (self.attr.segmentation_enabled, self.segment) {
            (true, Some(segment)) => Some(segment),
            (false, None) => None,
            _ => return Err(CodecError::SegmentationMismatch),
        };

        dst.reserve(self.encoded_len());
        dst.put_u16(self.message_id);
        dst.put_u16(self.attr.to_bits());
        bcd::encode_u64(self.phone, PHONE_SIZE, dst)
            .map_err(|_| CodecError::PhoneOutOfRange(self.phone))?;
        dst.put_u16(self.serial_num);
        if let Some(segment) = segment {
            dst.put_u16(segment.total_segments);
            dst.put_u16(segment.segment_num);
        }
        Ok(())
    }

    /// Parse a header from the start of `src`.
    ///
    /// Returns the header and the number of bytes it occupied.
    pub fn decode(src: &[u8]) -> Result<(Self, usize)> {
        if src.len() < HEADER_SIZE {
            return Err(CodecError::HeaderTooShort {
                len: src.len(),
                required: HEADER_SIZE,
            });
        }

        let mut buf = src;
        let message_id = buf.get_u16();
        let attr = BodyAttr::from_bits(buf.get_u16());
        let phone_bytes = &buf[..PHONE_SIZE];
        buf.advance(PHONE_SIZE);
        let serial_num = buf.get_u16();
        let phone = bcd::decode_u64(phone_bytes).map_err(|source| CodecError::InvalidPhoneDigits {
            message_id,
            serial_num,
            source,
        })?;

        let segment = if attr.segmentation_enabled {
            if src.len() < SEGMENTED_HEADER_SIZE {
                return Err(CodecError::HeaderTooShort {
                    len: src.len(),
                    required: SEGMENTED_HEADER_SIZE,
                });
            }
            Some(SegmentInfo {
                total_segments: buf.get_u16(),
                segment_num: buf.get_u16(),
            })
        } else {
            None
        };

        let header = Self {
            message_id,
            attr,
            phone,
            serial_num,
            segment,
        };
        let len = header.encoded_len();
        Ok((header, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn decode_segmented_rsa_header() {
        let (header, len) = Header::decode(&unhex("0200e408019161017001000000300010")).unwrap();

        assert_eq!(len, SEGMENTED_HEADER_SIZE);
        assert_eq!(header.message_id, 512);
        assert_eq!(header.phone, 19_161_017_001);
        assert_eq!(header.serial_num, 0);
        assert_eq!(header.attr.preserved, 3);
        assert!(header.attr.segmentation_enabled);
        assert_eq!(header.attr.encryption, EncryptionMethod::Rsa);
        assert_eq!(header.attr.body_length, 8);
        assert_eq!(
            header.segment,
            Some(SegmentInfo {
                total_segments: 48,
                segment_num: 16
            })
        );
    }

    #[test]
    fn decode_plain_header() {
        let (header, len) = Header::decode(&unhex("020001490191610170010000")).unwrap();

        assert_eq!(len, HEADER_SIZE);
        assert_eq!(header.message_id, 0x0200);
        assert_eq!(header.attr.body_length, 329);
        assert_eq!(header.attr.encryption, EncryptionMethod::None);
        assert!(header.segment.is_none());
    }

    #[test]
    fn decode_too_short() {
        let err = Header::decode(&[0x02, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::HeaderTooShort {
                len: 3,
                required: HEADER_SIZE
            }
        ));
    }

    #[test]
    fn decode_segmented_needs_extension() {
        let err = Header::decode(&unhex("0200e40801916101700100000030")).unwrap_err();
        assert!(matches!(
            err,
            CodecError::HeaderTooShort {
                len: 14,
                required: SEGMENTED_HEADER_SIZE
            }
        ));
    }

    #[test]
    fn decode_invalid_phone_digits() {
        let err = Header::decode(&unhex("02000000019161a170010007")).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidPhoneDigits {
                message_id: 0x0200,
                serial_num: 7,
                ..
            }
        ));
    }

    #[test]
    fn encryption_bits_are_shifted() {
        // Bits 12-10 = 0b001 is RSA; the raw masked byte (0x04) is not.
        assert_eq!(BodyAttr::from_bits(0x0400).encryption, EncryptionMethod::Rsa);
        assert_eq!(
            BodyAttr::from_bits(0x0800).encryption,
            EncryptionMethod::Reserved(2)
        );
        assert_eq!(BodyAttr::from_bits(0x03ff).encryption, EncryptionMethod::None);
    }

    #[test]
    fn attr_bits_roundtrip() {
        let attr = BodyAttr {
            segmentation_enabled: true,
            preserved: 3,
            encryption: EncryptionMethod::Rsa,
            body_length: 8,
        };
        assert_eq!(attr.to_bits(), 0xe408);
        assert_eq!(BodyAttr::from_bits(0xe408), attr);
    }

    #[test]
    fn encode_pads_phone() {
        let mut header = Header::new(0x8001, 13_800_138_000, 9);
        header.attr.body_length = 5;
        let mut out = BytesMut::new();
        header.encode(&mut out).unwrap();
        assert_eq!(hex::encode(&out), "800100050138001380000009");
    }

    #[test]
    fn encode_rejects_long_phone() {
        let header = Header::new(0x8001, MAX_PHONE + 1, 0);
        let err = header.encode(&mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, CodecError::PhoneOutOfRange(_)));
    }

    #[test]
    fn encode_rejects_segmentation_mismatch() {
        let mut header = Header::new(0x0200, 1, 0);
        header.attr.segmentation_enabled = true;
        let err = header.encode(&mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, CodecError::SegmentationMismatch));

        let mut header = Header::new(0x0200, 1, 0).with_segment(2, 1);
        header.attr.segmentation_enabled = false;
        let err = header.encode(&mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, CodecError::SegmentationMismatch));
    }

    #[test]
    fn roundtrip_with_and_without_segments() {
        for header in [
            Header::new(0x0200, 19_161_017_001, 42),
            Header::new(0x0200, 0, u16::MAX).with_segment(3, 2),
        ] {
            let mut out = BytesMut::new();
            header.encode(&mut out).unwrap();
            assert_eq!(out.len(), header.encoded_len());

            let (decoded, len) = Header::decode(&out).unwrap();
            assert_eq!(decoded, header);
            assert_eq!(len, out.len());
        }
    }
}
