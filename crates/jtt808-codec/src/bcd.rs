//! Packed binary-coded decimal: two decimal digits per byte, high nibble
//! first. Used for the terminal phone number and location timestamps.

use bytes::{BufMut, BytesMut};

/// Errors from BCD conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BcdError {
    /// A nibble above 9.
    #[error("nibble {nibble:#x} in byte {offset} is not a decimal digit")]
    InvalidDigit { offset: usize, nibble: u8 },

    /// Digit strings must pair up into whole bytes.
    #[error("odd number of digits ({0})")]
    OddLength(usize),

    /// A character outside `0-9`.
    #[error("{0:?} is not a decimal digit")]
    NotDecimal(char),

    /// The value has more digits than the field holds.
    #[error("{digits} digits do not fit in {width} bytes")]
    Overflow { digits: usize, width: usize },
}

/// Numeric value (0-99) of one BCD byte, or `None` if a nibble is above 9.
pub fn byte_value(byte: u8) -> Option<u8> {
    let (high, low) = (byte >> 4, byte & 0x0f);
    (high <= 9 && low <= 9).then_some(high * 10 + low)
}

/// BCD byte for a value below 100.
pub fn value_byte(value: u8) -> u8 {
    debug_assert!(value < 100);
    ((value / 10) << 4) | (value % 10)
}

/// Decode BCD bytes into their decimal digit string.
pub fn decode(src: &[u8]) -> Result<String, BcdError> {
    let mut digits = String::with_capacity(src.len() * 2);
    for (offset, &byte) in src.iter().enumerate() {
        for nibble in [byte >> 4, byte & 0x0f] {
            if nibble > 9 {
                return Err(BcdError::InvalidDigit { offset, nibble });
            }
            digits.push(char::from(b'0' + nibble));
        }
    }
    Ok(digits)
}

/// Encode an even-length decimal digit string into BCD bytes.
pub fn encode(digits: &str, dst: &mut BytesMut) -> Result<(), BcdError> {
    if digits.len() % 2 != 0 {
        return Err(BcdError::OddLength(digits.len()));
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_digit()) {
        return Err(BcdError::NotDecimal(bad));
    }

    dst.reserve(digits.len() / 2);
    for pair in digits.as_bytes().chunks_exact(2) {
        dst.put_u8(((pair[0] - b'0') << 4) | (pair[1] - b'0'));
    }
    Ok(())
}

/// Decode BCD bytes as an unsigned integer; leading zeros are dropped.
pub fn decode_u64(src: &[u8]) -> Result<u64, BcdError> {
    let mut value = 0u64;
    for (offset, &byte) in src.iter().enumerate() {
        let pair = match byte_value(byte) {
            Some(pair) => pair,
            None => {
                let nibble = if byte >> 4 > 9 { byte >> 4 } else { byte & 0x0f };
                return Err(BcdError::InvalidDigit { offset, nibble });
            }
        };
        value = value
            .checked_mul(100)
            .and_then(|v| v.checked_add(u64::from(pair)))
            .ok_or(BcdError::Overflow {
                digits: src.len() * 2,
                width: 8,
            })?;
    }
    Ok(value)
}

/// Encode `value` left-padded with zeros to exactly `width` BCD bytes.
pub fn encode_u64(value: u64, width: usize, dst: &mut BytesMut) -> Result<(), BcdError> {
    let digits = value.to_string();
    if digits.len() > width * 2 {
        return Err(BcdError::Overflow {
            digits: digits.len(),
            width,
        });
    }
    encode(&format!("{digits:0>len$}", len = width * 2), dst)
}
