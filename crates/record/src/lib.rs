//! On-disk record codec for the FirkinKV storage engine.
//!
//! A record is a fixed 24-byte header followed by the raw key and value
//! bytes, with no framing between consecutive records:
//!
//! ```text
//! timestamp (u64 LE) | key_size (u64 LE) | value_size (u64 LE) | key | value
//! ```
//!
//! All integers are little-endian regardless of host byte order. Encoding is
//! pure; decoding borrows the key and value out of the input buffer, so the
//! only allocation a caller pays for is the one it chooses to make.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Width of the fixed record header in bytes.
pub const HEADER_LEN: usize = 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record truncated: need {needed} bytes, have {have}")]
    Truncated { needed: u64, have: u64 },
}

/// The fixed-width portion of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Creation time in nanoseconds since the Unix epoch.
    pub timestamp: u64,
    /// Length of the key in bytes.
    pub key_size: u64,
    /// Length of the value in bytes.
    pub value_size: u64,
}

impl Header {
    /// Total on-disk length of the record this header describes,
    /// i.e. `HEADER_LEN + key_size + value_size`.
    pub fn record_len(&self) -> u64 {
        HEADER_LEN as u64 + self.key_size + self.value_size
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        LittleEndian::write_u64(&mut buf[0..8], self.timestamp);
        LittleEndian::write_u64(&mut buf[8..16], self.key_size);
        LittleEndian::write_u64(&mut buf[16..24], self.value_size);
        buf
    }

    /// Decodes the first [`HEADER_LEN`] bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Header, RecordError> {
        if buf.len() < HEADER_LEN {
            return Err(RecordError::Truncated {
                needed: HEADER_LEN as u64,
                have: buf.len() as u64,
            });
        }
        Ok(Header {
            timestamp: LittleEndian::read_u64(&buf[0..8]),
            key_size: LittleEndian::read_u64(&buf[8..16]),
            value_size: LittleEndian::read_u64(&buf[16..24]),
        })
    }
}

/// A decoded record borrowing its key and value from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub timestamp: u64,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

/// Encodes a record as header + key + value.
///
/// The returned buffer is exactly `HEADER_LEN + key.len() + value.len()`
/// bytes long.
pub fn encode(timestamp: u64, key: &[u8], value: &[u8]) -> Vec<u8> {
    let header = Header {
        timestamp,
        key_size: key.len() as u64,
        value_size: value.len() as u64,
    };
    let mut buf = Vec::with_capacity(HEADER_LEN + key.len() + value.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    buf
}

/// Decodes one full record from `buf`.
///
/// `buf` must hold the entire record: anything shorter than the header, or
/// shorter than the lengths the header claims, is reported as truncation
/// (the engine treats that as corruption). Trailing bytes beyond the record
/// are also rejected — the caller reads exactly `Header::record_len` bytes.
pub fn decode(buf: &[u8]) -> Result<Record<'_>, RecordError> {
    let header = Header::decode(buf)?;
    let needed = header.record_len();
    if (buf.len() as u64) != needed {
        return Err(RecordError::Truncated {
            needed,
            have: buf.len() as u64,
        });
    }
    let key_end = HEADER_LEN + header.key_size as usize;
    Ok(Record {
        timestamp: header.timestamp,
        key: &buf[HEADER_LEN..key_end],
        value: &buf[key_end..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_exactly_24_bytes() {
        let h = Header {
            timestamp: 1,
            key_size: 2,
            value_size: 3,
        };
        assert_eq!(h.encode().len(), 24);
        assert_eq!(HEADER_LEN, 24);
    }

    #[test]
    fn header_roundtrip() {
        let h = Header {
            timestamp: 1_700_000_000_000_000_000,
            key_size: 42,
            value_size: 1024,
        };
        assert_eq!(Header::decode(&h.encode()).unwrap(), h);
    }

    #[test]
    fn header_layout_is_little_endian() {
        let h = Header {
            timestamp: 0x0102_0304_0506_0708,
            key_size: 1,
            value_size: 2,
        };
        let buf = h.encode();
        // least significant byte first
        assert_eq!(&buf[0..8], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(buf[8], 1);
        assert_eq!(buf[16], 2);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let buf = encode(99, b"hello", b"world!");
        assert_eq!(buf.len(), 24 + 5 + 6);

        let rec = decode(&buf).unwrap();
        assert_eq!(rec.timestamp, 99);
        assert_eq!(rec.key, b"hello");
        assert_eq!(rec.value, b"world!");
    }

    #[test]
    fn empty_key_and_value() {
        let buf = encode(7, b"", b"");
        assert_eq!(buf.len(), 24);
        let rec = decode(&buf).unwrap();
        assert!(rec.key.is_empty());
        assert!(rec.value.is_empty());
    }

    #[test]
    fn binary_key_with_embedded_zeros() {
        let key = [0x00, 0xFF, 0x00, 0x80];
        let value = [0xDE, 0xAD, 0x00, 0xBE, 0xEF];
        let buf = encode(1, &key, &value);
        let rec = decode(&buf).unwrap();
        assert_eq!(rec.key, key);
        assert_eq!(rec.value, value);
    }

    #[test]
    fn decode_short_header_is_truncated() {
        let err = decode(&[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            RecordError::Truncated {
                needed: 24,
                have: 10
            }
        );
    }

    #[test]
    fn decode_short_body_is_truncated() {
        let mut buf = encode(1, b"key", b"value");
        buf.truncate(buf.len() - 2);
        let err = decode(&buf).unwrap_err();
        assert_eq!(
            err,
            RecordError::Truncated {
                needed: 32,
                have: 30
            }
        );
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut buf = encode(1, b"k", b"v");
        buf.push(0);
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn record_len_matches_encoded_len() {
        let h = Header {
            timestamp: 0,
            key_size: 3,
            value_size: 9,
        };
        assert_eq!(h.record_len(), 36);
        assert_eq!(encode(0, b"abc", b"123456789").len() as u64, h.record_len());
    }
}
