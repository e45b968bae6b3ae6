//! Hint-file binary format constants and header read/write helpers.
//!
//! The header is always the **first 16 bytes** of a hint file:
//!
//! ```text
//! [magic: u32 LE = 0x4B44_4831][payload_crc: u32 LE][entry_count: u64 LE]
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{Result as IoResult, Write};

/// Magic number identifying hint files of this format ("KDH1").
pub const HINT_MAGIC: u32 = 0x4B44_4831;

/// Size of the header in bytes: 4 (`magic`) + 4 (`crc`) + 8 (`entry_count`).
pub const HEADER_BYTES: usize = 4 + 4 + 8;

/// Smallest possible wire size of one entry: an empty key still carries
/// `key_len` (8) + `segment_id` (4) + `offset` (8) + `len` (8) +
/// `timestamp` (8) bytes. Used to sanity-check `entry_count` against the
/// payload length before allocating.
pub const MIN_ENTRY_BYTES: usize = 8 + 4 + 8 + 8 + 8;

/// Writes the hint header (`magic` + `crc` + `entry_count`) to `w`.
pub fn write_header<W: Write>(w: &mut W, crc: u32, entry_count: u64) -> IoResult<()> {
    w.write_u32::<LittleEndian>(HINT_MAGIC)?;
    w.write_u32::<LittleEndian>(crc)?;
    w.write_u64::<LittleEndian>(entry_count)?;
    Ok(())
}

/// Reads the hint header from the first [`HEADER_BYTES`] of `buf`,
/// returning `(magic, crc, entry_count)`. The caller checks the length.
pub fn read_header(buf: &[u8]) -> (u32, u32, u64) {
    let magic = LittleEndian::read_u32(&buf[0..4]);
    let crc = LittleEndian::read_u32(&buf[4..8]);
    let entry_count = LittleEndian::read_u64(&buf[8..16]);
    (magic, crc, entry_count)
}
