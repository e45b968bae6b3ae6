use anyhow::{bail, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use keydir::{Entry, KeyDir};
use std::io::Read;
use std::path::Path;

use crate::format::{read_header, HEADER_BYTES, HINT_MAGIC, MIN_ENTRY_BYTES};

/// Reads a hint file back into a [`KeyDir`].
///
/// Every validation failure — short file, wrong magic, checksum mismatch,
/// truncated payload, trailing bytes — is an error. The engine treats any
/// of them as "no usable snapshot" and falls back to scan recovery; a bad
/// hint file is never fatal to opening the store.
pub struct HintReader {}

impl HintReader {
    /// Deserializes the snapshot at `path`.
    ///
    /// # Validation
    ///
    /// - The file must be at least [`HEADER_BYTES`] long.
    /// - The magic must equal `0x4B44_4831` ("KDH1").
    /// - The payload checksum must match the header's crc.
    /// - The payload must contain exactly `entry_count` entries and
    ///   nothing else.
    pub fn read_snapshot(path: &Path) -> Result<KeyDir> {
        let bytes = std::fs::read(path)?;
        if bytes.len() < HEADER_BYTES {
            bail!("hint file too small: {} bytes", bytes.len());
        }

        let (magic, crc, entry_count) = read_header(&bytes);
        if magic != HINT_MAGIC {
            bail!("invalid hint magic: {:#x}", magic);
        }

        let payload = &bytes[HEADER_BYTES..];
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(payload);
        let computed = hasher.finalize();
        if computed != crc {
            bail!("hint checksum mismatch: stored {crc:#x}, computed {computed:#x}");
        }

        // The crc covers the payload, not the count field; bound the count
        // against the smallest possible entry before allocating for it.
        if entry_count > (payload.len() / MIN_ENTRY_BYTES) as u64 {
            bail!("hint entry count {entry_count} impossible for {} payload bytes", payload.len());
        }

        let mut rdr = payload;
        let mut dir = KeyDir::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let key_len = rdr.read_u64::<LittleEndian>()? as usize;
            let mut key = vec![0u8; key_len];
            rdr.read_exact(&mut key)?;
            let segment_id = rdr.read_u32::<LittleEndian>()?;
            let offset = rdr.read_u64::<LittleEndian>()?;
            let len = rdr.read_u64::<LittleEndian>()?;
            let timestamp = rdr.read_u64::<LittleEndian>()?;
            dir.insert(key, Entry::new(segment_id, offset, len, timestamp));
        }
        if !rdr.is_empty() {
            bail!("hint payload has {} trailing bytes", rdr.len());
        }

        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HintWriter;
    use tempfile::tempdir;

    fn make_sample_dir() -> KeyDir {
        let mut dir = KeyDir::new();
        dir.insert(b"alpha".to_vec(), Entry::new(0, 0, 34, 111));
        dir.insert(b"beta".to_vec(), Entry::new(0, 34, 33, 222));
        dir.insert(b"gamma".to_vec(), Entry::new(2, 4096, 58, 333));
        dir
    }

    // -------------------- Round trip --------------------

    #[test]
    fn snapshot_roundtrip_reproduces_directory() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        let original = make_sample_dir();
        HintWriter::write_snapshot(&path, &original)?;
        let loaded = HintReader::read_snapshot(&path)?;

        assert_eq!(loaded, original);
        Ok(())
    }

    #[test]
    fn empty_directory_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        HintWriter::write_snapshot(&path, &KeyDir::new())?;
        let loaded = HintReader::read_snapshot(&path)?;
        assert!(loaded.is_empty());
        Ok(())
    }

    #[test]
    fn keys_with_embedded_zero_bytes_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        let mut original = KeyDir::new();
        original.insert(vec![0x00, 0x01, 0x00, 0xFF], Entry::new(0, 0, 28, 1));
        original.insert(Vec::new(), Entry::new(1, 10, 24, 2));
        original.insert(vec![0x00; 64], Entry::new(3, 99, 112, u64::MAX));

        HintWriter::write_snapshot(&path, &original)?;
        assert_eq!(HintReader::read_snapshot(&path)?, original);
        Ok(())
    }

    #[test]
    fn large_directory_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        let mut original = KeyDir::new();
        for i in 0u64..10_000 {
            original.insert(
                format!("key{}", i).into_bytes(),
                Entry::new((i % 5) as u32, i * 30, 30, i),
            );
        }

        HintWriter::write_snapshot(&path, &original)?;
        assert_eq!(HintReader::read_snapshot(&path)?, original);
        Ok(())
    }

    // -------------------- Validation errors --------------------

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(HintReader::read_snapshot(&dir.path().join("absent.hint")).is_err());
    }

    #[test]
    fn file_too_small_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.hint");
        std::fs::write(&path, b"short").unwrap();
        assert!(HintReader::read_snapshot(&path).is_err());
    }

    #[test]
    fn bad_magic_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.hint");

        let mut bytes = vec![0xBA, 0xAD, 0xF0, 0x0D]; // wrong magic
        bytes.extend_from_slice(&[0u8; 12]); // crc + count
        std::fs::write(&path, &bytes).unwrap();

        assert!(HintReader::read_snapshot(&path).is_err());
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        HintWriter::write_snapshot(&path, &make_sample_dir())?;

        let mut bytes = std::fs::read(&path)?;
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes)?;

        assert!(HintReader::read_snapshot(&path).is_err());
        Ok(())
    }

    #[test]
    fn truncated_payload_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        HintWriter::write_snapshot(&path, &make_sample_dir())?;

        let mut bytes = std::fs::read(&path)?;
        bytes.truncate(bytes.len() - 4);
        std::fs::write(&path, &bytes)?;

        assert!(HintReader::read_snapshot(&path).is_err());
        Ok(())
    }

    #[test]
    fn impossible_entry_count_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        HintWriter::write_snapshot(&path, &make_sample_dir())?;

        // The count field is outside the checksum; a corrupted count must
        // still be rejected rather than drive a huge allocation.
        let mut bytes = std::fs::read(&path)?;
        bytes[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(&path, &bytes)?;

        assert!(HintReader::read_snapshot(&path).is_err());
        Ok(())
    }

    #[test]
    fn trailing_garbage_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.hint");

        HintWriter::write_snapshot(&path, &make_sample_dir())?;

        // Recompute the crc so only the count/payload mismatch trips.
        let mut bytes = std::fs::read(&path)?;
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&bytes[HEADER_BYTES..]);
        let crc = hasher.finalize().to_le_bytes();
        bytes[4..8].copy_from_slice(&crc);
        std::fs::write(&path, &bytes)?;

        assert!(HintReader::read_snapshot(&path).is_err());
        Ok(())
    }
}
