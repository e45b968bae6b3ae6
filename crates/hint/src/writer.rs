use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use keydir::KeyDir;
use std::fs::{rename, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::format::write_header;

/// Writes a [`KeyDir`] snapshot to disk as a hint file.
///
/// The writer is stateless — all work happens inside the single static
/// method [`write_snapshot`](HintWriter::write_snapshot). The write is
/// crash-safe: the snapshot goes to a temporary file, is fsynced, and is
/// then atomically renamed over the final path, so a crash mid-write
/// leaves either the previous snapshot or none at all — never a torn one.
pub struct HintWriter {}

impl HintWriter {
    /// Serializes `dir` to a new hint file at `path`, replacing any prior
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error on any I/O failure. The directory itself cannot
    /// fail to serialize; every entry is four fixed-width integers plus the
    /// raw key bytes.
    pub fn write_snapshot(path: &Path, dir: &KeyDir) -> Result<()> {
        let mut payload = Vec::new();
        for (key, entry) in dir.iter() {
            payload.write_u64::<LittleEndian>(key.len() as u64)?;
            payload.extend_from_slice(key);
            payload.write_u32::<LittleEndian>(entry.segment_id)?;
            payload.write_u64::<LittleEndian>(entry.offset)?;
            payload.write_u64::<LittleEndian>(entry.len)?;
            payload.write_u64::<LittleEndian>(entry.timestamp)?;
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        // Write to a temporary file next to the target for atomic rename.
        let tmp_path = path.with_extension("hint.tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        write_header(&mut file, crc, dir.len() as u64)?;
        file.write_all(&payload)?;
        file.flush()?;
        file.sync_all()?;

        rename(tmp_path, path)?;
        Ok(())
    }
}
