//! Append-only segment file for the FirkinKV storage engine.
//!
//! A [`Segment`] wraps one OS file handle with the discipline the engine
//! needs: appends are serialized through a mutex that owns the write
//! offset, while positioned reads go straight to the file without taking
//! any lock.
//!
//! On Unix, reads use `pread(2)` via [`std::os::unix::fs::FileExt`]:
//! `read_exact_at()` takes `&self` and never touches the file cursor, so
//! any number of threads may read concurrently with an in-progress append.
//! This is sound because the engine only issues reads for byte ranges whose
//! append already returned — the key directory is updated after the write,
//! never before.

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;
use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;

/// One append-only file in the engine's segment list.
///
/// The mutex guards the append offset, not the file handle itself —
/// `write_all_at()` takes `&self` on Unix. Serializing on the offset is
/// what prevents two appends from landing on the same byte range.
pub struct Segment {
    file: File,
    path: PathBuf,
    /// Next append position. Equal to the file size as long as every write
    /// to the file goes through [`append`](Segment::append).
    write_offset: Mutex<u64>,
}

impl Segment {
    /// Opens the segment at `path` for reading and appending, creating it
    /// if absent (mode 0600 on Unix).
    ///
    /// The append offset resumes at the current end of file, so reopening a
    /// non-empty segment continues after its last record rather than
    /// overwriting it.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        options.mode(0o600);
        let file = options.open(&path)?;

        let len = file.metadata()?.len();
        Ok(Self {
            file,
            path,
            write_offset: Mutex::new(len),
        })
    }

    /// Appends `buf`, returning `(n, new_offset)` where `n` is the number
    /// of bytes written and `new_offset` is the position *after* the
    /// append. The record just written starts at `new_offset - n`.
    pub fn append(&self, buf: &[u8]) -> io::Result<(u64, u64)> {
        let mut offset = self.write_offset.lock();
        write_all_at_offset(&self.file, buf, *offset)?;
        *offset += buf.len() as u64;
        Ok((buf.len() as u64, *offset))
    }

    /// Positioned read of exactly `buf.len()` bytes starting at `offset`.
    ///
    /// Does not take the write lock; callers must only request ranges whose
    /// append has already returned.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        read_exact_at_offset(&self.file, buf, offset)
    }

    /// Current file size as reported by the OS.
    pub fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Flushes file content to stable storage.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// Platform-specific position-based I/O helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn read_exact_at_offset(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    file.read_exact_at(buf, offset)
}

/// Windows fallback: `seek_read` updates the file cursor, so concurrent
/// readers need external synchronization there.
#[cfg(windows)]
fn read_exact_at_offset(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    let mut pos = 0;
    while pos < buf.len() {
        let n = file.seek_read(&mut buf[pos..], offset + pos as u64)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected end of file during seek_read",
            ));
        }
        pos += n;
    }
    Ok(())
}

#[cfg(unix)]
fn write_all_at_offset(file: &File, data: &[u8], offset: u64) -> io::Result<()> {
    file.write_all_at(data, offset)
}

#[cfg(windows)]
fn write_all_at_offset(file: &File, data: &[u8], offset: u64) -> io::Result<()> {
    let mut pos = 0;
    while pos < data.len() {
        let n = file.seek_write(&data[pos..], offset + pos as u64)?;
        pos += n;
    }
    Ok(())
}
