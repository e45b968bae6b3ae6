//! The storage engine: segment rotation, the recovery paths, and the
//! concurrency policy tying the key directory to the segment files.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use hint::{HintReader, HintWriter};
use keydir::{Entry, KeyDir};
use parking_lot::{Mutex, RwLock};
use record::Header;
use segment::Segment;

use crate::error::{EngineError, Result};
use crate::paths;

/// Default segment rollover threshold: 100 MiB.
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 100 * 1024 * 1024;

/// Runtime configuration for [`Engine::open`].
///
/// The engine takes a plain byte count; parsing human-readable sizes like
/// `"10.5MB"` is the caller's concern.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Rollover threshold in bytes. The check runs *before* each append,
    /// so a segment may exceed this by up to one record. Must be non-zero.
    pub max_segment_size: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_segment_size(mut self, bytes: u64) -> Self {
        self.max_segment_size = bytes;
        self
    }
}

/// A Bitcask-style key-value store: one active append-only segment, any
/// number of frozen read-only ones, and an in-memory directory resolving
/// every live key to its latest record.
///
/// The engine is meant to be shared: all operations take `&self`, so a
/// single instance can be wrapped in an `Arc` and used from many threads.
/// [`close`](Engine::close) consumes the engine, which statically rules
/// out operations racing shutdown.
pub struct Engine {
    base: PathBuf,
    max_segment_size: u64,
    /// Key → latest record location. Lookups take the read half; the write
    /// path and deletes take the write half.
    keydir: RwLock<KeyDir>,
    /// All open segments, indexed by segment id. The last one is active.
    segments: RwLock<Vec<Arc<Segment>>>,
    /// Linearizes the whole append path: rollover decision, the append
    /// itself, and the directory update. Readers never touch this.
    append_lock: Mutex<()>,
}

impl Engine {
    /// Opens (or creates) the store rooted at `base`.
    ///
    /// `base` is a path prefix, not a directory: segments live at
    /// `<base>_<N>` and the directory snapshot at `<base>.hint`. If a
    /// usable snapshot exists the directory is loaded from it; otherwise
    /// every segment is scanned front to back. A missing, truncated, or
    /// corrupt snapshot is logged and downgraded to scan recovery, never
    /// surfaced as an error.
    ///
    /// Not safe to race with other operations on the same files; open is
    /// one-time setup.
    pub fn open(base: impl AsRef<Path>, options: Options) -> Result<Engine> {
        if options.max_segment_size == 0 {
            return Err(EngineError::InvalidSegmentSize);
        }
        let base = base.as_ref().to_path_buf();

        let found = paths::discover_segments(&base)?;
        for (position, (id, path)) in found.iter().enumerate() {
            if *id as usize != position {
                return Err(EngineError::Corruption(format!(
                    "segment files are not contiguous: expected id {position}, found {}",
                    path.display()
                )));
            }
        }

        let keydir = match Self::load_snapshot(&base, &found) {
            Some(dir) => dir,
            None => Self::scan(&found)?,
        };

        let mut segments = Vec::with_capacity(found.len().max(1));
        for (_, path) in &found {
            segments.push(Arc::new(Segment::open(path)?));
        }
        if segments.is_empty() {
            segments.push(Arc::new(Segment::open(paths::segment_path(&base, 0))?));
        }

        Ok(Engine {
            base,
            max_segment_size: options.max_segment_size,
            keydir: RwLock::new(keydir),
            segments: RwLock::new(segments),
            append_lock: Mutex::new(()),
        })
    }

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// On error the directory is untouched and the key keeps its prior
    /// value; at worst the segment carries a torn record that scan
    /// recovery will skip.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let timestamp = now_nanos();
        let data = record::encode(timestamp, key, value);

        let _append = self.append_lock.lock();

        let (segment_id, seg) = self.active_segment();
        let (segment_id, seg) = if seg.size()? >= self.max_segment_size {
            self.roll_over()?
        } else {
            (segment_id, seg)
        };

        let (n, end) = seg.append(&data)?;
        let entry = Entry::new(segment_id, end - n, n, timestamp);
        self.keydir.write().insert(key.to_vec(), entry);
        Ok(())
    }

    /// Returns the current value for `key`, or `None` if the key was never
    /// written or has been deleted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entry = match self.keydir.read().get(key) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let seg = {
            let segments = self.segments.read();
            match segments.get(entry.segment_id as usize) {
                Some(seg) => Arc::clone(seg),
                None => {
                    return Err(EngineError::Corruption(format!(
                        "directory references unknown segment {}",
                        entry.segment_id
                    )))
                }
            }
        };

        let mut buf = vec![0u8; entry.len as usize];
        seg.read_at(&mut buf, entry.offset)?;
        let rec = record::decode(&buf)?;
        if rec.key != key {
            return Err(EngineError::Corruption(format!(
                "record at segment {} offset {} holds a different key",
                entry.segment_id, entry.offset
            )));
        }
        Ok(Some(rec.value.to_vec()))
    }

    /// Soft delete: removes the directory entry. The on-disk record stays
    /// behind as dead data until a future merge pass. A crash before the
    /// next clean close loses the delete (the prior value re-emerges
    /// through scan recovery); a clean close preserves it via the hint
    /// snapshot.
    pub fn delete(&self, key: &[u8]) {
        self.keydir.write().remove(key);
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.keydir.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keydir.read().is_empty()
    }

    /// Flushes every segment and snapshots the directory to the hint file.
    ///
    /// Callers must quiesce all other operations first; taking `self` by
    /// value enforces that. A segment flush error is returned, but the
    /// hint write is still attempted so the next open stays fast.
    pub fn close(self) -> Result<()> {
        let mut first_err: Option<std::io::Error> = None;
        for seg in self.segments.read().iter() {
            if let Err(err) = seg.sync() {
                log::warn!("sync of {} failed: {err}", seg.path().display());
                first_err.get_or_insert(err);
            }
        }

        let hint_result = HintWriter::write_snapshot(&paths::hint_path(&self.base), &self.keydir.read())
            .map_err(|err| EngineError::Hint(format!("{err:#}")));

        match first_err {
            Some(err) => Err(err.into()),
            None => hint_result,
        }
    }

    /// Loads the hint snapshot if one exists and passes validation,
    /// including the check that every referenced segment id has a file on
    /// disk. Returns `None` when scan recovery should run instead.
    fn load_snapshot(base: &Path, found: &[(u32, PathBuf)]) -> Option<KeyDir> {
        let hint = paths::hint_path(base);
        if !hint.exists() {
            return None;
        }
        match HintReader::read_snapshot(&hint) {
            Ok(snapshot) => match snapshot.max_segment_id() {
                Some(max) if max as usize >= found.len() => {
                    log::warn!(
                        "hint snapshot references segment {max} with no file on disk; \
                         falling back to scan recovery"
                    );
                    None
                }
                _ => Some(snapshot),
            },
            Err(err) => {
                log::warn!(
                    "unreadable hint file {}: {err:#}; falling back to scan recovery",
                    hint.display()
                );
                None
            }
        }
    }

    /// Rebuilds the directory by reading every record of every segment.
    ///
    /// Segments are visited newest-first and the first entry seen for a
    /// key wins, so a key overwritten in a later segment resolves to the
    /// later record. Within one segment the records are walked front to
    /// back into a local map where the *last* occurrence wins — inside a
    /// segment, later offsets are newer.
    fn scan(found: &[(u32, PathBuf)]) -> Result<KeyDir> {
        let mut dir = KeyDir::new();
        for (id, path) in found.iter().rev() {
            for (key, entry) in Self::scan_segment(path, *id)? {
                dir.insert_if_absent(key, entry);
            }
        }
        if !found.is_empty() {
            log::info!(
                "scan recovery rebuilt {} keys from {} segment files",
                dir.len(),
                found.len()
            );
        }
        Ok(dir)
    }

    /// Walks one segment's records from offset 0, returning the latest
    /// entry per key. A record whose header or body extends past
    /// end-of-file ends the walk: everything before it is the valid
    /// prefix, which is how a torn append from a crash gets dropped.
    fn scan_segment(path: &Path, segment_id: u32) -> Result<HashMap<Vec<u8>, Entry>> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut rdr = BufReader::new(file);

        let mut latest: HashMap<Vec<u8>, Entry> = HashMap::new();
        let mut offset = 0u64;
        while offset < file_len {
            if offset + record::HEADER_LEN as u64 > file_len {
                log::warn!(
                    "truncated record header at {}:{offset}; keeping {} records before it",
                    path.display(),
                    latest.len()
                );
                break;
            }
            let mut header_buf = [0u8; record::HEADER_LEN];
            rdr.read_exact(&mut header_buf)?;
            let header = Header::decode(&header_buf)?;

            let end = header
                .key_size
                .checked_add(header.value_size)
                .and_then(|kv| kv.checked_add(record::HEADER_LEN as u64))
                .and_then(|len| offset.checked_add(len));
            let end = match end {
                Some(end) if end <= file_len => end,
                _ => {
                    log::warn!(
                        "truncated record body at {}:{offset}; keeping {} records before it",
                        path.display(),
                        latest.len()
                    );
                    break;
                }
            };

            let mut key = vec![0u8; header.key_size as usize];
            rdr.read_exact(&mut key)?;
            std::io::copy(
                &mut rdr.by_ref().take(header.value_size),
                &mut std::io::sink(),
            )?;

            latest.insert(key, Entry::new(segment_id, offset, end - offset, header.timestamp));
            offset = end;
        }
        Ok(latest)
    }

    fn active_segment(&self) -> (u32, Arc<Segment>) {
        let segments = self.segments.read();
        let id = segments.len() - 1;
        (id as u32, Arc::clone(&segments[id]))
    }

    /// Creates the next segment file and makes it active. Only called with
    /// the append lock held, so the new id and the list append cannot race
    /// another writer.
    fn roll_over(&self) -> Result<(u32, Arc<Segment>)> {
        let mut segments = self.segments.write();
        let id = segments.len() as u32;
        let seg = Arc::new(Segment::open(paths::segment_path(&self.base, id))?);
        segments.push(Arc::clone(&seg));
        Ok((id, seg))
    }
}

/// Nanoseconds since the Unix epoch. Read once per set; the record on disk
/// and the directory entry carry the same value.
fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
