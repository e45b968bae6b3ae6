//! # KeyDir
//!
//! The in-memory key directory for the FirkinKV storage engine.
//!
//! For every live key the directory holds the exact location of its most
//! recently written record: which segment file, at what byte offset, how
//! many bytes, and the record's timestamp. Reads never touch disk until the
//! directory has resolved the key; writes update the directory only after
//! the record is durably appended.
//!
//! ## Key properties
//! - **Authoritative**: a `get` served through the directory points at a byte
//!   range that was fully written before the entry became visible.
//! - **Overwrite = replace**: the previous record stays on disk as dead data
//!   but is unreachable once its entry is replaced.
//! - **Soft delete**: removing the entry is the whole delete operation; no
//!   on-disk marker is written.
//!
//! The directory itself carries no locking. The engine wraps it in a
//! readers–writer lock and owns the synchronization policy.
//!
//! ## Example
//! ```rust
//! use keydir::{Entry, KeyDir};
//!
//! let mut dir = KeyDir::new();
//! dir.insert(b"hello".to_vec(), Entry::new(0, 0, 34, 1));
//! assert_eq!(dir.get(b"hello").unwrap().len, 34);
//!
//! dir.remove(b"hello");
//! assert!(dir.get(b"hello").is_none());
//! ```

use std::collections::HashMap;

/// Location of a key's most recent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Index of the segment file holding the record (the `<base>_<N>` suffix).
    pub segment_id: u32,
    /// Byte offset of the record start within that segment.
    pub offset: u64,
    /// Total record length: header + key + value bytes.
    pub len: u64,
    /// The record's timestamp, nanoseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Entry {
    pub fn new(segment_id: u32, offset: u64, len: u64, timestamp: u64) -> Self {
        Self {
            segment_id,
            offset,
            len,
            timestamp,
        }
    }

    /// Offset one past the record's last byte. Never exceeds the segment's
    /// size for a directory kept in sync with the write path.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Mapping from key bytes to the location of the key's latest record.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KeyDir {
    map: HashMap<Vec<u8>, Entry>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }

    /// Upserts the entry for `key`, returning the replaced entry if any.
    pub fn insert(&mut self, key: Vec<u8>, entry: Entry) -> Option<Entry> {
        self.map.insert(key, entry)
    }

    /// Inserts only if `key` has no entry yet.
    ///
    /// Scan recovery visits segments newest-first, so the first entry seen
    /// for a key is the one that must win; later (older) sightings are
    /// ignored. Returns `true` if the entry was inserted.
    pub fn insert_if_absent(&mut self, key: Vec<u8>, entry: Entry) -> bool {
        use std::collections::hash_map::Entry as Slot;
        match self.map.entry(key) {
            Slot::Occupied(_) => false,
            Slot::Vacant(v) => {
                v.insert(entry);
                true
            }
        }
    }

    /// Returns the current entry for `key`, or `None` for absent or deleted
    /// keys.
    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        self.map.get(key).copied()
    }

    /// Erases the entry for `key`, returning it if it existed. This is the
    /// entire delete operation: the on-disk record stays behind as dead data.
    pub fn remove(&mut self, key: &[u8]) -> Option<Entry> {
        self.map.remove(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all live keys and their entries, in no particular
    /// order. The hint-file writer snapshots the directory through this.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Entry)> {
        self.map.iter()
    }

    /// Largest segment id referenced by any entry, or `None` when empty.
    /// The engine uses this to validate a loaded snapshot against the
    /// segment files actually present on disk.
    pub fn max_segment_id(&self) -> Option<u32> {
        self.map.values().map(|e| e.segment_id).max()
    }
}

impl FromIterator<(Vec<u8>, Entry)> for KeyDir {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, Entry)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
