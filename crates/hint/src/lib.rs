//! # Hint file — key directory snapshots
//!
//! Serialization of the engine's in-memory [`keydir::KeyDir`] to a single
//! `<base>.hint` file, written at close and consumed at open so a restart
//! can skip scanning every segment.
//!
//! ## File layout (v1)
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ HEADER (16 bytes)                                  │
//! │                                                    │
//! │ magic (u32 LE) "KDH1" | crc32(payload) (u32 LE)    │
//! │ entry_count (u64 LE)                               │
//! ├────────────────────────────────────────────────────┤
//! │ PAYLOAD (one entry per live key)                   │
//! │                                                    │
//! │ key_len (u64) | key | segment_id (u32)             │
//! │ offset (u64) | len (u64) | timestamp (u64)         │
//! │                                                    │
//! │ ... repeated entry_count times ...                 │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The format is private to this engine:
//! the only contract is that a snapshot written by [`HintWriter`] reads
//! back equal through [`HintReader`], and that anything else — a missing
//! file, a torn write, a flipped bit, a different version — surfaces as an
//! error so the engine can fall back to scan recovery.

mod format;
mod reader;
mod writer;

pub use format::{HEADER_BYTES, HINT_MAGIC};
pub use reader::HintReader;
pub use writer::HintWriter;
