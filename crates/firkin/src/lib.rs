//! # FirkinKV
//!
//! An embeddable, single-node key-value storage engine in the Bitcask
//! style:
//! - Append-only segment files; writes never seek backwards
//! - An in-memory key directory mapping every live key to the byte range
//!   of its most recent record
//! - Hint-file snapshots for fast restart, with scan recovery as the
//!   fallback
//! - A single serialized writer coexisting with many lock-free readers
//!
//! ## Architecture overview
//!
//! ```text
//!            set / get / delete
//!                   │
//! ┌─────────────────▼─────────────────┐
//! │              Engine               │
//! │   rollover · recovery · close     │
//! └──┬───────────┬───────────┬────────┘
//!    │           │           │
//! ┌──▼───┐  ┌────▼────┐  ┌───▼────┐
//! │keydir│  │ segment │  │  hint  │
//! │(RAM) │  │ (disk)  │  │ (disk) │
//! └──────┘  └────┬────┘  └────────┘
//!                │
//!            ┌───▼────┐
//!            │ record │
//!            │ codec  │
//!            └────────┘
//! ```
//!
//! Values are read whole into memory; there is no compaction, replication,
//! or range scan — point lookups, overwriting writes, and soft deletes
//! only.
//!
//! ## Example
//!
//! ```no_run
//! use firkin::{Engine, Options};
//!
//! # fn main() -> firkin::Result<()> {
//! let engine = Engine::open("/var/lib/myapp/db", Options::default())?;
//! engine.set(b"yeet", b"donjon")?;
//! assert_eq!(engine.get(b"yeet")?.as_deref(), Some(&b"donjon"[..]));
//! engine.delete(b"yeet");
//! engine.close()?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod paths;

pub use engine::{Engine, Options, DEFAULT_MAX_SEGMENT_SIZE};
pub use error::{EngineError, Result};
