//! Error types for the engine's public surface.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Unified error type for engine operations.
///
/// A missing key is **not** an error: [`Engine::get`](crate::Engine::get)
/// returns `Ok(None)` for absent or deleted keys. The variants here are
/// real failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record codec: {0}")]
    Record(#[from] record::RecordError),

    #[error("corruption detected: {0}")]
    Corruption(String),

    #[error("invalid max_segment_size: must be greater than zero")]
    InvalidSegmentSize,

    #[error("hint snapshot: {0}")]
    Hint(String),
}
