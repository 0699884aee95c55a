//! Error types for the shared log

use braid_common::Position;
use thiserror::Error;

/// Result type for log operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Errors that can occur against the address space and sequencer
#[derive(Error, Debug)]
pub enum LogError {
    /// A second write raced to an already-filled position. The caller must
    /// obtain a fresh position and retry the append from the top.
    #[error("position {0} already written")]
    PositionAlreadyWritten(Position),

    /// The position is reserved or beyond the tail but carries no entry yet.
    /// Transient; readers poll with bounded backoff.
    #[error("position {0} not yet written")]
    EntryNotYetWritten(Position),

    /// The position was trimmed away by the administrative trim boundary.
    #[error("position {0} has been trimmed")]
    EntryTrimmed(Position),

    /// Bounded polling for a reserved slot ran out of attempts.
    #[error("timed out waiting for position {0}")]
    WaitTimeout(Position),

    /// The underlying coordination mechanism is unavailable. Terminal for
    /// the in-flight operation.
    #[error("log unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] fjall::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entry codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
