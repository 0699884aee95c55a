//! Error types for the client runtime

use braid_common::{Position, StreamId};
use braid_log::LogError;
use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur in the object and transaction layers
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Log(#[from] LogError),

    /// Commit validation found a conflicting entry on an observed stream.
    /// Nothing was written; the transaction is aborted.
    #[error("transaction aborted: conflicting entry at {position} on stream {stream}")]
    TransactionAborted {
        stream: StreamId,
        position: Position,
    },

    /// TXBegin on a context that already has an active transaction.
    #[error("a transaction is already active on this context")]
    AlreadyInTransaction,

    /// TXEnd on a context with no active transaction.
    #[error("no active transaction on this context")]
    NoActiveTransaction,

    /// An object-level operation against something that is not (or is no
    /// longer) the log-backed object it was claimed to be.
    #[error("not a log-backed object: {0}")]
    NotACoreObject(String),

    /// Copy refuses to replay into a stream that already has history.
    #[error("copy target stream {0} already has history")]
    CopyTargetNotEmpty(StreamId),

    /// Append lost the write race repeatedly even with fresh reservations.
    #[error("append gave up after losing {0} write races")]
    AppendRaceExhausted(u32),

    #[error("operation codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
