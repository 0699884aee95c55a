//! Common types for the braid shared log
//!
//! This crate defines:
//! - Log positions (globally ordered slot identifiers)
//! - Stream and transaction identifiers
//! - Operation records and the `Operation`/`OperationType` traits
//! - Log entries and composite transaction commit records

mod entry;
mod operation;
mod position;
mod stream_id;
mod tx_id;

pub use entry::{CommitRecord, EntryPayload, LogEntry};
pub use operation::{OpRecord, Operation, OperationType};
pub use position::Position;
pub use stream_id::StreamId;
pub use tx_id::TxId;
