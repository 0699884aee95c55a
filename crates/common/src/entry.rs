//! Log entries
//!
//! An entry is the immutable payload stored at one position. It carries the
//! set of streams it belongs to and either a single mutation record, a
//! composite transaction commit, or a hole fill for an abandoned
//! reservation.

use crate::{OpRecord, Position, StreamId, TxId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Composite record written by a committing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Identity of the committing transaction
    pub tx_id: TxId,
    /// Buffered write records, grouped by stream in buffering order
    pub writes: BTreeMap<StreamId, Vec<OpRecord>>,
    /// Streams the transaction read, with the position each was observed at
    pub read_set: BTreeMap<StreamId, Position>,
}

/// Payload stored at one log position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryPayload {
    /// A single object mutation
    Mutation(OpRecord),
    /// A multi-stream transaction commit
    Commit(CommitRecord),
    /// Filler for a reservation whose transaction aborted during validation.
    /// Carries no records; replay and conflict validation skip it.
    Hole { tx_id: TxId },
}

/// An immutable entry stored at a position in the shared log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The position this entry was written at
    pub position: Position,
    /// Every stream this entry logically belongs to
    pub streams: BTreeSet<StreamId>,
    /// The stored payload
    pub payload: EntryPayload,
}

impl LogEntry {
    /// Build a single-stream mutation entry.
    pub fn mutation(position: Position, stream: StreamId, record: OpRecord) -> Self {
        let mut streams = BTreeSet::new();
        streams.insert(stream);
        Self {
            position,
            streams,
            payload: EntryPayload::Mutation(record),
        }
    }

    /// Build a composite commit entry tagged with the full stream set.
    pub fn commit(position: Position, streams: BTreeSet<StreamId>, record: CommitRecord) -> Self {
        Self {
            position,
            streams,
            payload: EntryPayload::Commit(record),
        }
    }

    /// Build a hole-fill entry for an abandoned reservation.
    pub fn hole(position: Position, streams: BTreeSet<StreamId>, tx_id: TxId) -> Self {
        Self {
            position,
            streams,
            payload: EntryPayload::Hole { tx_id },
        }
    }

    /// Whether this entry belongs to the given stream.
    pub fn belongs_to(&self, stream: &StreamId) -> bool {
        self.streams.contains(stream)
    }

    /// Whether this entry is a transaction commit.
    pub fn is_commit(&self) -> bool {
        matches!(self.payload, EntryPayload::Commit(_))
    }

    /// Whether this entry is a hole fill.
    pub fn is_hole(&self) -> bool {
        matches!(self.payload, EntryPayload::Hole { .. })
    }

    /// The mutation records belonging to one stream, in application order.
    ///
    /// Empty for holes and for commit entries where the stream was a
    /// read-only participant.
    pub fn ops_for(&self, stream: &StreamId) -> &[OpRecord] {
        if !self.belongs_to(stream) {
            return &[];
        }
        match &self.payload {
            EntryPayload::Mutation(record) => std::slice::from_ref(record),
            EntryPayload::Commit(commit) => commit
                .writes
                .get(stream)
                .map(|records| records.as_slice())
                .unwrap_or(&[]),
            EntryPayload::Hole { .. } => &[],
        }
    }
}
