//! Position sequencer
//!
//! The sequencer is the single serialization point the rest of the system
//! relies on: every `next` call returns a globally unique, strictly
//! increasing position, and a single call covering several streams is the
//! atomic ordering point a multi-stream transaction commit needs.
//!
//! Alongside the global tail it tracks the highest position reserved for
//! each stream, so readers can bound their scans to slots that can actually
//! carry their stream.

use braid_common::{Position, StreamId};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

struct SequencerInner {
    tail: u64,
    stream_tails: HashMap<StreamId, u64>,
}

/// Linearizable issuer of global log positions.
pub struct Sequencer {
    inner: Mutex<SequencerInner>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SequencerInner {
                tail: 0,
                stream_tails: HashMap::new(),
            }),
        }
    }

    /// Reserve the next position for an entry tagged with exactly `streams`.
    ///
    /// The reservation and the per-stream tail updates happen atomically:
    /// once `next` returns, any `tail`/`stream_tail` observation made
    /// afterwards reflects this reservation.
    pub fn next(&self, streams: &BTreeSet<StreamId>) -> Position {
        let mut inner = self.inner.lock();
        inner.tail += 1;
        let position = inner.tail;
        for stream in streams {
            inner.stream_tails.insert(*stream, position);
        }
        Position(position)
    }

    /// Reserve the next position for a single-stream entry.
    pub fn next_for(&self, stream: StreamId) -> Position {
        let mut inner = self.inner.lock();
        inner.tail += 1;
        let position = inner.tail;
        inner.stream_tails.insert(stream, position);
        Position(position)
    }

    /// The highest position issued so far (zero when none).
    pub fn tail(&self) -> Position {
        Position(self.inner.lock().tail)
    }

    /// The highest position ever reserved for the given stream.
    pub fn stream_tail(&self, stream: &StreamId) -> Position {
        Position(
            self.inner
                .lock()
                .stream_tails
                .get(stream)
                .copied()
                .unwrap_or(0),
        )
    }

    /// Atomically observe `(tail, stream_tail)` for one stream.
    ///
    /// Readers use the pair to pick a scan target and the per-stream bound
    /// without a window where a reservation lands between the two reads.
    pub fn bounds(&self, stream: &StreamId) -> (Position, Position) {
        let inner = self.inner.lock();
        let stream_tail = inner.stream_tails.get(stream).copied().unwrap_or(0);
        (Position(inner.tail), Position(stream_tail))
    }

    /// Administrative wipe back to an empty log. Test/bootstrap only.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.tail = 0;
        inner.stream_tails.clear();
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
