//! Stream views
//!
//! A stream view is one opener's private cursor into one stream. It owns
//! nothing in the log; it remembers the last position it has scanned and
//! turns the flat address space into "new entries for this stream since
//! last time".

use crate::error::{Result, RuntimeError};
use braid_common::{EntryPayload, LogEntry, Position, StreamId};
use braid_log::{LogError, SharedLog};
use std::sync::Arc;
use tracing::trace;

/// How many fresh reservations an append will burn before giving up on
/// repeated write races.
const APPEND_ATTEMPTS: u32 = 4;

/// Per-opener cursor over one stream of the shared log.
///
/// Never shared between objects: two objects on the same stream each hold
/// their own view and converge because replay is deterministic.
pub struct StreamView {
    log: Arc<SharedLog>,
    stream: StreamId,
    /// Highest position this view has scanned, exclusive lower bound of the
    /// next read.
    cursor: Position,
}

impl StreamView {
    /// A view starting before the first entry.
    pub fn new(log: Arc<SharedLog>, stream: StreamId) -> Self {
        Self::at(log, stream, Position::ZERO)
    }

    /// A view with its cursor pre-positioned, e.g. at a snapshot.
    pub fn at(log: Arc<SharedLog>, stream: StreamId, cursor: Position) -> Self {
        Self {
            log,
            stream,
            cursor,
        }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Move the cursor forward without scanning. Used by the append path
    /// once the appended entry itself has been applied.
    pub fn advance_to(&mut self, position: Position) {
        if position > self.cursor {
            self.cursor = position;
        }
    }

    /// Append a single-stream entry: reserve a position, then write it.
    ///
    /// A lost write race means the reservation was somehow burned; the
    /// append re-runs the reservation from the top a bounded number of
    /// times before surfacing the failure.
    pub async fn append(&mut self, payload: EntryPayload) -> Result<Position> {
        for _ in 0..APPEND_ATTEMPTS {
            let position = self.log.next_for(self.stream);
            let entry = LogEntry {
                position,
                streams: [self.stream].into_iter().collect(),
                payload: payload.clone(),
            };
            match self.log.write(entry) {
                Ok(()) => {
                    trace!(stream = %self.stream, %position, "appended entry");
                    return Ok(position);
                }
                Err(LogError::PositionAlreadyWritten(_)) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        Err(RuntimeError::AppendRaceExhausted(APPEND_ATTEMPTS))
    }

    /// Return every entry for this stream past the cursor, up to the log
    /// tail observed at call time, in increasing position order. Advances
    /// the cursor to the scanned tail.
    pub async fn read_new(&mut self) -> Result<Vec<LogEntry>> {
        let (tail, stream_bound) = self.log.bounds(&self.stream);
        self.read_span(tail, stream_bound).await
    }

    /// Like [`read_new`](Self::read_new) but bounded above by `target`
    /// (inclusive). Used by transaction validation to inspect exactly the
    /// range between a snapshot and a commit reservation.
    pub async fn read_to(&mut self, target: Position) -> Result<Vec<LogEntry>> {
        let (_, stream_bound) = self.log.bounds(&self.stream);
        self.read_span(target, stream_bound).await
    }

    /// Scan `(cursor, target]` and collect the entries belonging to this
    /// stream. Only slots at or below `stream_bound` can carry the stream,
    /// so the walk stops there; slots reserved for the stream but still
    /// in flight are waited on (bounded) so no entry is ever skipped.
    async fn read_span(&mut self, target: Position, stream_bound: Position) -> Result<Vec<LogEntry>> {
        if target <= self.cursor {
            return Ok(Vec::new());
        }

        let scan_to = target.min(stream_bound);
        let mut matched = Vec::new();
        let mut position = self.cursor.next();
        while position <= scan_to {
            let entry = self.log.read_waiting(position).await?;
            if entry.belongs_to(&self.stream) {
                matched.push(entry);
            }
            position = position.next();
        }

        self.cursor = target;
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_common::OpRecord;

    fn record(name: &str) -> EntryPayload {
        EntryPayload::Mutation(OpRecord {
            name: name.to_string(),
            args: serde_json::Value::Null,
        })
    }

    #[tokio::test]
    async fn test_append_then_read_new() {
        let log = SharedLog::in_memory();
        let stream = StreamId::new();
        let mut writer = StreamView::new(log.clone(), stream);
        let mut reader = StreamView::new(log.clone(), stream);

        writer.append(record("a")).await.unwrap();
        writer.append(record("b")).await.unwrap();

        let entries = reader.read_new().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].position < entries[1].position);

        // Nothing new on a second read.
        assert!(reader.read_new().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_new_filters_other_streams() {
        let log = SharedLog::in_memory();
        let mine = StreamId::new();
        let other = StreamId::new();

        StreamView::new(log.clone(), other)
            .append(record("x"))
            .await
            .unwrap();
        StreamView::new(log.clone(), mine)
            .append(record("y"))
            .await
            .unwrap();

        let mut reader = StreamView::new(log.clone(), mine);
        let entries = reader.read_new().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].position, Position(2));
        // Cursor covers the full scanned range, not just matches.
        assert_eq!(reader.cursor(), Position(2));
    }

    #[tokio::test]
    async fn test_read_to_bounds_the_scan() {
        let log = SharedLog::in_memory();
        let stream = StreamId::new();
        let mut writer = StreamView::new(log.clone(), stream);

        let first = writer.append(record("a")).await.unwrap();
        let second = writer.append(record("b")).await.unwrap();

        let mut reader = StreamView::new(log.clone(), stream);
        let upto_first = reader.read_to(first).await.unwrap();
        assert_eq!(upto_first.len(), 1);
        assert_eq!(reader.cursor(), first);

        let rest = reader.read_new().await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].position, second);
    }

    #[tokio::test]
    async fn test_independent_cursors() {
        let log = SharedLog::in_memory();
        let stream = StreamId::new();
        let mut writer = StreamView::new(log.clone(), stream);
        writer.append(record("a")).await.unwrap();

        let mut first = StreamView::new(log.clone(), stream);
        let mut second = StreamView::new(log.clone(), stream);
        assert_eq!(first.read_new().await.unwrap().len(), 1);
        // An independent view still sees the entry.
        assert_eq!(second.read_new().await.unwrap().len(), 1);
    }
}
