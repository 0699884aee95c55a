//! Materialized log objects
//!
//! A `LogObject` binds a stream view to a state machine and keeps the two
//! in sync: accessors catch up before answering, mutators append before
//! applying. One async mutex guards the pair so folds never interleave
//! when the same instance is shared across tasks.

use crate::error::Result;
use crate::machine::StateMachine;
use crate::view::StreamView;
use braid_common::{EntryPayload, LogEntry, OpRecord, Operation, Position, StreamId};
use braid_log::SharedLog;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

struct Materialized<S> {
    view: StreamView,
    state: S,
}

/// A replicated object: local state equal to the deterministic fold of its
/// stream up to the view's cursor.
pub struct LogObject<S: StateMachine> {
    stream: StreamId,
    tx_log: bool,
    inner: Mutex<Materialized<S>>,
}

impl<S: StateMachine> LogObject<S> {
    pub(crate) fn new(log: Arc<SharedLog>, stream: StreamId, tx_log: bool) -> Self {
        let view = StreamView::new(log, stream);
        Self {
            stream,
            tx_log,
            inner: Mutex::new(Materialized {
                view,
                state: S::default(),
            }),
        }
    }

    /// The stream this object is bound to.
    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Whether commits touching this object are recorded on the audit
    /// stream.
    pub fn tx_log_enabled(&self) -> bool {
        self.tx_log
    }

    /// Execute one operation directly against the shared object.
    ///
    /// Read operations catch up first, so the answer reflects everything
    /// durably appended by anyone before this call. Write operations append
    /// to the log, fold any concurrently appended predecessors, then apply
    /// the own record - durable before visible, so a crash in between is
    /// recovered by replay.
    pub async fn execute(&self, op: S::Operation) -> Result<S::Response> {
        let mut inner = self.inner.lock().await;
        if op.is_write() {
            let record = OpRecord::encode(&op)?;
            let position = inner.view.append(EntryPayload::Mutation(record)).await?;

            let predecessors = inner.view.read_to(position.prev()).await?;
            self.fold(&mut inner, &predecessors)?;

            let response = inner.state.apply(&op);
            inner.view.advance_to(position);
            Ok(response)
        } else {
            let entries = inner.view.read_new().await?;
            self.fold(&mut inner, &entries)?;
            Ok(inner.state.read(&op))
        }
    }

    /// Fold every new entry on this stream into local state.
    pub async fn catch_up(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let entries = inner.view.read_new().await?;
        self.fold(&mut inner, &entries)
    }

    /// Fold new entries up to and including `position`.
    pub(crate) async fn catch_up_to(&self, position: Position) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let entries = inner.view.read_to(position).await?;
        self.fold(&mut inner, &entries)
    }

    /// Catch up, then evaluate a closure against the folded state.
    pub async fn inspect<R>(&self, f: impl FnOnce(&S) -> R) -> Result<R> {
        let mut inner = self.inner.lock().await;
        let entries = inner.view.read_new().await?;
        self.fold(&mut inner, &entries)?;
        Ok(f(&inner.state))
    }

    /// Catch up and export a consistent snapshot of current state as a
    /// rebuild sequence, together with the position it reflects.
    pub(crate) async fn export_snapshot(&self) -> Result<(Vec<S::Operation>, Position)> {
        let mut inner = self.inner.lock().await;
        let entries = inner.view.read_new().await?;
        self.fold(&mut inner, &entries)?;
        Ok((inner.state.export(), inner.view.cursor()))
    }

    /// Seed a fresh object by appending and applying a rebuild sequence.
    pub(crate) async fn replay_ops(&self, ops: Vec<S::Operation>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for op in ops {
            let record = OpRecord::encode(&op)?;
            let position = inner.view.append(EntryPayload::Mutation(record)).await?;
            inner.state.apply(&op);
            inner.view.advance_to(position);
        }
        Ok(())
    }

    /// Fold a batch of entries into state. All records are decoded before
    /// any is applied, so a codec failure leaves state untouched.
    fn fold(&self, inner: &mut Materialized<S>, entries: &[LogEntry]) -> Result<()> {
        let mut ops = Vec::new();
        for entry in entries {
            for record in entry.ops_for(&self.stream) {
                ops.push(record.decode::<S::Operation>()?);
            }
        }
        for op in &ops {
            inner.state.apply(op);
        }
        Ok(())
    }
}

impl<S: StateMachine> fmt::Debug for LogObject<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogObject")
            .field("stream", &self.stream)
            .field("tx_log", &self.tx_log)
            .finish_non_exhaustive()
    }
}
