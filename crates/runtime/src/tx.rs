//! Optimistic transaction context
//!
//! A `TxContext` is an explicit handle the caller threads through every
//! object call - there is no ambient per-thread transaction. While a
//! transaction is active, reads come from per-stream views frozen at the
//! snapshot position with the transaction's own buffered writes folded on
//! top, and writes only touch the buffer. Commit reserves one position
//! spanning every touched stream, validates the intervening range on each
//! observed stream, and writes a single composite entry or nothing at all.

use crate::error::{Result, RuntimeError};
use crate::machine::StateMachine;
use crate::object::LogObject;
use crate::view::StreamView;
use braid_common::{
    CommitRecord, EntryPayload, LogEntry, OpRecord, Operation, Position, StreamId, TxId,
};
use braid_log::SharedLog;
use async_trait::async_trait;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a context is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// No transaction active; object calls pass straight through.
    Inactive,
    /// Buffering reads and writes since `begin`.
    Active,
    /// Last transaction on this context committed.
    Committed,
    /// Last transaction on this context aborted.
    Aborted,
}

impl TxState {
    fn is_active(&self) -> bool {
        matches!(self, TxState::Active)
    }
}

/// A materializer that participated in a transaction and wants the commit
/// folded into its local state as soon as the composite entry is durable.
#[async_trait]
pub trait CommitSink: Send + Sync {
    /// The stream the participant is bound to.
    fn sink_stream(&self) -> StreamId;

    /// Whether this participant asks for commits to be audit-logged.
    fn sink_tx_log(&self) -> bool;

    /// Fold the log through `position` into local state.
    async fn absorb_through(&self, position: Position) -> Result<()>;
}

#[async_trait]
impl<S: StateMachine> CommitSink for LogObject<S> {
    fn sink_stream(&self) -> StreamId {
        self.stream()
    }

    fn sink_tx_log(&self) -> bool {
        self.tx_log_enabled()
    }

    async fn absorb_through(&self, position: Position) -> Result<()> {
        self.catch_up_to(position).await
    }
}

/// Explicit per-caller transaction handle.
///
/// Outside an active transaction, [`execute`](Self::execute) behaves as a
/// direct object call, so callers can thread one context unconditionally.
pub struct TxContext {
    log: Arc<SharedLog>,
    audit_stream: StreamId,
    state: TxState,
    tx_id: TxId,
    snapshot: Position,
    writes: BTreeMap<StreamId, Vec<OpRecord>>,
    read_set: BTreeMap<StreamId, Position>,
    /// Transaction-local materialized states, keyed by stream, type-erased
    /// per participating object type.
    views: HashMap<StreamId, Box<dyn Any + Send + Sync>>,
    participants: HashMap<StreamId, Arc<dyn CommitSink>>,
}

impl TxContext {
    pub(crate) fn new(log: Arc<SharedLog>, audit_stream: StreamId) -> Self {
        Self {
            log,
            audit_stream,
            state: TxState::Inactive,
            tx_id: TxId::new(),
            snapshot: Position::ZERO,
            writes: BTreeMap::new(),
            read_set: BTreeMap::new(),
            views: HashMap::new(),
            participants: HashMap::new(),
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// The position this transaction's reads are pinned to.
    pub fn snapshot(&self) -> Position {
        self.snapshot
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    /// Start a transaction: pin the snapshot to the current log tail and
    /// reset the buffers. Fails with [`RuntimeError::AlreadyInTransaction`]
    /// while a transaction is active.
    pub fn begin(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(RuntimeError::AlreadyInTransaction);
        }
        self.state = TxState::Active;
        self.tx_id = TxId::new();
        self.snapshot = self.log.tail();
        self.clear_buffers();
        debug!(tx_id = %self.tx_id, snapshot = %self.snapshot, "transaction begin");
        Ok(())
    }

    /// Execute one operation through this context.
    ///
    /// Active: reads answer from the frozen snapshot view plus own buffered
    /// writes and are recorded in the read set; writes are buffered without
    /// any log traffic. Not active: plain direct call on the object.
    pub async fn execute<S: StateMachine>(
        &mut self,
        obj: &Arc<LogObject<S>>,
        op: S::Operation,
    ) -> Result<S::Response> {
        if !self.is_active() {
            return obj.execute(op).await;
        }

        let stream = obj.stream();
        self.participants
            .entry(stream)
            .or_insert_with(|| obj.clone() as Arc<dyn CommitSink>);
        self.materialize_view::<S>(stream).await?;

        if op.is_write() {
            let record = OpRecord::encode(&op)?;
            let state = self.view_state::<S>(stream)?;
            let response = state.apply(&op);
            self.writes.entry(stream).or_default().push(record);
            Ok(response)
        } else {
            self.read_set.insert(stream, self.snapshot);
            let state = self.view_state::<S>(stream)?;
            Ok(state.read(&op))
        }
    }

    /// Commit the active transaction.
    ///
    /// A transaction with no buffered writes commits trivially: no log
    /// entry, no validation, `Ok(None)`. Otherwise one position is reserved
    /// across the union of written and read streams, every read stream is
    /// validated over `(snapshot, commit)`, and on success the composite
    /// entry is written and folded into each participant.
    pub async fn commit(&mut self) -> Result<Option<Position>> {
        if !self.is_active() {
            return Err(RuntimeError::NoActiveTransaction);
        }

        if self.writes.is_empty() {
            debug!(tx_id = %self.tx_id, "read-only transaction, nothing to commit");
            self.state = TxState::Committed;
            self.clear_buffers();
            return Ok(None);
        }

        let union: BTreeSet<StreamId> = self
            .writes
            .keys()
            .chain(self.read_set.keys())
            .copied()
            .collect();
        let commit_position = self.log.next(&union);

        match self.validate(commit_position).await {
            Ok(None) => {}
            Ok(Some(conflict)) => {
                self.fill_hole(commit_position, &union);
                warn!(
                    tx_id = %self.tx_id,
                    stream = %conflict.0,
                    position = %conflict.1,
                    "transaction aborted on conflict"
                );
                self.state = TxState::Aborted;
                self.clear_buffers();
                return Err(RuntimeError::TransactionAborted {
                    stream: conflict.0,
                    position: conflict.1,
                });
            }
            Err(err) => {
                // Validation itself failed (e.g. a wait timed out). Release
                // the reservation so nobody waits on a dead slot.
                self.fill_hole(commit_position, &union);
                self.state = TxState::Aborted;
                self.clear_buffers();
                return Err(err);
            }
        }

        let record = CommitRecord {
            tx_id: self.tx_id,
            writes: std::mem::take(&mut self.writes),
            read_set: self.read_set.clone(),
        };
        if let Err(err) = self
            .log
            .write(LogEntry::commit(commit_position, union.clone(), record))
        {
            self.state = TxState::Aborted;
            self.clear_buffers();
            return Err(err.into());
        }
        debug!(tx_id = %self.tx_id, position = %commit_position, "transaction committed");

        // The commit is durable from here on; what remains only propagates
        // it into local state.
        self.state = TxState::Committed;
        let participants = std::mem::take(&mut self.participants);
        let audit = participants.values().any(|sink| sink.sink_tx_log());
        self.clear_buffers();

        // Fold the commit into every participating materializer so the
        // committer observes it without another catch-up.
        for sink in participants.values() {
            sink.absorb_through(commit_position).await?;
        }

        if audit {
            self.append_audit_record(commit_position, &union).await?;
        }

        Ok(Some(commit_position))
    }

    /// Abort the active transaction, discarding the buffers without any log
    /// traffic. Aborting with no transaction active is a no-op; this never
    /// fails.
    pub fn abort(&mut self) {
        if self.is_active() {
            debug!(tx_id = %self.tx_id, "transaction aborted by caller");
            self.state = TxState::Aborted;
        }
        self.clear_buffers();
    }

    /// Scan each observed stream over `(snapshot, commit_position)`. Any
    /// entry there - whoever wrote it - conflicts; hole fills do not.
    async fn validate(
        &self,
        commit_position: Position,
    ) -> Result<Option<(StreamId, Position)>> {
        for stream in self.read_set.keys() {
            let mut view = StreamView::at(self.log.clone(), *stream, self.snapshot);
            let entries = view.read_to(commit_position.prev()).await?;
            if let Some(conflict) = entries.iter().find(|entry| !entry.is_hole()) {
                return Ok(Some((*stream, conflict.position)));
            }
        }
        Ok(None)
    }

    /// Fill an abandoned commit reservation so readers never wait on it.
    fn fill_hole(&self, position: Position, streams: &BTreeSet<StreamId>) {
        if let Err(err) = self
            .log
            .write(LogEntry::hole(position, streams.clone(), self.tx_id))
        {
            warn!(%position, error = %err, "failed to fill abandoned reservation");
        }
    }

    async fn append_audit_record(
        &self,
        commit_position: Position,
        streams: &BTreeSet<StreamId>,
    ) -> Result<()> {
        let record = OpRecord {
            name: "tx_commit".to_string(),
            args: serde_json::json!({
                "tx_id": self.tx_id.to_string(),
                "position": commit_position,
                "streams": streams
                    .iter()
                    .map(|stream| stream.to_string())
                    .collect::<Vec<_>>(),
            }),
        };
        let mut audit = StreamView::new(self.log.clone(), self.audit_stream);
        audit.append(EntryPayload::Mutation(record)).await?;
        Ok(())
    }

    /// Build the transaction-local view of a stream on first touch: fold
    /// the log up to the snapshot (never beyond), then any writes already
    /// buffered for the stream.
    async fn materialize_view<S: StateMachine>(&mut self, stream: StreamId) -> Result<()> {
        if self.views.contains_key(&stream) {
            return Ok(());
        }

        let mut state = S::default();
        let mut view = StreamView::new(self.log.clone(), stream);
        let entries = view.read_to(self.snapshot).await?;

        let mut ops = Vec::new();
        for entry in &entries {
            for record in entry.ops_for(&stream) {
                ops.push(record.decode::<S::Operation>()?);
            }
        }
        if let Some(buffered) = self.writes.get(&stream) {
            for record in buffered {
                ops.push(record.decode::<S::Operation>()?);
            }
        }
        for op in &ops {
            state.apply(op);
        }

        self.views.insert(stream, Box::new(state));
        Ok(())
    }

    fn view_state<S: StateMachine>(&mut self, stream: StreamId) -> Result<&mut S> {
        self.views
            .get_mut(&stream)
            .and_then(|boxed| boxed.downcast_mut::<S>())
            .ok_or_else(|| {
                RuntimeError::NotACoreObject(format!(
                    "stream {} is bound to a different object type in this transaction",
                    stream
                ))
            })
    }

    fn clear_buffers(&mut self) {
        self.writes.clear();
        self.read_set.clear();
        self.views.clear();
        self.participants.clear();
    }
}
