//! Object open, copy, and instance caching
//!
//! The `Runtime` is the client-facing entry point: it holds the shared log
//! handle, resolves stream names, caches opened object instances, and hands
//! out transaction contexts.

use crate::error::{Result, RuntimeError};
use crate::machine::StateMachine;
use crate::object::LogObject;
use crate::tx::TxContext;
use braid_common::{Position, StreamId};
use braid_log::SharedLog;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Name of the dedicated stream committed transactions are audited to when
/// an object is opened with transaction logging.
pub const TX_AUDIT_STREAM_NAME: &str = "braid/tx-audit";

/// How an open call names its stream.
#[derive(Debug, Clone)]
pub enum StreamSpec {
    /// An explicit stream id.
    ById(StreamId),
    /// A human-readable name, resolved deterministically to an id.
    ByName(String),
}

impl StreamSpec {
    pub fn resolve(&self) -> StreamId {
        match self {
            StreamSpec::ById(id) => *id,
            StreamSpec::ByName(name) => StreamId::from_name(name),
        }
    }
}

impl From<StreamId> for StreamSpec {
    fn from(id: StreamId) -> Self {
        StreamSpec::ById(id)
    }
}

impl From<&str> for StreamSpec {
    fn from(name: &str) -> Self {
        StreamSpec::ByName(name.to_string())
    }
}

/// Explicit configuration for opening an object, evaluated once at open
/// time.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Which stream to bind.
    pub stream: StreamSpec,
    /// Skip the instance cache: always build a fresh materializer.
    pub no_cache: bool,
    /// Record commits touching this object on the audit stream.
    pub tx_log: bool,
}

impl OpenOptions {
    pub fn new(stream: impl Into<StreamSpec>) -> Self {
        Self {
            stream: stream.into(),
            no_cache: false,
            tx_log: false,
        }
    }

    pub fn without_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    pub fn with_tx_log(mut self) -> Self {
        self.tx_log = true;
        self
    }
}

#[derive(Clone)]
struct CacheSlot {
    type_id: TypeId,
    object: Arc<dyn Any + Send + Sync>,
}

/// Client runtime over one shared log.
pub struct Runtime {
    log: Arc<SharedLog>,
    cache: Mutex<HashMap<StreamId, CacheSlot>>,
    audit_stream: StreamId,
}

impl Runtime {
    pub fn new(log: Arc<SharedLog>) -> Self {
        Self {
            log,
            cache: Mutex::new(HashMap::new()),
            audit_stream: StreamId::from_name(TX_AUDIT_STREAM_NAME),
        }
    }

    pub fn log(&self) -> &Arc<SharedLog> {
        &self.log
    }

    /// The stream commit audit records land on.
    pub fn audit_stream(&self) -> StreamId {
        self.audit_stream
    }

    /// Open an object on a stream, replaying its existing history.
    ///
    /// By default the instance is cached per stream and a second open of
    /// the same stream returns the cached materializer; `no_cache` always
    /// builds an independent one. A cache hit under a different object
    /// type fails with [`RuntimeError::NotACoreObject`].
    pub async fn open<S: StateMachine>(&self, options: OpenOptions) -> Result<Arc<LogObject<S>>> {
        let stream = options.stream.resolve();

        if !options.no_cache {
            let cached = self.cache.lock().get(&stream).cloned();
            if let Some(slot) = cached {
                if slot.type_id != TypeId::of::<S>() {
                    return Err(RuntimeError::NotACoreObject(format!(
                        "stream {} is already open as a different object type",
                        stream
                    )));
                }
                let object = slot
                    .object
                    .clone()
                    .downcast::<LogObject<S>>()
                    .map_err(|_| {
                        RuntimeError::NotACoreObject(format!(
                            "cached instance for stream {} is not a log object",
                            stream
                        ))
                    })?;
                object.catch_up().await?;
                return Ok(object);
            }
        }

        let object = Arc::new(LogObject::<S>::new(
            self.log.clone(),
            stream,
            options.tx_log,
        ));
        object.catch_up().await?;
        debug!(%stream, fresh = options.no_cache, "opened object");

        if !options.no_cache {
            self.cache.lock().insert(
                stream,
                CacheSlot {
                    type_id: TypeId::of::<S>(),
                    object: object.clone(),
                },
            );
        }
        Ok(object)
    }

    /// A fresh transaction context bound to this runtime's log.
    pub fn tx_context(&self) -> TxContext {
        TxContext::new(self.log.clone(), self.audit_stream)
    }

    /// Copy an object into a brand-new stream.
    ///
    /// The source's current state is exported as a rebuild sequence and
    /// replayed into the target stream; afterwards the two objects are
    /// fully independent. The target stream must have no history.
    pub async fn copy<S: StateMachine>(
        &self,
        source: &Arc<LogObject<S>>,
        target: impl Into<StreamSpec>,
    ) -> Result<Arc<LogObject<S>>> {
        let target_id = target.into().resolve();
        let (_, target_tail) = self.log.bounds(&target_id);
        if target_tail > Position::ZERO {
            return Err(RuntimeError::CopyTargetNotEmpty(target_id));
        }

        let (ops, at) = source.export_snapshot().await?;
        let object = Arc::new(LogObject::<S>::new(
            self.log.clone(),
            target_id,
            source.tx_log_enabled(),
        ));
        object.replay_ops(ops).await?;
        debug!(source = %source.stream(), target = %target_id, %at, "copied object");

        self.cache.lock().insert(
            target_id,
            CacheSlot {
                type_id: TypeId::of::<S>(),
                object: object.clone(),
            },
        );
        Ok(object)
    }
}
