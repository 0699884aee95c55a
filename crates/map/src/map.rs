//! Typed map client
//!
//! `SharedMap` wraps the materialized map object with map-shaped calls,
//! both direct and through a transaction context.

use crate::machine::{MapKey, MapMachine, MapOp, MapResponse, MapValue};
use braid_common::StreamId;
use braid_runtime::{LogObject, OpenOptions, Runtime, RuntimeError, StreamSpec, TxContext};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Map-specific error type
#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("unexpected response type")]
    UnexpectedResponse,
}

/// Result type for map operations
pub type Result<T> = std::result::Result<T, MapError>;

/// A replicated map bound to one stream of the shared log.
///
/// Cloning is cheap and shares the underlying materializer.
#[derive(Clone)]
pub struct SharedMap<K: MapKey, V: MapValue> {
    object: Arc<LogObject<MapMachine<K, V>>>,
}

impl<K: MapKey, V: MapValue> SharedMap<K, V> {
    /// Open a map with the given options, replaying existing history.
    pub async fn open(runtime: &Runtime, options: OpenOptions) -> Result<Self> {
        let object = runtime.open::<MapMachine<K, V>>(options).await?;
        Ok(Self { object })
    }

    /// Wrap an already-opened map object.
    pub fn from_object(object: Arc<LogObject<MapMachine<K, V>>>) -> Self {
        Self { object }
    }

    /// The stream this map folds.
    pub fn stream(&self) -> StreamId {
        self.object.stream()
    }

    /// The underlying materialized object.
    pub fn object(&self) -> &Arc<LogObject<MapMachine<K, V>>> {
        &self.object
    }

    /// Copy this map's current state into a brand-new, independent stream.
    pub async fn copy_as(
        &self,
        runtime: &Runtime,
        target: impl Into<StreamSpec>,
    ) -> Result<SharedMap<K, V>> {
        let object = runtime.copy(&self.object, target).await?;
        Ok(Self { object })
    }

    /// Insert a key-value pair, returning the value it displaced.
    pub async fn put(&self, key: K, value: V) -> Result<Option<V>> {
        match self.object.execute(MapOp::Put { key, value }).await? {
            MapResponse::Previous(previous) => Ok(previous),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    /// Get the value for a key.
    pub async fn get(&self, key: K) -> Result<Option<V>> {
        match self.object.execute(MapOp::Get { key }).await? {
            MapResponse::Value(value) => Ok(value),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    /// Remove a key, returning the value it held.
    pub async fn remove(&self, key: K) -> Result<Option<V>> {
        match self.object.execute(MapOp::Remove { key }).await? {
            MapResponse::Previous(previous) => Ok(previous),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    pub async fn contains_key(&self, key: K) -> Result<bool> {
        match self.object.execute(MapOp::ContainsKey { key }).await? {
            MapResponse::Contains(contains) => Ok(contains),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    pub async fn len(&self) -> Result<usize> {
        match self.object.execute(MapOp::Len).await? {
            MapResponse::Len(len) => Ok(len),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn keys(&self) -> Result<Vec<K>> {
        match self.object.execute(MapOp::Keys).await? {
            MapResponse::Keys(keys) => Ok(keys),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    pub async fn clear(&self) -> Result<()> {
        match self.object.execute(MapOp::Clear).await? {
            MapResponse::Cleared => Ok(()),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    /// Transactional put: buffered in the context, not logged until commit.
    pub async fn put_in(&self, tx: &mut TxContext, key: K, value: V) -> Result<Option<V>> {
        match tx.execute(&self.object, MapOp::Put { key, value }).await? {
            MapResponse::Previous(previous) => Ok(previous),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    /// Transactional get: answered from the context's snapshot view plus
    /// its own buffered writes.
    pub async fn get_in(&self, tx: &mut TxContext, key: K) -> Result<Option<V>> {
        match tx.execute(&self.object, MapOp::Get { key }).await? {
            MapResponse::Value(value) => Ok(value),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    /// Transactional remove.
    pub async fn remove_in(&self, tx: &mut TxContext, key: K) -> Result<Option<V>> {
        match tx.execute(&self.object, MapOp::Remove { key }).await? {
            MapResponse::Previous(previous) => Ok(previous),
            _ => Err(MapError::UnexpectedResponse),
        }
    }

    /// Transactional contains_key.
    pub async fn contains_key_in(&self, tx: &mut TxContext, key: K) -> Result<bool> {
        match tx.execute(&self.object, MapOp::ContainsKey { key }).await? {
            MapResponse::Contains(contains) => Ok(contains),
            _ => Err(MapError::UnexpectedResponse),
        }
    }
}

impl<K: MapKey, V: MapValue> fmt::Debug for SharedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMap")
            .field("stream", &self.stream())
            .finish_non_exhaustive()
    }
}
