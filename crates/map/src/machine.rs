//! Map state machine
//!
//! A `BTreeMap` folded from logged put/remove/clear records. Everything
//! here must stay deterministic: iteration order, previous-value results,
//! and the export sequence all derive from the ordered map alone.

use braid_common::{Operation, OperationType};
use braid_runtime::StateMachine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Bounds a map key needs to be logged and replayed.
pub trait MapKey:
    Ord + Clone + Debug + Eq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> MapKey for T where
    T: Ord + Clone + Debug + Eq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Bounds a map value needs to be logged and replayed.
pub trait MapValue:
    Clone + Debug + Eq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> MapValue for T where
    T: Clone + Debug + Eq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Operations understood by the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapOp<K, V> {
    Put { key: K, value: V },
    Remove { key: K },
    Clear,
    Get { key: K },
    ContainsKey { key: K },
    Len,
    Keys,
}

impl<K: MapKey, V: MapValue> Operation for MapOp<K, V> {
    fn operation_type(&self) -> OperationType {
        match self {
            MapOp::Put { .. } | MapOp::Remove { .. } | MapOp::Clear => OperationType::Write,
            MapOp::Get { .. } | MapOp::ContainsKey { .. } | MapOp::Len | MapOp::Keys => {
                OperationType::Read
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MapOp::Put { .. } => "put",
            MapOp::Remove { .. } => "remove",
            MapOp::Clear => "clear",
            MapOp::Get { .. } => "get",
            MapOp::ContainsKey { .. } => "contains_key",
            MapOp::Len => "len",
            MapOp::Keys => "keys",
        }
    }
}

/// Results of map operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapResponse<K, V> {
    /// Previous value displaced by a put or remove
    Previous(Option<V>),
    /// Value answered by a get
    Value(Option<V>),
    Contains(bool),
    Len(usize),
    Keys(Vec<K>),
    Cleared,
}

/// Deterministic map state machine.
#[derive(Debug)]
pub struct MapMachine<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K, V> Default for MapMachine<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: MapKey, V: MapValue> MapMachine<K, V> {
    /// Borrow the folded entries, e.g. for state comparison in tests.
    pub fn entries(&self) -> &BTreeMap<K, V> {
        &self.entries
    }
}

impl<K: MapKey, V: MapValue> StateMachine for MapMachine<K, V> {
    type Operation = MapOp<K, V>;
    type Response = MapResponse<K, V>;

    fn apply(&mut self, op: &MapOp<K, V>) -> MapResponse<K, V> {
        match op {
            MapOp::Put { key, value } => {
                MapResponse::Previous(self.entries.insert(key.clone(), value.clone()))
            }
            MapOp::Remove { key } => MapResponse::Previous(self.entries.remove(key)),
            MapOp::Clear => {
                self.entries.clear();
                MapResponse::Cleared
            }
            other => self.read(other),
        }
    }

    fn read(&self, op: &MapOp<K, V>) -> MapResponse<K, V> {
        match op {
            MapOp::Get { key } => MapResponse::Value(self.entries.get(key).cloned()),
            MapOp::ContainsKey { key } => MapResponse::Contains(self.entries.contains_key(key)),
            MapOp::Len => MapResponse::Len(self.entries.len()),
            MapOp::Keys => MapResponse::Keys(self.entries.keys().cloned().collect()),
            _ => MapResponse::Value(None),
        }
    }

    fn export(&self) -> Vec<MapOp<K, V>> {
        self.entries
            .iter()
            .map(|(key, value)| MapOp::Put {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}
