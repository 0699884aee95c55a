//! Shared helpers for runtime integration tests
#![allow(dead_code)]

use braid_common::{Operation, OperationType};
use braid_log::SharedLog;
use braid_runtime::{LogObject, OpenOptions, Runtime, StateMachine, StreamSpec, TxContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Minimal replicated key-value machine used to exercise the runtime.
#[derive(Debug, Default)]
pub struct KvMachine {
    entries: BTreeMap<String, String>,
}

impl KvMachine {
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KvOp {
    Put { key: String, value: String },
    Remove { key: String },
    Get { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvResult {
    Previous(Option<String>),
    Value(Option<String>),
}

impl Operation for KvOp {
    fn operation_type(&self) -> OperationType {
        match self {
            KvOp::Get { .. } => OperationType::Read,
            _ => OperationType::Write,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            KvOp::Put { .. } => "put",
            KvOp::Remove { .. } => "remove",
            KvOp::Get { .. } => "get",
        }
    }
}

impl StateMachine for KvMachine {
    type Operation = KvOp;
    type Response = KvResult;

    fn apply(&mut self, op: &KvOp) -> KvResult {
        match op {
            KvOp::Put { key, value } => {
                KvResult::Previous(self.entries.insert(key.clone(), value.clone()))
            }
            KvOp::Remove { key } => KvResult::Previous(self.entries.remove(key)),
            KvOp::Get { key } => KvResult::Value(self.entries.get(key).cloned()),
        }
    }

    fn read(&self, op: &KvOp) -> KvResult {
        match op {
            KvOp::Get { key } => KvResult::Value(self.entries.get(key).cloned()),
            _ => KvResult::Value(None),
        }
    }

    fn export(&self) -> Vec<KvOp> {
        self.entries
            .iter()
            .map(|(key, value)| KvOp::Put {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

pub type Kv = Arc<LogObject<KvMachine>>;

pub fn runtime() -> Runtime {
    Runtime::new(SharedLog::in_memory())
}

pub async fn open_kv(runtime: &Runtime, stream: impl Into<StreamSpec>) -> Kv {
    runtime
        .open::<KvMachine>(OpenOptions::new(stream))
        .await
        .unwrap()
}

pub async fn open_kv_uncached(runtime: &Runtime, stream: impl Into<StreamSpec>) -> Kv {
    runtime
        .open::<KvMachine>(OpenOptions::new(stream).without_cache())
        .await
        .unwrap()
}

pub async fn put(obj: &Kv, key: &str, value: &str) -> Option<String> {
    match obj
        .execute(KvOp::Put {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
        .unwrap()
    {
        KvResult::Previous(previous) => previous,
        other => panic!("unexpected put result: {:?}", other),
    }
}

pub async fn get(obj: &Kv, key: &str) -> Option<String> {
    match obj
        .execute(KvOp::Get {
            key: key.to_string(),
        })
        .await
        .unwrap()
    {
        KvResult::Value(value) => value,
        other => panic!("unexpected get result: {:?}", other),
    }
}

pub async fn put_in(tx: &mut TxContext, obj: &Kv, key: &str, value: &str) -> Option<String> {
    match tx
        .execute(
            obj,
            KvOp::Put {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
        .await
        .unwrap()
    {
        KvResult::Previous(previous) => previous,
        other => panic!("unexpected put result: {:?}", other),
    }
}

pub async fn get_in(tx: &mut TxContext, obj: &Kv, key: &str) -> Option<String> {
    match tx
        .execute(
            obj,
            KvOp::Get {
                key: key.to_string(),
            },
        )
        .await
        .unwrap()
    {
        KvResult::Value(value) => value,
        other => panic!("unexpected get result: {:?}", other),
    }
}
