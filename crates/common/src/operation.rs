//! Object operation traits and logged operation records

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Type of operation - read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// Read operation - does not modify state, never logged
    Read,
    /// Write operation - modifies state, replayed from the log
    Write,
}

/// Trait for operations executed against a replicated object.
///
/// Write operations are appended to the object's stream and replayed by
/// every opener; read operations are evaluated against local state only.
pub trait Operation:
    serde::de::DeserializeOwned + serde::Serialize + Send + Sync + Debug + Clone + PartialEq + Eq
{
    /// Get the type of this operation (read or write)
    fn operation_type(&self) -> OperationType;

    /// Name of the operation, used for the logged record
    fn name(&self) -> &'static str;

    /// Whether this operation modifies object state
    fn is_write(&self) -> bool {
        self.operation_type() == OperationType::Write
    }
}

/// One logged mutation: an operation name plus its encoded arguments.
///
/// The arguments are opaque to the log core; the owning object's state
/// machine decodes them back into its operation type during replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpRecord {
    /// Operation name
    pub name: String,
    /// Encoded operation, decoded by the owning state machine on replay
    pub args: serde_json::Value,
}

impl OpRecord {
    /// Encode an operation into a logged record.
    pub fn encode<O: Operation>(op: &O) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name: op.name().to_string(),
            args: serde_json::to_value(op)?,
        })
    }

    /// Decode the record back into an operation type.
    pub fn decode<O: Operation>(&self) -> Result<O, serde_json::Error> {
        serde_json::from_value(self.args.clone())
    }
}
