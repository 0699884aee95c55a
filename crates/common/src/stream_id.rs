//! Stream identifiers
//!
//! A stream is a logical sub-sequence of the shared log: an entry belongs to
//! a stream when its stream set contains the stream's id. Streams do not own
//! entries; they are a filter over the totally ordered log.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for name-derived stream ids, so the same name always resolves
/// to the same stream on every client.
const STREAM_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x72, 0x61, 0x69, 0x64, 0x2d, 0x73, 0x74, 0x72, 0x65, 0x61, 0x6d, 0x2d, 0x30, 0x30,
    0x31,
]);

/// Opaque identity of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(Uuid);

impl StreamId {
    /// Generate a fresh random stream id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derive the stream id for a human-readable stream name.
    ///
    /// Deterministic: every client resolves the same name to the same id.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&STREAM_NAMESPACE, name.as_bytes()))
    }

    /// Derive a companion stream id from this one, e.g. for an audit stream.
    pub fn derived(&self, tag: &str) -> Self {
        Self(Uuid::new_v5(&self.0, tag.as_bytes()))
    }

    /// Create from an existing UUID (for deserialization/testing).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
