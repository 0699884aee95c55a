//! State machine contract for replicated objects
//!
//! An object type plugs into the runtime by implementing [`StateMachine`]:
//! a deterministic fold from logged write operations to in-memory state.
//! The runtime handles everything else - appending, replay, snapshots for
//! transactions - through this interface.

use braid_common::Operation;
use std::fmt::Debug;

/// Deterministic fold from operation records to object state.
///
/// Determinism is the load-bearing requirement: applying the same ordered
/// sequence of write operations from the default state must yield the same
/// resulting state on every client. Anything nondeterministic (clocks,
/// randomness, iteration over unordered collections feeding into state)
/// breaks convergence between openers.
pub trait StateMachine: Default + Send + Sync + 'static {
    /// The operation set of this object type. Write operations are logged
    /// and replayed; read operations only ever touch local state.
    type Operation: Operation + 'static;

    /// What executing one operation returns to the caller.
    type Response: Send + Debug + 'static;

    /// Fold one write operation into state, returning the caller-visible
    /// result (e.g. the previous value for a map put).
    fn apply(&mut self, op: &Self::Operation) -> Self::Response;

    /// Evaluate one read operation against current state.
    fn read(&self, op: &Self::Operation) -> Self::Response;

    /// Re-encode current state as a fresh sequence of write operations
    /// that rebuilds it from default. Drives object copy.
    fn export(&self) -> Vec<Self::Operation>;
}
