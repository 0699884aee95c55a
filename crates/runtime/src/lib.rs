//! Client runtime for the braid shared log
//!
//! This crate turns the raw shared log into replicated objects and
//! optimistic transactions:
//!
//! - [`StreamView`] - a per-object cursor over one stream of the log
//! - [`StateMachine`] - the deterministic fold an object type implements
//! - [`LogObject`] - a materialized object: stream view plus folded state
//! - [`Runtime`] - object open/copy with options and instance caching
//! - [`TxContext`] - the explicit per-caller transaction handle
//!
//! Objects are opened against a [`Runtime`]; mutators append to the log
//! before touching local state, accessors catch up before answering, and
//! transactions buffer writes until a single atomic multi-stream commit
//! validated against the intervening log range.

mod error;
mod machine;
mod object;
mod runtime;
mod tx;
mod view;

pub use error::{Result, RuntimeError};
pub use machine::StateMachine;
pub use object::LogObject;
pub use runtime::{OpenOptions, Runtime, StreamSpec, TX_AUDIT_STREAM_NAME};
pub use tx::{CommitSink, TxContext, TxState};
pub use view::StreamView;
