//! Shared log server surface for braid
//!
//! This crate provides the two truly shared resources everything else is
//! built on:
//! - A write-once address space mapping positions to entries, with an
//!   in-memory backend and an optional fjall-backed durable backend
//! - A linearizable sequencer issuing globally unique, strictly increasing
//!   positions, atomically covering multi-stream reservations
//!
//! The [`SharedLog`] facade combines both behind the abstract
//! `next`/`write`/`read`/`tail` surface the client runtime consumes. How
//! these calls would be carried over a network is a transport concern; this
//! in-process handle stands in for it.

mod config;
mod durable;
mod error;
mod sequencer;
mod shared;
mod space;

pub use config::RetryConfig;
pub use durable::DurableAddressSpace;
pub use error::{LogError, Result};
pub use sequencer::Sequencer;
pub use shared::SharedLog;
pub use space::{AddressSpace, MemoryAddressSpace};
