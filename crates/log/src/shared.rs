//! Shared log facade
//!
//! Combines the sequencer and an address-space backend behind the abstract
//! `next`/`write`/`read`/`tail` surface the client runtime consumes. In a
//! deployed system these calls would travel over a transport to log
//! servers; this in-process handle stands where that transport would.

use crate::config::RetryConfig;
use crate::error::{LogError, Result};
use crate::sequencer::Sequencer;
use crate::space::{AddressSpace, MemoryAddressSpace};
use braid_common::{LogEntry, Position, StreamId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Handle to the shared log: one sequencer plus one write-once address
/// space. Cheap to share; all methods take `&self`.
pub struct SharedLog {
    sequencer: Sequencer,
    space: Box<dyn AddressSpace>,
    retry: RetryConfig,
}

impl SharedLog {
    /// An in-memory log with default retry policy.
    pub fn in_memory() -> Arc<Self> {
        Self::with_backend(MemoryAddressSpace::new(), RetryConfig::default())
    }

    /// A log over an arbitrary address-space backend.
    pub fn with_backend(space: impl AddressSpace, retry: RetryConfig) -> Arc<Self> {
        Arc::new(Self {
            sequencer: Sequencer::new(),
            space: Box::new(space),
            retry,
        })
    }

    /// Reserve the next position for an entry tagged with `streams`.
    pub fn next(&self, streams: &BTreeSet<StreamId>) -> Position {
        let position = self.sequencer.next(streams);
        trace!(%position, streams = streams.len(), "reserved position");
        position
    }

    /// Reserve the next position for a single-stream entry.
    pub fn next_for(&self, stream: StreamId) -> Position {
        let position = self.sequencer.next_for(stream);
        trace!(%position, %stream, "reserved position");
        position
    }

    /// The highest position issued so far.
    pub fn tail(&self) -> Position {
        self.sequencer.tail()
    }

    /// Atomically observe `(tail, stream_tail)` for one stream.
    pub fn bounds(&self, stream: &StreamId) -> (Position, Position) {
        self.sequencer.bounds(stream)
    }

    /// Store an entry at its reserved position. Write-once.
    pub fn write(&self, entry: LogEntry) -> Result<()> {
        trace!(position = %entry.position, "write entry");
        self.space.write(entry)
    }

    /// Read the entry at a position without waiting.
    pub fn read(&self, position: Position) -> Result<LogEntry> {
        self.space.read(position)
    }

    /// Read the entry at a position, polling with bounded backoff while the
    /// slot is reserved but not yet written.
    ///
    /// Surfaces [`LogError::WaitTimeout`] once the attempt budget runs out
    /// rather than blocking indefinitely.
    pub async fn read_waiting(&self, position: Position) -> Result<LogEntry> {
        for attempt in 0..self.retry.max_attempts {
            match self.space.read(position) {
                Ok(entry) => return Ok(entry),
                Err(LogError::EntryNotYetWritten(_)) => {
                    if attempt + 1 == self.retry.max_attempts {
                        break;
                    }
                    tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                }
                Err(other) => return Err(other),
            }
        }
        warn!(%position, "gave up waiting for in-flight slot");
        Err(LogError::WaitTimeout(position))
    }

    /// Administrative trim of every slot at or below `up_to`.
    pub fn trim(&self, up_to: Position) -> Result<()> {
        debug!(%up_to, "trim address space");
        self.space.trim(up_to)
    }

    /// Administrative wipe of all log state. Idempotent; used by
    /// test/bootstrap harnesses, never by the runtime.
    pub fn reset(&self) -> Result<()> {
        debug!("reset log state");
        self.space.reset()?;
        self.sequencer.reset();
        Ok(())
    }

    /// The retry policy this handle polls with.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }
}
