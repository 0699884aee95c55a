//! Write-once address space
//!
//! The address space maps global positions to immutable entries. A filled
//! slot is never rewritten or deleted; the second writer to any position
//! loses, which is how the sequencer's uniqueness guarantee is enforced
//! end-to-end even under races.

use crate::error::{LogError, Result};
use braid_common::{LogEntry, Position};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage backend contract for the write-once address space.
///
/// Implementations must be safe under concurrent calls from unrelated
/// callers. Reads are atomic per position: a read never observes a partial
/// payload.
pub trait AddressSpace: Send + Sync + 'static {
    /// Store an entry at its position. Fails with
    /// [`LogError::PositionAlreadyWritten`] if the slot is filled; the
    /// existing entry is never overwritten.
    fn write(&self, entry: LogEntry) -> Result<()>;

    /// Read the entry at a position. Fails with
    /// [`LogError::EntryNotYetWritten`] for an empty slot and
    /// [`LogError::EntryTrimmed`] below the trim point.
    fn read(&self, position: Position) -> Result<LogEntry>;

    /// Administrative trim: drop every slot at or below `up_to`. Never
    /// called from the replay or commit paths.
    fn trim(&self, up_to: Position) -> Result<()>;

    /// Administrative wipe of all state. Idempotent; test/bootstrap only.
    fn reset(&self) -> Result<()>;
}

struct MemoryInner {
    slots: HashMap<u64, LogEntry>,
    trim_point: u64,
}

/// In-memory address space backend.
pub struct MemoryAddressSpace {
    inner: RwLock<MemoryInner>,
}

impl MemoryAddressSpace {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                slots: HashMap::new(),
                trim_point: 0,
            }),
        }
    }

    /// Number of filled slots, for diagnostics.
    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().slots.is_empty()
    }
}

impl Default for MemoryAddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace for MemoryAddressSpace {
    fn write(&self, entry: LogEntry) -> Result<()> {
        let mut inner = self.inner.write();
        let raw = entry.position.0;
        if raw <= inner.trim_point || inner.slots.contains_key(&raw) {
            return Err(LogError::PositionAlreadyWritten(entry.position));
        }
        inner.slots.insert(raw, entry);
        Ok(())
    }

    fn read(&self, position: Position) -> Result<LogEntry> {
        let inner = self.inner.read();
        if position.0 <= inner.trim_point {
            return Err(LogError::EntryTrimmed(position));
        }
        inner
            .slots
            .get(&position.0)
            .cloned()
            .ok_or(LogError::EntryNotYetWritten(position))
    }

    fn trim(&self, up_to: Position) -> Result<()> {
        let mut inner = self.inner.write();
        if up_to.0 > inner.trim_point {
            inner.trim_point = up_to.0;
        }
        let trim_point = inner.trim_point;
        inner.slots.retain(|raw, _| *raw > trim_point);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.slots.clear();
        inner.trim_point = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_common::{OpRecord, StreamId};

    fn entry_at(position: u64) -> LogEntry {
        LogEntry::mutation(
            Position(position),
            StreamId::new(),
            OpRecord {
                name: "put".to_string(),
                args: serde_json::Value::Null,
            },
        )
    }

    #[test]
    fn test_write_once() {
        let space = MemoryAddressSpace::new();
        space.write(entry_at(1)).unwrap();

        let err = space.write(entry_at(1)).unwrap_err();
        assert!(matches!(err, LogError::PositionAlreadyWritten(Position(1))));

        // The original entry survives the losing write.
        assert_eq!(space.read(Position(1)).unwrap().position, Position(1));
    }

    #[test]
    fn test_read_unwritten() {
        let space = MemoryAddressSpace::new();
        let err = space.read(Position(5)).unwrap_err();
        assert!(matches!(err, LogError::EntryNotYetWritten(Position(5))));
    }

    #[test]
    fn test_trim() {
        let space = MemoryAddressSpace::new();
        for position in 1..=4 {
            space.write(entry_at(position)).unwrap();
        }
        space.trim(Position(2)).unwrap();

        assert!(matches!(
            space.read(Position(1)),
            Err(LogError::EntryTrimmed(_))
        ));
        assert!(matches!(
            space.read(Position(2)),
            Err(LogError::EntryTrimmed(_))
        ));
        assert!(space.read(Position(3)).is_ok());

        // Writes below the trim point stay rejected.
        assert!(matches!(
            space.write(entry_at(1)),
            Err(LogError::PositionAlreadyWritten(_))
        ));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let space = MemoryAddressSpace::new();
        space.write(entry_at(1)).unwrap();
        space.reset().unwrap();
        space.reset().unwrap();
        assert!(space.is_empty());
        // A fresh write at position 1 succeeds after reset.
        space.write(entry_at(1)).unwrap();
    }

    #[test]
    fn test_concurrent_writers_single_winner() {
        use std::sync::Arc;

        let space = Arc::new(MemoryAddressSpace::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let space = space.clone();
            handles.push(std::thread::spawn(move || {
                space.write(entry_at(1)).is_ok()
            }));
        }

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
    }
}
