//! Durable address space backed by fjall
//!
//! Same write-once contract as the in-memory backend, persisted in a fjall
//! keyspace. Entries live in one partition keyed by big-endian position so
//! range scans walk in position order; the trim point lives in a metadata
//! partition.

use crate::error::{LogError, Result};
use crate::space::AddressSpace;
use braid_common::{LogEntry, Position};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use parking_lot::Mutex;
use std::path::Path;

const TRIM_POINT_KEY: &[u8] = b"trim_point";

/// Write-once address space persisted to disk.
pub struct DurableAddressSpace {
    keyspace: Keyspace,
    slots: PartitionHandle,
    meta: PartitionHandle,
    /// Serializes the check-then-insert in `write` so the write-once
    /// guarantee holds under concurrent writers.
    write_gate: Mutex<()>,
}

impl DurableAddressSpace {
    /// Open (or create) a durable address space at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let keyspace = fjall::Config::new(path).open()?;
        let slots = keyspace.open_partition("log_slots", PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition("log_meta", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            slots,
            meta,
            write_gate: Mutex::new(()),
        })
    }

    fn slot_key(position: Position) -> Vec<u8> {
        position.0.to_be_bytes().to_vec()
    }

    fn trim_point(&self) -> Result<u64> {
        match self.meta.get(TRIM_POINT_KEY)? {
            Some(raw) => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&raw);
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }
}

impl AddressSpace for DurableAddressSpace {
    fn write(&self, entry: LogEntry) -> Result<()> {
        let _gate = self.write_gate.lock();

        let key = Self::slot_key(entry.position);
        if entry.position.0 <= self.trim_point()? || self.slots.get(&key)?.is_some() {
            return Err(LogError::PositionAlreadyWritten(entry.position));
        }

        self.slots.insert(key, serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }

    fn read(&self, position: Position) -> Result<LogEntry> {
        if position.0 <= self.trim_point()? {
            return Err(LogError::EntryTrimmed(position));
        }
        match self.slots.get(Self::slot_key(position))? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Err(LogError::EntryNotYetWritten(position)),
        }
    }

    fn trim(&self, up_to: Position) -> Result<()> {
        let _gate = self.write_gate.lock();

        let current = self.trim_point()?;
        let trim_point = current.max(up_to.0);
        self.meta
            .insert(TRIM_POINT_KEY, trim_point.to_be_bytes().to_vec())?;

        let mut trimmed = Vec::new();
        for item in self.slots.range(..=Self::slot_key(Position(trim_point))) {
            let (key, _) = item?;
            trimmed.push(key.to_vec());
        }
        for key in trimmed {
            self.slots.remove(key)?;
        }

        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let _gate = self.write_gate.lock();

        let mut keys = Vec::new();
        for item in self.slots.iter() {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        for key in keys {
            self.slots.remove(key)?;
        }
        self.meta.remove(TRIM_POINT_KEY)?;

        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }
}
