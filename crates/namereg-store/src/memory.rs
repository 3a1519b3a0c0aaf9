//! In-memory implementation of the QueueStore trait.
//!
//! Same semantics as SQLite, no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use namereg_core::{QueuedTransaction, Txid};

use crate::error::{Result, StoreError};
use crate::traits::{PutResult, QueueStore};

/// In-memory deferred queue.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryQueueStore {
    entries: RwLock<BTreeMap<Txid, QueuedTransaction>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Txid, QueuedTransaction>>> {
        self.entries
            .read()
            .map_err(|_| StoreError::Unavailable("queue lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Txid, QueuedTransaction>>> {
        self.entries
            .write()
            .map_err(|_| StoreError::Unavailable("queue lock poisoned".into()))
    }
}

impl QueueStore for MemoryQueueStore {
    fn put(&self, entry: &QueuedTransaction) -> Result<PutResult> {
        let mut entries = self.write()?;
        if entries.contains_key(&entry.txid) {
            return Ok(PutResult::AlreadyQueued);
        }
        entries.insert(entry.txid, entry.clone());
        Ok(PutResult::Queued)
    }

    fn get(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        Ok(self.read()?.get(txid).cloned())
    }

    fn remove(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        Ok(self.write()?.remove(txid))
    }

    fn list(&self) -> Result<BTreeMap<Txid, QueuedTransaction>> {
        Ok(self.read()?.clone())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
