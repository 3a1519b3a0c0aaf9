//! QueueStore trait: the abstract interface for deferred queue persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use namereg_core::{QueuedTransaction, Txid};

use crate::error::Result;

/// Result of queueing a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// The entry was new.
    Queued,
    /// An entry with this txid is already queued (idempotent - not an error).
    AlreadyQueued,
}

/// Persistence for the deferred transaction queue.
///
/// Calls are synchronous and short. Implementations must make a successful
/// `put` durable before returning.
pub trait QueueStore: Send + Sync {
    /// Queue an entry. An existing entry with the same txid is left untouched.
    fn put(&self, entry: &QueuedTransaction) -> Result<PutResult>;

    fn get(&self, txid: &Txid) -> Result<Option<QueuedTransaction>>;

    /// Remove an entry, returning it if it was queued and still decodes.
    fn remove(&self, txid: &Txid) -> Result<Option<QueuedTransaction>>;

    /// All queued entries, ordered by txid.
    fn list(&self) -> Result<BTreeMap<Txid, QueuedTransaction>>;

    fn contains(&self, txid: &Txid) -> Result<bool> {
        Ok(self.get(txid)?.is_some())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }
}

impl<T: QueueStore + ?Sized> QueueStore for Arc<T> {
    fn put(&self, entry: &QueuedTransaction) -> Result<PutResult> {
        (**self).put(entry)
    }

    fn get(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        (**self).get(txid)
    }

    fn remove(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        (**self).remove(txid)
    }

    fn list(&self) -> Result<BTreeMap<Txid, QueuedTransaction>> {
        (**self).list()
    }

    fn contains(&self, txid: &Txid) -> Result<bool> {
        (**self).contains(txid)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}
