//! Test fixtures and helpers.
//!
//! Common setup code for registrar integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use namereg_core::{Amount, QueuedTransaction, Txid, COIN};
use namereg_store::{MemoryQueueStore, PutResult, QueueStore, Result, StoreError};

use crate::chain::TestChain;
use crate::wallet::TestWallet;

/// A chain and a wallet funded on it.
pub struct TestFixture {
    pub chain: TestChain,
    pub wallet: TestWallet,
}

impl TestFixture {
    /// A wallet holding ten coins split over five outputs.
    pub fn new() -> Self {
        Self::funded(&[2 * COIN; 5])
    }

    /// A wallet holding one coin per entry of `amounts`.
    pub fn funded(amounts: &[Amount]) -> Self {
        let chain = TestChain::new();
        let wallet = TestWallet::new(chain.clone());
        for amount in amounts {
            wallet.fund(*amount);
        }
        Self { chain, wallet }
    }

    /// Same chain, a second wallet with its own keys.
    pub fn other_wallet(&self, id: u8) -> TestWallet {
        let wallet = TestWallet::with_keypool(self.chain.clone(), id, crate::wallet::KEYPOOL_SIZE);
        wallet.fund(2 * COIN);
        wallet
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A memory queue whose writes can be made to fail.
#[derive(Default)]
pub struct FailingQueueStore {
    inner: MemoryQueueStore,
    fail_puts: AtomicBool,
    fail_removes: AtomicBool,
}

impl FailingQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

impl QueueStore for FailingQueueStore {
    fn put(&self, entry: &QueuedTransaction) -> Result<PutResult> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".into()));
        }
        self.inner.put(entry)
    }

    fn get(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        self.inner.get(txid)
    }

    fn remove(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".into()));
        }
        self.inner.remove(txid)
    }

    fn list(&self) -> Result<BTreeMap<Txid, QueuedTransaction>> {
        self.inner.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namereg_core::{OutPoint, Script, Transaction, TxIn, TxOut, Wallet};

    #[test]
    fn test_fixture_is_funded() {
        let fixture = TestFixture::new();
        assert_eq!(fixture.wallet.balance(), 10 * COIN);
        assert!(fixture.wallet.ensure_unlocked().is_ok());
    }

    #[test]
    fn test_failing_store_toggles() {
        let store = FailingQueueStore::new();
        let tx = Transaction::new(
            vec![TxIn::new(OutPoint::new(Txid::ZERO, 0))],
            vec![TxOut::new(1, Script::from_bytes(vec![1u8; 33]))],
        );
        let entry = QueuedTransaction::new(tx, None, 0);

        store.fail_puts(true);
        assert!(store.put(&entry).is_err());
        store.fail_puts(false);
        assert_eq!(store.put(&entry).unwrap(), PutResult::Queued);

        store.fail_removes(true);
        assert!(store.remove(&entry.txid).is_err());
        assert!(store.contains(&entry.txid).unwrap());
    }
}
