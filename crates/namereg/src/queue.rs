//! Deferred transaction queue.
//!
//! Signed transactions that must not be relayed yet wait here, keyed by
//! txid. Queueing locks every input in the wallet so coin selection leaves
//! them alone. Entries carry their maturity, and
//! [`Registrar::release_matured`] broadcasts the ones whose dependency has
//! enough confirmations.

use std::collections::BTreeMap;

use namereg_core::{
    validate_transaction_structure, AcceptVerdict, ChainError, QueuedTransaction, Transaction,
    Txid, Wallet,
};
use namereg_store::{PutResult, QueueStore, StoreError};

use crate::error::{RegistrarError, Result, Stage};
use crate::options::{EnqueueOutcome, ReleaseReport};
use crate::registrar::{now_millis, Registrar};

/// A [`QueueStore`] plus the input locking that goes with it.
pub struct DeferredQueue<Q: QueueStore> {
    store: Q,
}

impl<Q: QueueStore> DeferredQueue<Q> {
    pub fn new(store: Q) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Q {
        &self.store
    }

    /// Persist `entry`, then lock each of its inputs not already locked.
    pub fn put<W: Wallet + ?Sized>(
        &self,
        wallet: &W,
        entry: &QueuedTransaction,
    ) -> std::result::Result<PutResult, StoreError> {
        let result = self.store.put(entry)?;
        for prevout in entry.tx.prevouts() {
            if !wallet.is_locked_coin(prevout) {
                wallet.lock_coin(prevout);
            }
        }
        Ok(result)
    }

    pub fn get(&self, txid: &Txid) -> std::result::Result<Option<QueuedTransaction>, StoreError> {
        self.store.get(txid)
    }

    /// Remove an entry. Its inputs stay locked.
    pub fn remove(&self, txid: &Txid) -> std::result::Result<Option<QueuedTransaction>, StoreError> {
        self.store.remove(txid)
    }

    pub fn list(&self) -> std::result::Result<BTreeMap<Txid, QueuedTransaction>, StoreError> {
        self.store.list()
    }

    pub fn unlock_inputs<W: Wallet + ?Sized>(wallet: &W, tx: &Transaction) {
        for prevout in tx.prevouts() {
            wallet.unlock_coin(prevout);
        }
    }
}

impl<W: Wallet, Q: QueueStore> Registrar<W, Q> {
    // ─────────────────────────────────────────────────────────────────────────
    // Queue Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Broadcast a raw transaction now if the pool accepts it, else queue it.
    ///
    /// Transactions the pool rejects on consensus grounds are refused
    /// outright. Anything else, such as a reveal whose commit is immature or
    /// a transaction with missing inputs, is queued without a maturity.
    pub fn enqueue(&self, hex: &str) -> Result<EnqueueOutcome> {
        let tx = Transaction::from_hex(hex.trim())?;
        validate_transaction_structure(&tx)?;
        let txid = tx.txid();

        match self.chain.pool.test_accept(&tx) {
            AcceptVerdict::Valid => {
                self.chain
                    .broadcaster
                    .broadcast(&tx)
                    .map_err(RegistrarError::chain(Stage::Enqueue))?;
                tracing::info!(txid = %txid, "enqueued transaction is valid, broadcast");
                Ok(EnqueueOutcome::Broadcast(txid))
            }
            AcceptVerdict::Rejected {
                consensus: true,
                reason,
            } => Err(RegistrarError::InvalidTransaction { txid, reason }),
            AcceptVerdict::Rejected { reason, .. } => {
                let _state = self.lock_state()?;
                let entry = QueuedTransaction::new(tx, None, now_millis());
                match self.queue.put(&self.wallet, &entry)? {
                    PutResult::Queued => {
                        tracing::info!(txid = %txid, reason = %reason, "transaction queued")
                    }
                    PutResult::AlreadyQueued => {
                        tracing::debug!(txid = %txid, "transaction already queued")
                    }
                }
                Ok(EnqueueOutcome::Queued(txid))
            }
        }
    }

    /// Remove a queued transaction. Its inputs stay locked.
    pub fn dequeue(&self, txid: &Txid) -> Result<QueuedTransaction> {
        let _state = self.lock_state()?;
        let entry = self
            .queue
            .remove(txid)?
            .ok_or(RegistrarError::NotQueued(*txid))?;
        tracing::info!(txid = %txid, "transaction dequeued");
        Ok(entry)
    }

    /// Remove a queued transaction and unlock its inputs.
    pub fn cancel_queued(&self, txid: &Txid) -> Result<QueuedTransaction> {
        let _state = self.lock_state()?;
        let entry = self
            .queue
            .remove(txid)?
            .ok_or(RegistrarError::NotQueued(*txid))?;
        DeferredQueue::<Q>::unlock_inputs(&self.wallet, &entry.tx);
        tracing::info!(txid = %txid, "queued transaction cancelled");
        Ok(entry)
    }

    pub fn list_queued(&self) -> Result<BTreeMap<Txid, QueuedTransaction>> {
        Ok(self.queue.list()?)
    }

    /// The raw transaction hex of a queued entry.
    pub fn queued_hex(&self, txid: &Txid) -> Result<String> {
        self.queue
            .get(txid)?
            .map(|entry| entry.to_hex())
            .ok_or(RegistrarError::NotQueued(*txid))
    }

    /// Broadcast every queued entry that has matured and the pool accepts.
    ///
    /// 1. Entries already in the ledger are recorded in the wallet and removed
    /// 2. Entries whose dependency lacks confirmations keep waiting
    /// 3. Valid entries are broadcast, recorded in the wallet and removed
    /// 4. Consensus-invalid entries are removed and their inputs unlocked
    pub fn release_matured(&self) -> Result<ReleaseReport> {
        let _state = self.lock_state()?;
        let mut report = ReleaseReport::default();

        for (txid, entry) in self.queue.list()? {
            let names = &self.chain.names;
            if names
                .confirmations(&txid)
                .map_err(RegistrarError::chain(Stage::Release))?
                .is_some()
            {
                // relayed elsewhere; its inputs are spent, so the wallet must
                // know before they are unlocked
                let mut seen = report.released.clone();
                seen.push(txid);
                self.wallet.commit_transaction(&entry.tx).map_err(|e| {
                    RegistrarError::wallet(Stage::Release)(e).after_side_effect(Stage::Release, None, seen)
                })?;
                self.queue.remove(&txid)?;
                DeferredQueue::<Q>::unlock_inputs(&self.wallet, &entry.tx);
                tracing::info!(txid = %txid, "queued transaction confirmed elsewhere");
                report.confirmed.push(txid);
                continue;
            }

            if let Some(maturity) = &entry.maturity {
                let confirmations = names
                    .confirmations(&maturity.depends_on)
                    .map_err(RegistrarError::chain(Stage::Release))?;
                if !maturity.is_satisfied(confirmations) {
                    report.waiting.push(txid);
                    continue;
                }
            }

            match self.chain.pool.test_accept(&entry.tx) {
                AcceptVerdict::Valid => {}
                AcceptVerdict::Rejected {
                    consensus: true,
                    reason,
                } => {
                    tracing::warn!(txid = %txid, reason = %reason, "dropping invalid queued transaction");
                    self.queue.remove(&txid)?;
                    DeferredQueue::<Q>::unlock_inputs(&self.wallet, &entry.tx);
                    report.dropped.push((txid, reason));
                    continue;
                }
                AcceptVerdict::Rejected { reason, .. } => {
                    tracing::debug!(txid = %txid, reason = %reason, "queued transaction not yet acceptable");
                    report.waiting.push(txid);
                    continue;
                }
            }

            match self.chain.broadcaster.broadcast(&entry.tx) {
                Ok(()) => {}
                Err(ChainError::Rejected(reason)) => {
                    tracing::warn!(txid = %txid, reason = %reason, "relay refused queued transaction");
                    report.waiting.push(txid);
                    continue;
                }
                Err(e) => return Err(RegistrarError::chain(Stage::Release)(e)),
            }

            let mut sent = report.released.clone();
            sent.push(txid);
            self.queue
                .remove(&txid)
                .map_err(|e| RegistrarError::from(e).after_side_effect(Stage::Release, None, sent.clone()))?;
            self.wallet.commit_transaction(&entry.tx).map_err(|e| {
                RegistrarError::wallet(Stage::Release)(e).after_side_effect(Stage::Release, None, sent)
            })?;
            DeferredQueue::<Q>::unlock_inputs(&self.wallet, &entry.tx);
            tracing::info!(txid = %txid, "queued transaction released");
            report.released.push(txid);
        }

        Ok(report)
    }
}
