//! The Registrar: unified API for name registration.
//!
//! The registrar drives a [`Wallet`] and the chain collaborators through the
//! commit, reveal and update pipelines, and owns the deferred queue. Every
//! pipeline that reserves keys, signs or writes the queue runs under the
//! wallet lock. Ledger and pool reads happen before it is taken.

use std::sync::{Arc, Mutex, MutexGuard};

use namereg_core::{
    Broadcaster, Coin, Name, NameIndex, NameRecord, PendingPool, Transaction, TxOut, Wallet,
};
use namereg_store::QueueStore;

use crate::config::RegistrarConfig;
use crate::destination::DestinationResolver;
use crate::error::{RegistrarError, Result, Stage};
use crate::index::CommitmentIndex;
use crate::options::WriteOptions;
use crate::queue::DeferredQueue;

/// The ledger, pending pool and relay the registrar talks to.
#[derive(Clone)]
pub struct ChainBackends {
    pub names: Arc<dyn NameIndex>,
    pub pool: Arc<dyn PendingPool>,
    pub broadcaster: Arc<dyn Broadcaster>,
}

impl ChainBackends {
    pub fn new(
        names: Arc<dyn NameIndex>,
        pool: Arc<dyn PendingPool>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            names,
            pool,
            broadcaster,
        }
    }

    /// One backend serving all three roles.
    pub fn shared<T>(backend: T) -> Self
    where
        T: NameIndex + PendingPool + Broadcaster + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            names: backend.clone(),
            pool: backend.clone(),
            broadcaster: backend,
        }
    }
}

/// State guarded by the wallet lock.
#[derive(Debug, Default)]
pub(crate) struct WalletState {
    pub(crate) index: CommitmentIndex,
}

/// The main Registrar struct.
///
/// Provides a unified API for:
/// - Committing to and revealing names
/// - Updating names, following pending chains
/// - Auto-registration with delegate names
/// - Queueing transactions until they may be broadcast
pub struct Registrar<W: Wallet, Q: QueueStore> {
    pub(crate) wallet: W,
    pub(crate) state: Mutex<WalletState>,
    pub(crate) queue: DeferredQueue<Q>,
    pub(crate) chain: ChainBackends,
    pub(crate) config: RegistrarConfig,
}

impl<W: Wallet, Q: QueueStore> Registrar<W, Q> {
    /// Create a registrar. Fails if `config` does not validate.
    pub fn new(wallet: W, store: Q, chain: ChainBackends, config: RegistrarConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            wallet,
            state: Mutex::new(WalletState::default()),
            queue: DeferredQueue::new(store),
            chain,
            config,
        })
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn queue(&self) -> &DeferredQueue<Q> {
        &self.queue
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared pipeline steps
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn lock_state(&self) -> Result<MutexGuard<'_, WalletState>> {
        self.state.lock().map_err(|_| RegistrarError::LockPoisoned)
    }

    /// The ledger record of `name`, if it exists and has not expired.
    pub(crate) fn active_record(&self, name: &Name, stage: Stage) -> Result<Option<NameRecord>> {
        let record = self
            .chain
            .names
            .get_name(name)
            .map_err(RegistrarError::chain(stage))?;
        let tip = self.chain.names.active_height();
        Ok(record.filter(|r| !r.is_expired(tip)))
    }

    pub(crate) fn destination(
        &self,
        stage: Stage,
        write: &WriteOptions,
    ) -> Result<DestinationResolver<'_, W>> {
        DestinationResolver::new(&self.wallet, write.dest_address.as_deref())
            .map_err(RegistrarError::wallet(stage))
    }

    /// The name output followed by the `send_coins` payments.
    pub(crate) fn recipients(&self, name_out: TxOut, write: &WriteOptions) -> Result<Vec<TxOut>> {
        let mut recipients = Vec::with_capacity(1 + write.send_coins.len());
        recipients.push(name_out);
        for (address, amount) in &write.send_coins {
            let script = self
                .wallet
                .decode_address(address)
                .map_err(|_| RegistrarError::InvalidAddress(address.clone()))?;
            if *amount == 0 {
                return Err(RegistrarError::InvalidAmount);
            }
            recipients.push(TxOut::new(*amount, script));
        }
        Ok(recipients)
    }

    /// Fund, sign, broadcast, then record in the wallet.
    ///
    /// A wallet failure after the broadcast is reported as `Inconsistent`.
    pub(crate) fn send(
        &self,
        stage: Stage,
        name: Option<&Name>,
        recipients: &[TxOut],
        spend: Option<&Coin>,
    ) -> Result<Transaction> {
        let tx = self
            .wallet
            .create_transaction(recipients, spend)
            .map_err(RegistrarError::wallet(stage))?;
        self.chain
            .broadcaster
            .broadcast(&tx)
            .map_err(RegistrarError::chain(stage))?;

        let txid = tx.txid();
        self.wallet.commit_transaction(&tx).map_err(|e| {
            RegistrarError::wallet(stage)(e).after_side_effect(stage, name, vec![txid])
        })?;
        tracing::debug!(stage = %stage, txid = %txid, "transaction sent");
        Ok(tx)
    }
}

/// Keep the destination if the transaction paying it left the process.
pub(crate) fn settle<T, W: Wallet + ?Sized>(
    destination: DestinationResolver<'_, W>,
    result: Result<T>,
) -> Result<T> {
    match &result {
        Ok(_) | Err(RegistrarError::Inconsistent { .. }) => destination.commit(),
        Err(_) => drop(destination),
    }
    result
}

/// Current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
