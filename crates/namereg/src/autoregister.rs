//! One-call registration.
//!
//! Commits are broadcast immediately. The matching reveals are signed right
//! away and parked in the deferred queue until their commit has
//! `reveal_maturity_depth` confirmations.
//!
//! With delegation, a second name is registered next to the primary: `d/x`
//! gets `dd/x` (or the first free variant of it), `id/x` gets `idd/x`. The
//! primary's value points at the delegate and the delegate holds the
//! caller's value.

use namereg_core::{
    delegation_value, synthesize_delegate_name, validate_name, validate_value, Coin, Maturity,
    Name, NameOp, QueuedTransaction, TxOut, Txid, Value, Wallet,
};
use namereg_store::QueueStore;

use crate::error::{RegistrarError, Result, Stage};
use crate::options::{AutoRegisterOptions, AutoRegistration, CommitOutcome, WriteOptions};
use crate::registrar::{now_millis, settle, Registrar, WalletState};

impl<W: Wallet, Q: QueueStore> Registrar<W, Q> {
    /// Commit `name` and queue its reveal with `value`.
    ///
    /// Once the first commit is out, any later failure is reported as
    /// `Inconsistent` listing the transactions already sent.
    pub fn auto_register(
        &self,
        name: &Name,
        value: &Value,
        options: &AutoRegisterOptions,
    ) -> Result<AutoRegistration> {
        let stage = Stage::AutoRegister;
        validate_name(name, self.config.max_name_length)?;
        validate_value(value, self.config.max_value_length)?;
        if !options.allow_existing && self.active_record(name, stage)?.is_some() {
            return Err(RegistrarError::NameExists(name.clone()));
        }

        let delegate = if options.delegate {
            let delegate = synthesize_delegate_name(
                name,
                self.config.max_name_length,
                &mut rand::thread_rng(),
                |candidate| Ok::<_, RegistrarError>(self.active_record(candidate, stage)?.is_some()),
            )?;
            Some(delegate)
        } else {
            None
        };

        self.wallet.block_until_synced();
        let mut state = self.lock_state()?;

        let (primary, primary_coin) = self.issue_commit(&mut state, stage, name, &options.write)?;
        let mut sent = vec![primary.txid];

        let result = self.finish_auto_register(
            &mut state,
            name,
            value,
            delegate.as_ref(),
            &options.write,
            &primary,
            primary_coin,
            &mut sent,
        );
        let queued =
            result.map_err(|e| e.after_side_effect(stage, Some(name), sent.clone()))?;

        tracing::info!(
            name = %name,
            delegate = ?delegate,
            commit = %primary.txid,
            queued = queued.len(),
            "auto-registration queued"
        );
        Ok(AutoRegistration {
            commit: primary,
            queued,
            delegate,
        })
    }

    /// Everything after the primary commit. `sent` collects what went out.
    #[allow(clippy::too_many_arguments)]
    fn finish_auto_register(
        &self,
        state: &mut WalletState,
        name: &Name,
        value: &Value,
        delegate: Option<&Name>,
        write: &WriteOptions,
        primary: &CommitOutcome,
        primary_coin: Coin,
        sent: &mut Vec<Txid>,
    ) -> Result<Vec<Txid>> {
        let Some(delegate) = delegate else {
            let reveal = self.queue_reveal(name, value, primary, primary_coin, write)?;
            return Ok(vec![reveal]);
        };

        // extra payments go out with the primary commit only
        let delegate_write = WriteOptions {
            dest_address: write.dest_address.clone(),
            send_coins: Vec::new(),
        };
        let (second, second_coin) =
            self.issue_commit(state, Stage::AutoRegister, delegate, &delegate_write)?;
        sent.push(second.txid);

        let pointer = delegation_value(delegate)?;
        let first = self.queue_reveal(name, &pointer, primary, primary_coin, &delegate_write)?;
        let second = self.queue_reveal(delegate, value, &second, second_coin, &delegate_write)?;
        Ok(vec![first, second])
    }

    /// Sign a reveal of `commit` and queue it until the commit matures.
    fn queue_reveal(
        &self,
        name: &Name,
        value: &Value,
        commit: &CommitOutcome,
        commit_coin: Coin,
        write: &WriteOptions,
    ) -> Result<Txid> {
        let stage = Stage::AutoRegister;
        self.wallet
            .ensure_unlocked()
            .map_err(RegistrarError::wallet(stage))?;

        let mut destination = self.destination(stage, write)?;
        let script = destination
            .script()
            .map_err(RegistrarError::wallet(stage))?;
        let name_out = TxOut::with_name_op(
            self.config.name_locked_amount,
            script,
            NameOp::FirstUpdate {
                name: name.clone(),
                value: value.clone(),
                salt: commit.salt.clone(),
            },
        );

        let queued = self
            .wallet
            .create_transaction(&[name_out], Some(&commit_coin))
            .map_err(RegistrarError::wallet(stage))
            .and_then(|tx| {
                let maturity = Maturity::new(commit.txid, self.config.reveal_maturity_depth);
                let entry = QueuedTransaction::new(tx, Some(maturity), now_millis());
                self.queue.put(&self.wallet, &entry)?;
                Ok(entry.txid)
            });
        let txid = settle(destination, queued)?;

        tracing::info!(name = %name, commit = %commit.txid, txid = %txid, "reveal queued");
        Ok(txid)
    }
}
