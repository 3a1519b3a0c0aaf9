//! Commit and reveal.
//!
//! A commit publishes `RIPEMD160(SHA256(salt || name))` in a `New` output.
//! The salt is derived from the destination key when the wallet holds one,
//! so the reveal can find it again without any stored state. The reveal
//! spends exactly that output with a `FirstUpdate` carrying name, value and
//! salt.

use namereg_core::{
    check_reveal, derive_salt, validate_name, validate_value, Coin, Commitment, Name, NameOp,
    OutPoint, Salt, TxOut, Txid, Wallet,
};
use namereg_store::QueueStore;

use crate::error::{RegistrarError, Result, Stage};
use crate::options::{CommitOptions, CommitOutcome, RevealRequest, WriteOptions};
use crate::registrar::{settle, Registrar, WalletState};

impl<W: Wallet, Q: QueueStore> Registrar<W, Q> {
    /// Broadcast a `New` commit for `name`.
    ///
    /// Unless `allow_existing` is set, fails if `name` has an active record.
    pub fn commit(&self, name: &Name, options: &CommitOptions) -> Result<CommitOutcome> {
        validate_name(name, self.config.max_name_length)?;
        if !options.allow_existing && self.active_record(name, Stage::Commit)?.is_some() {
            return Err(RegistrarError::NameExists(name.clone()));
        }

        self.wallet.block_until_synced();
        let mut state = self.lock_state()?;
        let (outcome, _) = self.issue_commit(&mut state, Stage::Commit, name, &options.write)?;
        Ok(outcome)
    }

    /// Build, broadcast and index a commit. The caller holds the wallet lock.
    pub(crate) fn issue_commit(
        &self,
        state: &mut WalletState,
        stage: Stage,
        name: &Name,
        write: &WriteOptions,
    ) -> Result<(CommitOutcome, Coin)> {
        self.wallet
            .ensure_unlocked()
            .map_err(RegistrarError::wallet(stage))?;

        let mut destination = self.destination(stage, write)?;
        let script = destination
            .script()
            .map_err(RegistrarError::wallet(stage))?;

        let (salt, salt_derived) = match self.wallet.signing_key(&script) {
            Some(key) => (derive_salt(&key, name), true),
            None => (Salt::random(&mut rand::thread_rng()), false),
        };
        let commitment = Commitment::compute(&salt, name);
        let name_out = TxOut::with_name_op(
            self.config.name_locked_amount,
            script.clone(),
            NameOp::New { commitment },
        );

        let sent = self
            .recipients(name_out, write)
            .and_then(|recipients| self.send(stage, Some(name), &recipients, None));
        let tx = settle(destination, sent)?;
        let txid = tx.txid();

        let Some((vout, output)) = tx.name_output() else {
            return Err(RegistrarError::Inconsistent {
                stage,
                name: Some(name.clone()),
                reason: "wallet dropped the name output".into(),
                committed: vec![txid],
            });
        };
        let outpoint = OutPoint::new(txid, vout);
        state.index.insert(commitment, outpoint, script);

        tracing::info!(
            name = %name,
            salt = %salt.to_hex(),
            txid = %txid,
            derived = salt_derived,
            "name commit sent"
        );

        let coin = Coin {
            outpoint,
            output: output.clone(),
        };
        Ok((
            CommitOutcome {
                txid,
                outpoint,
                salt,
                salt_derived,
            },
            coin,
        ))
    }

    /// Reveal a committed name with a `FirstUpdate`.
    ///
    /// Checks, in order:
    /// 1. Name, value and salt bounds
    /// 2. The pool is not already registering the name
    /// 3. The name is not active, unless `allow_active`
    /// 4. The commit can be found and its salt matches
    pub fn reveal(&self, request: &RevealRequest) -> Result<Txid> {
        let name = &request.name;
        validate_name(name, self.config.max_name_length)?;
        validate_value(&request.value, self.config.max_value_length)?;

        if self.chain.pool.registers_name(name) {
            return Err(RegistrarError::NameBeingRegistered(name.clone()));
        }
        if !request.allow_active && self.active_record(name, Stage::Reveal)?.is_some() {
            return Err(RegistrarError::NameActive(name.clone()));
        }

        self.wallet.block_until_synced();
        let mut state = self.lock_state()?;

        let commit_txid = match request.commit_txid {
            Some(txid) => txid,
            None => {
                state.index.refresh(&self.wallet);
                state.index.find(&self.wallet, name, request.salt.as_ref())?
            }
        };
        let commit = self.commit_output(&commit_txid)?;
        let Some(prev) = commit.output.name_op.as_ref() else {
            return Err(RegistrarError::CommitOutputMissing(commit_txid));
        };

        let salt = match &request.salt {
            Some(salt) => salt.clone(),
            None => {
                let key = self
                    .wallet
                    .signing_key(&commit.output.script)
                    .ok_or(RegistrarError::SaltUnavailable(commit_txid))?;
                let salt = derive_salt(&key, name);
                if let Some(commitment) = prev.commitment() {
                    if !commitment.verify(&salt, name) {
                        return Err(RegistrarError::DerivedSaltMismatch(commit_txid));
                    }
                }
                salt
            }
        };
        check_reveal(prev, name, &salt)?;

        self.wallet
            .ensure_unlocked()
            .map_err(RegistrarError::wallet(Stage::Reveal))?;
        let mut destination = self.destination(Stage::Reveal, &request.write)?;
        let script = destination
            .script()
            .map_err(RegistrarError::wallet(Stage::Reveal))?;
        let name_out = TxOut::with_name_op(
            self.config.name_locked_amount,
            script,
            NameOp::FirstUpdate {
                name: name.clone(),
                value: request.value.clone(),
                salt,
            },
        );

        let sent = self
            .recipients(name_out, &request.write)
            .and_then(|recipients| self.send(Stage::Reveal, Some(name), &recipients, Some(&commit)));
        let tx = settle(destination, sent)?;
        state.index.remove(&commit.outpoint);

        let txid = tx.txid();
        tracing::info!(name = %name, commit = %commit_txid, txid = %txid, "name reveal sent");
        Ok(txid)
    }

    /// The name output of `txid`: from the wallet first, then the ledger.
    pub(crate) fn commit_output(&self, txid: &Txid) -> Result<Coin> {
        if let Some(wtx) = self.wallet.get_transaction(txid) {
            if wtx.tx.name_output_count() > 1 {
                tracing::error!(txid = %txid, "wallet contains a transaction with several name outputs");
            }
            if let Some((vout, output)) = wtx.tx.name_output() {
                return Ok(Coin {
                    outpoint: OutPoint::new(*txid, vout),
                    output: output.clone(),
                });
            }
        }

        for vout in 0..self.config.max_prevout_trials {
            let coin = self
                .chain
                .names
                .get_coin(&OutPoint::new(*txid, vout))
                .map_err(RegistrarError::chain(Stage::Reveal))?;
            if let Some(coin) = coin.filter(|c| c.output.name_op.is_some()) {
                return Ok(coin);
            }
        }
        Err(RegistrarError::CommitOutputMissing(*txid))
    }
}
