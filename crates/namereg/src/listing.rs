//! Wallet name listing and payments to name owners.

use std::collections::BTreeMap;

use namereg_core::{Amount, Name, OutPoint, TxOut, Txid, Wallet};
use namereg_store::QueueStore;

use crate::error::{RegistrarError, Result, Stage};
use crate::options::NameEntry;
use crate::registrar::Registrar;

impl<W: Wallet, Q: QueueStore> Registrar<W, Q> {
    /// Names the wallet has written, newest state per name.
    ///
    /// Only confirmed `FirstUpdate` and `Update` outputs count. `filter`
    /// restricts the listing to one name.
    pub fn list_names(&self, filter: Option<&Name>) -> Result<Vec<NameEntry>> {
        self.wallet.block_until_synced();
        let tip = self.chain.names.active_height();
        let mut newest: BTreeMap<Name, NameEntry> = BTreeMap::new();

        for wtx in self.wallet.transactions() {
            if wtx.depth <= 0 {
                continue;
            }
            let txid = wtx.tx.txid();
            if wtx.tx.name_output_count() > 1 {
                tracing::error!(txid = %txid, "wallet contains a transaction with several name outputs");
            }
            let Some((vout, out)) = wtx.tx.name_output() else {
                continue;
            };
            let Some(op) = out.name_op.as_ref().filter(|op| op.is_update()) else {
                continue;
            };
            let (Some(name), Some(value)) = (op.name(), op.value()) else {
                continue;
            };
            if filter.is_some_and(|f| f != name) {
                continue;
            }

            let height = (tip + 1).saturating_sub(wtx.depth as u64);
            if newest.get(name).is_some_and(|e| e.height > height) {
                continue;
            }
            let expires_at = height + self.config.name_expiration_depth;
            let expires_in = expires_at as i64 - tip as i64;
            newest.insert(
                name.clone(),
                NameEntry {
                    name: name.clone(),
                    value: value.clone(),
                    outpoint: OutPoint::new(txid, vout),
                    script: out.script.clone(),
                    height,
                    expires_in,
                    expired: expires_in <= 0,
                    is_mine: self.wallet.is_mine(&out.script),
                },
            );
        }

        Ok(newest.into_values().collect())
    }

    /// Pay `amount` to the current owner of `name`.
    pub fn send_to_name(&self, name: &Name, amount: Amount) -> Result<Txid> {
        let stage = Stage::SendToName;
        if self.chain.names.is_initial_download() {
            return Err(RegistrarError::InitialDownload);
        }
        self.wallet.block_until_synced();

        let record = self
            .chain
            .names
            .get_name(name)
            .map_err(RegistrarError::chain(stage))?
            .ok_or_else(|| RegistrarError::NameNotFound(name.clone()))?;
        if record.is_expired(self.chain.names.active_height()) {
            return Err(RegistrarError::NameExpired(name.clone()));
        }
        if amount == 0 {
            return Err(RegistrarError::InvalidAmount);
        }

        let _state = self.lock_state()?;
        self.wallet
            .ensure_unlocked()
            .map_err(RegistrarError::wallet(stage))?;
        let tx = self.send(stage, Some(name), &[TxOut::new(amount, record.script)], None)?;

        let txid = tx.txid();
        tracing::info!(name = %name, amount, txid = %txid, "payment to name owner sent");
        Ok(txid)
    }
}
