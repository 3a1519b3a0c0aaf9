//! Name updates.
//!
//! An update must extend the newest output of the name. If the pool holds
//! pending operations on it, that is the last pending output; otherwise it
//! is the output recorded in the ledger. The number of pending operations is
//! capped by `name_chain_limit`.

use namereg_core::{validate_name, validate_value, Coin, Name, NameOp, TxOut, Txid, Value, Wallet};
use namereg_store::QueueStore;

use crate::error::{RegistrarError, Result, Stage};
use crate::options::UpdateRequest;
use crate::registrar::{settle, Registrar};

/// The output an update spends and the value it writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInput {
    pub coin: Coin,
    pub value: Value,
    /// Pending operations on the name before this update.
    pub pending: usize,
}

impl<W: Wallet, Q: QueueStore> Registrar<W, Q> {
    /// Find the output to spend for updating `name`.
    ///
    /// `value` of `None` inherits the value of that output.
    pub fn resolve_update(&self, name: &Name, value: Option<&Value>) -> Result<UpdateInput> {
        let limit = self.config.name_chain_limit;
        let pending = self.chain.pool.pending_chain_length(name);
        if pending >= limit {
            return Err(RegistrarError::TooManyPending {
                name: name.clone(),
                pending,
                limit,
            });
        }

        let pending_coin = if pending > 0 {
            self.chain.pool.last_name_output(name)
        } else {
            None
        };

        let (coin, current) = match pending_coin {
            Some(coin) => {
                let current = coin
                    .output
                    .name_op
                    .as_ref()
                    .and_then(NameOp::value)
                    .cloned()
                    .unwrap_or_default();
                (coin, current)
            }
            None => {
                let record = self
                    .active_record(name, Stage::Update)?
                    .ok_or_else(|| RegistrarError::NotUpdatable(name.clone()))?;
                let coin = self
                    .chain
                    .names
                    .get_coin(&record.outpoint)
                    .map_err(RegistrarError::chain(Stage::Update))?
                    .ok_or_else(|| RegistrarError::NotUpdatable(name.clone()))?;
                (coin, record.value)
            }
        };

        let value = value.cloned().unwrap_or(current);
        validate_value(&value, self.config.max_value_length)?;
        Ok(UpdateInput {
            coin,
            value,
            pending,
        })
    }

    /// Write a new value for `name`, or move it with `dest_address`.
    pub fn update(&self, request: &UpdateRequest) -> Result<Txid> {
        let name = &request.name;
        validate_name(name, self.config.max_name_length)?;
        if let Some(value) = &request.value {
            validate_value(value, self.config.max_value_length)?;
        }
        let input = self.resolve_update(name, request.value.as_ref())?;

        self.wallet.block_until_synced();
        let _state = self.lock_state()?;
        self.wallet
            .ensure_unlocked()
            .map_err(RegistrarError::wallet(Stage::Update))?;

        let mut destination = self.destination(Stage::Update, &request.write)?;
        let script = destination
            .script()
            .map_err(RegistrarError::wallet(Stage::Update))?;
        let name_out = TxOut::with_name_op(
            self.config.name_locked_amount,
            script,
            NameOp::Update {
                name: name.clone(),
                value: input.value,
            },
        );

        let sent = self
            .recipients(name_out, &request.write)
            .and_then(|recipients| {
                self.send(Stage::Update, Some(name), &recipients, Some(&input.coin))
            });
        let tx = settle(destination, sent)?;

        let txid = tx.txid();
        tracing::info!(
            name = %name,
            prev = %input.coin.outpoint,
            pending = input.pending,
            txid = %txid,
            "name update sent"
        );
        Ok(txid)
    }
}
