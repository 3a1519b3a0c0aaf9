//! In-memory ledger, pending pool and broadcaster.
//!
//! `TestChain` keeps a confirmed UTXO set with a name index, a mempool that
//! admits transactions through the same checks as `test_accept`, and a
//! `mine_block` step that confirms whatever has become valid. Clones share
//! state, so one chain can be handed to the registrar three times over.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use namereg_core::{
    validate_transaction_structure, AcceptVerdict, Amount, Broadcaster, ChainError, Coin, Name,
    NameIndex, NameOp, NameRecord, OutPoint, PendingPool, Script, Transaction, TxIn, TxOut, Txid,
    Value,
};

/// Confirmations a commit needs before its reveal can be mined.
pub const FIRST_UPDATE_DEPTH: u32 = 12;

/// Blocks until a name expires, unless configured otherwise.
pub const EXPIRATION_DEPTH: u64 = 36_000;

/// Amount locked in names created by [`TestChain::insert_name`].
pub const NAME_AMOUNT: Amount = 1_000_000;

#[derive(Clone, Default)]
pub struct TestChain {
    inner: Arc<RwLock<ChainInner>>,
}

struct ChainInner {
    height: u64,
    confirmed_at: HashMap<Txid, u64>,
    utxos: HashMap<OutPoint, TxOut>,
    mempool: Vec<Transaction>,
    names: HashMap<Name, NameRecord>,
    expiration_depth: u64,
    first_update_depth: u32,
    initial_download: bool,
    reject_reason: Option<String>,
    unavailable: bool,
    synthetic: u64,
    broadcasts: Vec<Txid>,
}

impl Default for ChainInner {
    fn default() -> Self {
        Self {
            height: 1,
            confirmed_at: HashMap::new(),
            utxos: HashMap::new(),
            mempool: Vec::new(),
            names: HashMap::new(),
            expiration_depth: EXPIRATION_DEPTH,
            first_update_depth: FIRST_UPDATE_DEPTH,
            initial_download: false,
            reject_reason: None,
            unavailable: false,
            synthetic: 0,
            broadcasts: Vec::new(),
        }
    }
}

/// Why a transaction cannot be admitted.
struct Refusal {
    consensus: bool,
    reason: String,
}

impl Refusal {
    fn consensus(reason: impl Into<String>) -> Self {
        Self {
            consensus: true,
            reason: reason.into(),
        }
    }

    fn policy(reason: impl Into<String>) -> Self {
        Self {
            consensus: false,
            reason: reason.into(),
        }
    }
}

impl ChainInner {
    fn confirmations(&self, txid: &Txid) -> Option<u32> {
        self.confirmed_at
            .get(txid)
            .map(|h| (self.height - h + 1) as u32)
    }

    fn mempool_output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.mempool
            .iter()
            .find(|tx| tx.txid() == outpoint.txid)
            .and_then(|tx| tx.outputs.get(outpoint.vout as usize).cloned())
    }

    fn spent_in_mempool(&self, outpoint: &OutPoint) -> bool {
        self.mempool
            .iter()
            .any(|tx| tx.prevouts().any(|p| p == outpoint))
    }

    fn is_known(&self, txid: &Txid) -> bool {
        self.confirmed_at.contains_key(txid) || self.mempool.iter().any(|tx| tx.txid() == *txid)
    }

    /// Check `tx` against the confirmed set, plus the mempool if `with_pool`.
    fn check(&self, tx: &Transaction, with_pool: bool) -> Result<(), Refusal> {
        validate_transaction_structure(tx).map_err(|e| Refusal::consensus(e.to_string()))?;

        let mut name_input: Option<(OutPoint, TxOut)> = None;
        for prevout in tx.prevouts() {
            let coin = match self.utxos.get(prevout) {
                Some(out) => out.clone(),
                None if with_pool => self
                    .mempool_output(prevout)
                    .ok_or_else(|| Refusal::policy("missing inputs"))?,
                None => return Err(Refusal::policy("missing inputs")),
            };
            if with_pool && self.spent_in_mempool(prevout) {
                return Err(Refusal::policy(format!("{} already spent in pool", prevout)));
            }
            if coin.name_op.is_some() && name_input.is_none() {
                name_input = Some((*prevout, coin));
            }
        }

        let op = tx.name_output().and_then(|(_, out)| out.name_op.as_ref());
        match (op, name_input) {
            (None, Some(_)) => Err(Refusal::consensus("name input spent without name output")),
            (None, None) | (Some(NameOp::New { .. }), None) => Ok(()),
            (Some(NameOp::New { .. }), Some(_)) => {
                Err(Refusal::consensus("commit must not spend a name output"))
            }
            (Some(NameOp::FirstUpdate { name, salt, .. }), Some((prevout, prev))) => {
                let Some(NameOp::New { commitment }) = prev.name_op else {
                    return Err(Refusal::consensus("first update does not spend a commit"));
                };
                if !commitment.verify(salt, name) {
                    return Err(Refusal::consensus("commitment mismatch"));
                }
                if let Some(record) = self.names.get(name) {
                    if !record.is_expired(self.height) {
                        return Err(Refusal::consensus(format!("{} is already active", name)));
                    }
                }
                match self.confirmations(&prevout.txid) {
                    Some(c) if c >= self.first_update_depth => Ok(()),
                    _ => Err(Refusal::policy("commit is not mature")),
                }
            }
            (Some(NameOp::FirstUpdate { .. }), None) => {
                Err(Refusal::consensus("first update does not spend a commit"))
            }
            (Some(NameOp::Update { name, .. }), Some((_, prev))) => {
                match prev.name_op.as_ref().and_then(|op| op.name()) {
                    Some(prev_name) if prev_name == name => Ok(()),
                    _ => Err(Refusal::consensus("update spends a different name")),
                }
            }
            (Some(NameOp::Update { .. }), None) => {
                Err(Refusal::consensus("update does not spend a name output"))
            }
        }
    }

    fn apply(&mut self, tx: &Transaction) {
        let txid = tx.txid();
        for prevout in tx.prevouts() {
            self.utxos.remove(prevout);
        }
        for (vout, out) in tx.outputs.iter().enumerate() {
            let outpoint = OutPoint::new(txid, vout as u32);
            self.utxos.insert(outpoint, out.clone());
            if let Some(op) = &out.name_op {
                if let (Some(name), Some(value)) = (op.name(), op.value()) {
                    self.names.insert(
                        name.clone(),
                        NameRecord {
                            name: name.clone(),
                            value: value.clone(),
                            outpoint,
                            script: out.script.clone(),
                            height: self.height,
                            expires_at: self.height + self.expiration_depth,
                        },
                    );
                }
            }
        }
        self.confirmed_at.insert(txid, self.height);
    }

    /// A confirmed transaction with no real inputs.
    fn synthetic_tx(&mut self, outputs: Vec<TxOut>) -> Transaction {
        self.synthetic += 1;
        let mut seed = [0xeeu8; 32];
        seed[..8].copy_from_slice(&self.synthetic.to_be_bytes());
        Transaction::new(
            vec![TxIn::new(OutPoint::new(Txid::from_bytes(seed), 0))],
            outputs,
        )
    }
}

impl TestChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ChainInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChainInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Test controls ──

    pub fn height(&self) -> u64 {
        self.read().height
    }

    /// Mine one block: confirm every mempool transaction that is now valid.
    pub fn mine_block(&self) -> Vec<Txid> {
        let mut inner = self.write();
        inner.height += 1;

        let pending = std::mem::take(&mut inner.mempool);
        let mut included = Vec::new();
        let mut kept = Vec::new();
        for tx in pending {
            if inner.check(&tx, false).is_ok() {
                inner.apply(&tx);
                included.push(tx.txid());
            } else {
                kept.push(tx);
            }
        }
        inner.mempool = kept;
        included
    }

    pub fn mine_blocks(&self, n: u32) {
        for _ in 0..n {
            self.mine_block();
        }
    }

    /// Create a confirmed coin paying `amount` to `script`.
    pub fn fund(&self, script: &Script, amount: Amount) -> OutPoint {
        let mut inner = self.write();
        let tx = inner.synthetic_tx(vec![TxOut::new(amount, script.clone())]);
        inner.apply(&tx);
        OutPoint::new(tx.txid(), 0)
    }

    /// Register `name` directly in the ledger, owned by `script`.
    pub fn insert_name(&self, name: &Name, value: &Value, script: &Script) -> OutPoint {
        let mut inner = self.write();
        let op = NameOp::Update {
            name: name.clone(),
            value: value.clone(),
        };
        let tx = inner.synthetic_tx(vec![TxOut::with_name_op(NAME_AMOUNT, script.clone(), op)]);
        inner.apply(&tx);
        OutPoint::new(tx.txid(), 0)
    }

    /// Make `name` expired at the current height.
    pub fn expire(&self, name: &Name) {
        let mut inner = self.write();
        let height = inner.height;
        if let Some(record) = inner.names.get_mut(name) {
            record.expires_at = height;
        }
    }

    pub fn set_initial_download(&self, on: bool) {
        self.write().initial_download = on;
    }

    /// Make every broadcast fail with `reason`.
    pub fn reject_broadcasts(&self, reason: Option<&str>) {
        self.write().reject_reason = reason.map(String::from);
    }

    /// Make every ledger read and broadcast fail as unavailable.
    pub fn set_unavailable(&self, on: bool) {
        self.write().unavailable = on;
    }

    pub fn mempool(&self) -> Vec<Transaction> {
        self.read().mempool.clone()
    }

    pub fn in_mempool(&self, txid: &Txid) -> bool {
        self.read().mempool.iter().any(|tx| tx.txid() == *txid)
    }

    /// Txids relayed through [`Broadcaster::broadcast`], in order.
    pub fn broadcasts(&self) -> Vec<Txid> {
        self.read().broadcasts.clone()
    }

    pub fn is_confirmed(&self, txid: &Txid) -> bool {
        self.read().confirmed_at.contains_key(txid)
    }
}

impl NameIndex for TestChain {
    fn get_name(&self, name: &Name) -> Result<Option<NameRecord>, ChainError> {
        let inner = self.read();
        if inner.unavailable {
            return Err(ChainError::Unavailable("test chain offline".into()));
        }
        Ok(inner.names.get(name).cloned())
    }

    fn active_height(&self) -> u64 {
        self.read().height
    }

    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, ChainError> {
        let inner = self.read();
        if inner.unavailable {
            return Err(ChainError::Unavailable("test chain offline".into()));
        }
        Ok(inner.utxos.get(outpoint).map(|out| Coin {
            outpoint: *outpoint,
            output: out.clone(),
        }))
    }

    fn confirmations(&self, txid: &Txid) -> Result<Option<u32>, ChainError> {
        let inner = self.read();
        if inner.unavailable {
            return Err(ChainError::Unavailable("test chain offline".into()));
        }
        Ok(inner.confirmations(txid))
    }

    fn is_initial_download(&self) -> bool {
        self.read().initial_download
    }
}

impl PendingPool for TestChain {
    fn pending_chain_length(&self, name: &Name) -> usize {
        self.read()
            .mempool
            .iter()
            .filter_map(|tx| tx.name_output())
            .filter(|(_, out)| out.name_op.as_ref().and_then(|op| op.name()) == Some(name))
            .count()
    }

    fn last_name_output(&self, name: &Name) -> Option<Coin> {
        let inner = self.read();
        inner.mempool.iter().rev().find_map(|tx| {
            let (vout, out) = tx.name_output()?;
            if out.name_op.as_ref().and_then(|op| op.name()) != Some(name) {
                return None;
            }
            Some(Coin {
                outpoint: OutPoint::new(tx.txid(), vout),
                output: out.clone(),
            })
        })
    }

    fn registers_name(&self, name: &Name) -> bool {
        self.read().mempool.iter().any(|tx| {
            matches!(
                tx.name_output().and_then(|(_, out)| out.name_op.as_ref()),
                Some(NameOp::FirstUpdate { name: n, .. }) if n == name
            )
        })
    }

    fn test_accept(&self, tx: &Transaction) -> AcceptVerdict {
        let inner = self.read();
        if inner.is_known(&tx.txid()) {
            return AcceptVerdict::Rejected {
                consensus: false,
                reason: "transaction already known".into(),
            };
        }
        match inner.check(tx, true) {
            Ok(()) => AcceptVerdict::Valid,
            Err(r) => AcceptVerdict::Rejected {
                consensus: r.consensus,
                reason: r.reason,
            },
        }
    }
}

impl Broadcaster for TestChain {
    fn broadcast(&self, tx: &Transaction) -> Result<(), ChainError> {
        let mut inner = self.write();
        if inner.unavailable {
            return Err(ChainError::Unavailable("test chain offline".into()));
        }
        if let Some(reason) = &inner.reject_reason {
            return Err(ChainError::Rejected(reason.clone()));
        }
        let txid = tx.txid();
        if inner.is_known(&txid) {
            return Err(ChainError::Rejected("transaction already known".into()));
        }
        inner
            .check(tx, true)
            .map_err(|r| ChainError::Rejected(r.reason))?;
        inner.mempool.push(tx.clone());
        inner.broadcasts.push(txid);
        Ok(())
    }
}
