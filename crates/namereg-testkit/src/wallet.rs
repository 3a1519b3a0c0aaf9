//! In-memory wallet backed by a [`TestChain`].
//!
//! Keys are derived deterministically from a wallet id and a counter.
//! Addresses are the hex encoding of a script. Coins are created on the
//! chain with [`TestWallet::fund`] and tracked locally from then on.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;

use namereg_core::{
    Amount, Coin, Keypair, NameIndex, OutPoint, Reservation, ReservationId, Script, Transaction,
    TxIn, TxOut, Txid, Wallet, WalletError, WalletTx,
};

use crate::chain::TestChain;

/// Flat fee paid by every transaction the wallet creates.
pub const FEE: Amount = 1_000;

/// Keys in a fresh keypool.
pub const KEYPOOL_SIZE: usize = 100;

#[derive(Clone)]
pub struct TestWallet {
    chain: TestChain,
    inner: Arc<RwLock<WalletInner>>,
}

struct WalletInner {
    id: u8,
    next_key: u64,
    next_reservation: u64,
    keypool: VecDeque<Keypair>,
    reserved: HashMap<ReservationId, Keypair>,
    kept: usize,
    keys: HashMap<Script, Keypair>,
    coins: BTreeMap<OutPoint, TxOut>,
    locked: HashSet<OutPoint>,
    txs: Vec<Transaction>,
    is_locked: bool,
    fail_commits: bool,
}

impl WalletInner {
    fn derive_key(&mut self) -> Keypair {
        self.next_key += 1;
        let mut seed = [0u8; 32];
        seed[0] = self.id;
        seed[1] = 0x77;
        seed[24..].copy_from_slice(&self.next_key.to_be_bytes());
        let key = Keypair::from_seed(&seed);
        self.keys
            .insert(Script::pay_to_key(&key.public_key()), key.clone());
        key
    }
}

impl TestWallet {
    /// A wallet with a full keypool.
    pub fn new(chain: TestChain) -> Self {
        Self::with_keypool(chain, 0, KEYPOOL_SIZE)
    }

    /// A wallet with its own key space and a keypool of `size` keys.
    pub fn with_keypool(chain: TestChain, id: u8, size: usize) -> Self {
        let mut inner = WalletInner {
            id,
            next_key: 0,
            next_reservation: 0,
            keypool: VecDeque::new(),
            reserved: HashMap::new(),
            kept: 0,
            keys: HashMap::new(),
            coins: BTreeMap::new(),
            locked: HashSet::new(),
            txs: Vec::new(),
            is_locked: false,
            fail_commits: false,
        };
        for _ in 0..size {
            let key = inner.derive_key();
            inner.keypool.push_back(key);
        }
        Self {
            chain,
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, WalletInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, WalletInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Test controls ──

    /// Add a confirmed coin of `amount` to the wallet.
    pub fn fund(&self, amount: Amount) -> OutPoint {
        let script = self.new_script();
        let outpoint = self.chain.fund(&script, amount);
        self.write()
            .coins
            .insert(outpoint, TxOut::new(amount, script));
        outpoint
    }

    /// A fresh wallet-owned script outside the keypool.
    pub fn new_script(&self) -> Script {
        let key = self.write().derive_key();
        Script::pay_to_key(&key.public_key())
    }

    /// A fresh wallet-owned address outside the keypool.
    pub fn new_address(&self) -> String {
        Self::address_of(&self.new_script())
    }

    pub fn address_of(script: &Script) -> String {
        script.to_hex()
    }

    pub fn set_locked(&self, locked: bool) {
        self.write().is_locked = locked;
    }

    /// Make `commit_transaction` fail.
    pub fn fail_commits(&self, fail: bool) {
        self.write().fail_commits = fail;
    }

    pub fn keypool_len(&self) -> usize {
        self.read().keypool.len()
    }

    pub fn reserved_count(&self) -> usize {
        self.read().reserved.len()
    }

    pub fn kept_count(&self) -> usize {
        self.read().kept
    }

    pub fn locked_coins(&self) -> HashSet<OutPoint> {
        self.read().locked.clone()
    }

    pub fn balance(&self) -> Amount {
        self.read().coins.values().map(|c| c.amount).sum()
    }

    fn sign_input(inner: &WalletInner, txid: &Txid, script: &Script) -> Result<Bytes, WalletError> {
        let key = inner
            .keys
            .get(script)
            .ok_or_else(|| WalletError::SigningFailed(format!("no key for {}", script.to_hex())))?;
        Ok(Bytes::copy_from_slice(key.sign(txid.as_bytes()).as_bytes()))
    }
}

impl Wallet for TestWallet {
    fn reserve_destination(&self) -> Result<Reservation, WalletError> {
        let mut inner = self.write();
        let key = inner
            .keypool
            .pop_front()
            .ok_or(WalletError::KeypoolExhausted)?;
        inner.next_reservation += 1;
        let id = ReservationId(inner.next_reservation);
        let script = Script::pay_to_key(&key.public_key());
        inner.reserved.insert(id, key);
        Ok(Reservation { id, script })
    }

    fn keep_destination(&self, id: ReservationId) {
        let mut inner = self.write();
        if inner.reserved.remove(&id).is_some() {
            inner.kept += 1;
        }
    }

    fn return_destination(&self, id: ReservationId) {
        let mut inner = self.write();
        if let Some(key) = inner.reserved.remove(&id) {
            inner.keypool.push_front(key);
        }
    }

    fn decode_address(&self, address: &str) -> Result<Script, WalletError> {
        let bytes =
            hex::decode(address).map_err(|_| WalletError::InvalidAddress(address.to_string()))?;
        let script = Script::from_bytes(bytes);
        if !script.is_valid() {
            return Err(WalletError::InvalidAddress(address.to_string()));
        }
        Ok(script)
    }

    fn signing_key(&self, script: &Script) -> Option<Keypair> {
        self.read().keys.get(script).cloned()
    }

    fn is_mine(&self, script: &Script) -> bool {
        self.read().keys.contains_key(script)
    }

    fn ensure_unlocked(&self) -> Result<(), WalletError> {
        if self.read().is_locked {
            return Err(WalletError::Locked);
        }
        Ok(())
    }

    fn block_until_synced(&self) {}

    fn create_transaction(
        &self,
        recipients: &[TxOut],
        spend: Option<&Coin>,
    ) -> Result<Transaction, WalletError> {
        let mut inner = self.write();
        if inner.is_locked {
            return Err(WalletError::Locked);
        }

        let needed: Amount = recipients.iter().map(|r| r.amount).sum::<Amount>() + FEE;
        let mut inputs = Vec::new();
        let mut input_scripts = Vec::new();
        let mut total: Amount = 0;

        if let Some(coin) = spend {
            inputs.push(TxIn::new(coin.outpoint));
            input_scripts.push(coin.output.script.clone());
            total += coin.output.amount;
        }

        let selectable: Vec<(OutPoint, TxOut)> = inner
            .coins
            .iter()
            .filter(|(op, _)| !inner.locked.contains(*op))
            .filter(|(op, _)| spend.map_or(true, |c| c.outpoint != **op))
            .map(|(op, out)| (*op, out.clone()))
            .collect();
        for (outpoint, out) in selectable {
            if total >= needed {
                break;
            }
            inputs.push(TxIn::new(outpoint));
            input_scripts.push(out.script.clone());
            total += out.amount;
        }
        if total < needed {
            return Err(WalletError::InsufficientFunds(format!(
                "need {}, have {}",
                needed, total
            )));
        }

        let mut outputs = recipients.to_vec();
        if total > needed {
            let change = inner.derive_key();
            outputs.push(TxOut::new(
                total - needed,
                Script::pay_to_key(&change.public_key()),
            ));
        }

        let mut tx = Transaction::new(inputs, outputs);
        let txid = tx.txid();
        for (input, script) in tx.inputs.iter_mut().zip(&input_scripts) {
            input.witness = Self::sign_input(&inner, &txid, script)?;
        }
        Ok(tx)
    }

    fn commit_transaction(&self, tx: &Transaction) -> Result<(), WalletError> {
        let mut inner = self.write();
        if inner.fail_commits {
            return Err(WalletError::Backend("wallet database write failed".into()));
        }
        let txid = tx.txid();
        if inner.txs.iter().any(|t| t.txid() == txid) {
            return Ok(());
        }
        for prevout in tx.prevouts() {
            inner.coins.remove(prevout);
        }
        for (vout, out) in tx.outputs.iter().enumerate() {
            if out.name_op.is_none() && inner.keys.contains_key(&out.script) {
                inner
                    .coins
                    .insert(OutPoint::new(txid, vout as u32), out.clone());
            }
        }
        inner.txs.push(tx.clone());
        Ok(())
    }

    fn lock_coin(&self, outpoint: &OutPoint) {
        self.write().locked.insert(*outpoint);
    }

    fn unlock_coin(&self, outpoint: &OutPoint) {
        self.write().locked.remove(outpoint);
    }

    fn is_locked_coin(&self, outpoint: &OutPoint) -> bool {
        self.read().locked.contains(outpoint)
    }

    fn get_transaction(&self, txid: &Txid) -> Option<WalletTx> {
        let tx = self.read().txs.iter().find(|t| t.txid() == *txid).cloned()?;
        Some(WalletTx {
            depth: self.depth_of(txid),
            tx,
        })
    }

    fn transactions(&self) -> Vec<WalletTx> {
        let txs = self.read().txs.clone();
        txs.into_iter()
            .map(|tx| WalletTx {
                depth: self.depth_of(&tx.txid()),
                tx,
            })
            .collect()
    }
}

impl TestWallet {
    fn depth_of(&self, txid: &Txid) -> i32 {
        self.chain
            .confirmations(txid)
            .ok()
            .flatten()
            .map_or(0, |c| c as i32)
    }
}
