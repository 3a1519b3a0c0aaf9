//! Collaborators the registrar drives but does not implement.
//!
//! Key management, coin selection and signing live behind [`Wallet`]. The
//! confirmed ledger is a [`NameIndex`], unconfirmed state is a
//! [`PendingPool`], and relaying is a [`Broadcaster`]. Implementations must be
//! `Send + Sync`; the registrar never holds their internal locks across calls.

use crate::crypto::Keypair;
use crate::error::{ChainError, WalletError};
use crate::script::Script;
use crate::transaction::{OutPoint, Transaction, TxOut};
use crate::types::{Name, Txid, Value};

/// Handle of a keypool reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationId(pub u64);

/// A reserved keypool destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub script: Script,
}

/// An output together with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub outpoint: OutPoint,
    pub output: TxOut,
}

/// A transaction known to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTx {
    pub tx: Transaction,
    /// Confirmations. 0 while unconfirmed, negative when conflicted.
    pub depth: i32,
}

/// The confirmed state of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub name: Name,
    pub value: Value,
    pub outpoint: OutPoint,
    pub script: Script,
    /// Height of the block that last updated the name.
    pub height: u64,
    /// First height at which the name is expired.
    pub expires_at: u64,
}

impl NameRecord {
    pub fn is_expired(&self, tip: u64) -> bool {
        tip >= self.expires_at
    }
}

/// Outcome of a dry-run admission to the pending pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptVerdict {
    Valid,
    /// `consensus` is true when the transaction can never become valid.
    Rejected { consensus: bool, reason: String },
}

/// Keys, coins and signing.
pub trait Wallet: Send + Sync {
    /// Reserve a fresh keypool destination.
    fn reserve_destination(&self) -> Result<Reservation, WalletError>;

    /// Mark a reservation as used.
    fn keep_destination(&self, id: ReservationId);

    /// Give a reservation back to the keypool.
    fn return_destination(&self, id: ReservationId);

    /// Turn a textual address into a script.
    fn decode_address(&self, address: &str) -> Result<Script, WalletError>;

    /// The signing key for a single-key script owned by this wallet.
    fn signing_key(&self, script: &Script) -> Option<Keypair>;

    fn is_mine(&self, script: &Script) -> bool;

    fn ensure_unlocked(&self) -> Result<(), WalletError>;

    /// Wait for the wallet to catch up with the ledger tip.
    fn block_until_synced(&self);

    /// Fund and sign a transaction paying `recipients`.
    ///
    /// `spend` is an input that must be included, typically the previous
    /// name output.
    fn create_transaction(
        &self,
        recipients: &[TxOut],
        spend: Option<&Coin>,
    ) -> Result<Transaction, WalletError>;

    /// Record a transaction the caller has broadcast or queued.
    fn commit_transaction(&self, tx: &Transaction) -> Result<(), WalletError>;

    fn lock_coin(&self, outpoint: &OutPoint);

    fn unlock_coin(&self, outpoint: &OutPoint);

    fn is_locked_coin(&self, outpoint: &OutPoint) -> bool;

    fn get_transaction(&self, txid: &Txid) -> Option<WalletTx>;

    fn transactions(&self) -> Vec<WalletTx>;
}

/// The confirmed ledger.
pub trait NameIndex: Send + Sync {
    fn get_name(&self, name: &Name) -> Result<Option<NameRecord>, ChainError>;

    /// Height used for expiry decisions.
    fn active_height(&self) -> u64;

    /// An unspent output, if it exists.
    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, ChainError>;

    /// Confirmations of `txid`, `None` if it is not in the ledger.
    fn confirmations(&self, txid: &Txid) -> Result<Option<u32>, ChainError>;

    fn is_initial_download(&self) -> bool;
}

/// Unconfirmed transactions.
pub trait PendingPool: Send + Sync {
    /// Number of pending operations on `name`.
    fn pending_chain_length(&self, name: &Name) -> usize;

    /// The newest pending name output for `name`.
    fn last_name_output(&self, name: &Name) -> Option<Coin>;

    /// Whether a pending `FirstUpdate` for `name` exists.
    fn registers_name(&self, name: &Name) -> bool;

    fn test_accept(&self, tx: &Transaction) -> AcceptVerdict;
}

pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, tx: &Transaction) -> Result<(), ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_expiry_boundary() {
        let record = NameRecord {
            name: Name::from("d/x"),
            value: Value::empty(),
            outpoint: OutPoint::new(Txid::ZERO, 0),
            script: Script::from_bytes(Vec::new()),
            height: 100,
            expires_at: 200,
        };
        assert!(!record.is_expired(199));
        assert!(record.is_expired(200));
    }
}
