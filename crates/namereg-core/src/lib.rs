//! # Name Registrar Core
//!
//! Pure primitives for the commit-reveal name registrar: names, salts,
//! commitments, name operations and the transactions that carry them.
//!
//! This crate contains no I/O, no storage, no networking. The collaborators
//! the registrar talks to (wallet, ledger index, pending pool, broadcaster)
//! are described here only as traits, see [`traits`].
//!
//! ## Key Types
//!
//! - [`Name`] / [`Value`] - Opaque byte strings identifying a slot and its payload
//! - [`Salt`] - Secret blinding factor, at most 20 bytes
//! - [`Commitment`] - `RIPEMD160(SHA256(salt || name))`
//! - [`NameOp`] - `New`, `FirstUpdate` or `Update`
//! - [`Transaction`] / [`Txid`] - The UTXO transaction shape the registrar builds
//! - [`QueuedTransaction`] - A signed transaction held back from broadcast
//!
//! ## Canonicalization
//!
//! Transactions are encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod commitment;
pub mod crypto;
pub mod delegate;
pub mod error;
pub mod nameop;
pub mod queued;
pub mod script;
pub mod traits;
pub mod transaction;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, canonical_txid_bytes, decode_transaction};
pub use commitment::{derive_salt, Commitment, Salt, SALT_CONTEXT, SALT_LENGTH};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use delegate::{
    delegation_value, synthesize_delegate_name, DelegateNamespace, DigitSuffixCandidates,
    HexSuffixCandidates,
};
pub use error::{ChainError, CoreError, ValidationError, WalletError};
pub use nameop::{NameOp, NameOpKind};
pub use queued::{Maturity, QueuedTransaction};
pub use script::Script;
pub use traits::{
    AcceptVerdict, Broadcaster, Coin, NameIndex, NameRecord, PendingPool, Reservation,
    ReservationId, Wallet, WalletTx,
};
pub use transaction::{OutPoint, Transaction, TxIn, TxOut, SEQUENCE_FINAL};
pub use types::{Amount, Name, Txid, Value, COIN, MAX_NAME_LENGTH, MAX_VALUE_LENGTH};
pub use validation::{check_reveal, validate_name, validate_transaction_structure, validate_value};
