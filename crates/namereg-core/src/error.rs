//! Error types for the registrar core and its collaborators.

use thiserror::Error;

/// Core errors that can occur while encoding or decoding primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("non-canonical encoding")]
    NonCanonical,

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Validation errors for names, values, salts and transaction structure.
///
/// These are all input errors: they are raised before anything is built,
/// reserved or broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the name is empty")]
    EmptyName,

    #[error("the name is too long: {len} bytes, maximum {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("the value is too long: {len} bytes, maximum {max}")]
    ValueTooLong { len: usize, max: usize },

    #[error("invalid salt: {len} bytes, maximum 20")]
    SaltTooLong { len: usize },

    #[error("previous operation is not a name commit")]
    NotACommit,

    #[error("salt does not match the commitment")]
    CommitmentMismatch,

    #[error("delegation requested, but the name is in neither d/ nor id/")]
    UnsupportedNamespace,

    #[error("delegation requires a UTF-8 name")]
    NonUtf8Name,

    #[error("no delegate name fits within {max} bytes")]
    DelegateNameUnavailable { max: usize },

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("transaction carries {0} name operations")]
    MultipleNameOutputs(usize),
}

/// Errors reported by a [`Wallet`](crate::traits::Wallet) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("keypool ran out, refill the keypool first")]
    KeypoolExhausted,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("wallet is locked, unlock it with the passphrase first")]
    Locked,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("wallet backend error: {0}")]
    Backend(String),
}

/// Errors reported by the ledger index, pending pool or broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),
}
