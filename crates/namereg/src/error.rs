//! Error types for the registrar.

use std::fmt;

use namereg_core::{ChainError, CoreError, Name, Txid, ValidationError, WalletError};
use namereg_store::StoreError;
use thiserror::Error;

/// Broad category of a [`RegistrarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is wrong. Retrying it unchanged cannot succeed.
    InvalidInput,
    /// The request conflicts with ledger, pool or wallet state.
    Conflict,
    /// A collaborator ran out of something or refused.
    Resource,
    /// A failure after an external side effect. Manual recovery may be needed.
    Inconsistent,
}

/// The operation an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Commit,
    Reveal,
    Update,
    AutoRegister,
    Enqueue,
    Release,
    SendToName,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Commit => "commit",
            Self::Reveal => "reveal",
            Self::Update => "update",
            Self::AutoRegister => "auto-register",
            Self::Enqueue => "enqueue",
            Self::Release => "release",
            Self::SendToName => "send-to-name",
        };
        f.write_str(s)
    }
}

/// Errors that can occur during registrar operations.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A raw transaction or hex string failed to decode.
    #[error("TX decode failed: {0}")]
    Decode(#[from] CoreError),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount for send")]
    InvalidAmount,

    /// Commit requested for a name with an active record.
    #[error("this name exists already: {0}")]
    NameExists(Name),

    /// Reveal requested for a name with an active record.
    #[error("this name is already active: {0}")]
    NameActive(Name),

    #[error("this name is already being registered: {0}")]
    NameBeingRegistered(Name),

    #[error("there are already too many pending operations on {name} ({pending}, limit {limit})")]
    TooManyPending {
        name: Name,
        pending: usize,
        limit: usize,
    },

    #[error("this name can not be updated: {0}")]
    NotUpdatable(Name),

    #[error("name not found: {0}")]
    NameNotFound(Name),

    #[error("the name is expired: {0}")]
    NameExpired(Name),

    /// No wallet commit opens with the given name and salt.
    #[error("scan for previous txid failed: {0}")]
    CommitNotFound(Name),

    #[error("several commits match {name}, pass the txid explicitly: {candidates:?}")]
    AmbiguousCommit { name: Name, candidates: Vec<Txid> },

    #[error("previous txid not found: {0}")]
    CommitOutputMissing(Txid),

    #[error("could not generate salt for the output of {0}")]
    SaltUnavailable(Txid),

    #[error("generated salt does not match the commitment of {0}")]
    DerivedSaltMismatch(Txid),

    /// The pool says the transaction can never become valid.
    #[error("Invalid transaction {txid} ({reason})")]
    InvalidTransaction { txid: Txid, reason: String },

    #[error("transaction is not queued: {0}")]
    NotQueued(Txid),

    #[error("{stage}: wallet error: {source}")]
    Wallet {
        stage: Stage,
        #[source]
        source: WalletError,
    },

    #[error("{stage}: chain error: {source}")]
    Chain {
        stage: Stage,
        #[source]
        source: ChainError,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("the node is still downloading blocks")]
    InitialDownload,

    /// Something failed after a transaction left the process.
    #[error("inconsistent state in {stage}, manual recovery may be needed: {reason} (already sent: {committed:?})")]
    Inconsistent {
        stage: Stage,
        name: Option<Name>,
        reason: String,
        committed: Vec<Txid>,
    },

    #[error("wallet lock poisoned")]
    LockPoisoned,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RegistrarError {
    /// Map a wallet failure in `stage`.
    pub fn wallet(stage: Stage) -> impl FnOnce(WalletError) -> Self {
        move |source| match source {
            WalletError::InvalidAddress(a) => Self::InvalidAddress(a),
            source => Self::Wallet { stage, source },
        }
    }

    /// Map a ledger, pool or broadcast failure in `stage`.
    pub fn chain(stage: Stage) -> impl FnOnce(ChainError) -> Self {
        move |source| Self::Chain { stage, source }
    }

    /// Turn any error raised after `committed` were sent into `Inconsistent`.
    pub fn after_side_effect(self, stage: Stage, name: Option<&Name>, committed: Vec<Txid>) -> Self {
        match self {
            e @ Self::Inconsistent { .. } => e,
            e => Self::Inconsistent {
                stage,
                name: name.cloned(),
                reason: e.to_string(),
                committed,
            },
        }
    }

    /// Stable identifier for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => match e {
                ValidationError::EmptyName => "empty_name",
                ValidationError::NameTooLong { .. } => "name_too_long",
                ValidationError::ValueTooLong { .. } => "value_too_long",
                ValidationError::SaltTooLong { .. } => "invalid_salt",
                ValidationError::NotACommit => "not_a_commit",
                ValidationError::CommitmentMismatch => "commitment_mismatch",
                ValidationError::UnsupportedNamespace => "unsupported_namespace",
                ValidationError::NonUtf8Name => "non_utf8_name",
                ValidationError::DelegateNameUnavailable { .. } => "delegate_unavailable",
                ValidationError::NoInputs
                | ValidationError::NoOutputs
                | ValidationError::MultipleNameOutputs(_) => "malformed_transaction",
            },
            Self::Decode(_) => "decode_failed",
            Self::InvalidAddress(_) => "invalid_address",
            Self::InvalidAmount => "invalid_amount",
            Self::NameExists(_) => "name_exists",
            Self::NameActive(_) => "name_active",
            Self::NameBeingRegistered(_) => "name_being_registered",
            Self::TooManyPending { .. } => "too_many_pending",
            Self::NotUpdatable(_) => "not_updatable",
            Self::NameNotFound(_) => "name_not_found",
            Self::NameExpired(_) => "name_expired",
            Self::CommitNotFound(_) => "commit_not_found",
            Self::AmbiguousCommit { .. } => "ambiguous_commit",
            Self::CommitOutputMissing(_) => "commit_output_missing",
            Self::SaltUnavailable(_) => "salt_unavailable",
            Self::DerivedSaltMismatch(_) => "derived_salt_mismatch",
            Self::InvalidTransaction { .. } => "invalid_transaction",
            Self::NotQueued(_) => "not_queued",
            Self::Wallet { source, .. } => match source {
                WalletError::KeypoolExhausted => "keypool_exhausted",
                WalletError::InsufficientFunds(_) => "insufficient_funds",
                WalletError::Locked => "wallet_locked",
                WalletError::InvalidAddress(_) => "invalid_address",
                WalletError::SigningFailed(_) => "signing_failed",
                WalletError::Backend(_) => "wallet_backend",
            },
            Self::Chain { source, .. } => match source {
                ChainError::Unavailable(_) => "chain_unavailable",
                ChainError::Rejected(_) => "transaction_rejected",
            },
            Self::Store(_) => "store_failed",
            Self::InitialDownload => "initial_download",
            Self::Inconsistent { .. } => "inconsistent_state",
            Self::LockPoisoned => "lock_poisoned",
            Self::Config(_) => "invalid_config",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(ValidationError::NotACommit)
            | Self::Validation(ValidationError::CommitmentMismatch) => ErrorClass::Conflict,
            Self::Validation(_)
            | Self::Decode(_)
            | Self::InvalidAddress(_)
            | Self::InvalidAmount
            | Self::InvalidTransaction { .. }
            | Self::Config(_) => ErrorClass::InvalidInput,
            Self::NameExists(_)
            | Self::NameActive(_)
            | Self::NameBeingRegistered(_)
            | Self::TooManyPending { .. }
            | Self::NotUpdatable(_)
            | Self::NameNotFound(_)
            | Self::NameExpired(_)
            | Self::CommitNotFound(_)
            | Self::AmbiguousCommit { .. }
            | Self::CommitOutputMissing(_)
            | Self::SaltUnavailable(_)
            | Self::DerivedSaltMismatch(_)
            | Self::NotQueued(_) => ErrorClass::Conflict,
            Self::Wallet { .. } | Self::Chain { .. } | Self::Store(_) | Self::InitialDownload => {
                ErrorClass::Resource
            }
            Self::Inconsistent { .. } | Self::LockPoisoned => ErrorClass::Inconsistent,
        }
    }

    /// Whether the same call may succeed later with unchanged arguments.
    ///
    /// Wallet shortages count: the operator can refill the keypool, add
    /// funds or unlock the wallet and try again. Nothing is retried
    /// internally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Chain {
                source: ChainError::Unavailable(_),
                ..
            } | Self::Wallet {
                source: WalletError::KeypoolExhausted
                    | WalletError::InsufficientFunds(_)
                    | WalletError::Locked,
                ..
            } | Self::Store(StoreError::Unavailable(_))
                | Self::InitialDownload
                | Self::TooManyPending { .. }
        )
    }
}

/// Result type for registrar operations.
pub type Result<T> = std::result::Result<T, RegistrarError>;
