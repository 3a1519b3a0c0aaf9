//! Request options and operation results.

use namereg_core::{Amount, Name, OutPoint, Salt, Script, Txid, Value};

/// Options shared by every operation that writes a name output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Send the name output here instead of a fresh keypool address.
    pub dest_address: Option<String>,
    /// Extra payments made by the same transaction.
    pub send_coins: Vec<(String, Amount)>,
}

impl WriteOptions {
    pub fn to_address(address: impl Into<String>) -> Self {
        Self {
            dest_address: Some(address.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Commit even if the name is currently active.
    pub allow_existing: bool,
    pub write: WriteOptions,
}

/// Everything a reveal needs. Only `name` and `value` are mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRequest {
    pub name: Name,
    pub value: Value,
    /// Derived from the commit's destination key when absent.
    pub salt: Option<Salt>,
    /// Looked up in the wallet's commits when absent.
    pub commit_txid: Option<Txid>,
    /// Reveal even if the name is currently active.
    pub allow_active: bool,
    pub write: WriteOptions,
}

impl RevealRequest {
    pub fn new(name: impl Into<Name>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            salt: None,
            commit_txid: None,
            allow_active: false,
            write: WriteOptions::default(),
        }
    }

    pub fn salt(mut self, salt: Salt) -> Self {
        self.salt = Some(salt);
        self
    }

    pub fn commit_txid(mut self, txid: Txid) -> Self {
        self.commit_txid = Some(txid);
        self
    }

    pub fn allow_active(mut self, allow: bool) -> Self {
        self.allow_active = allow;
        self
    }

    pub fn write(mut self, write: WriteOptions) -> Self {
        self.write = write;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub name: Name,
    /// Keeps the current value when absent.
    pub value: Option<Value>,
    pub write: WriteOptions,
}

impl UpdateRequest {
    pub fn new(name: impl Into<Name>, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            value,
            write: WriteOptions::default(),
        }
    }

    pub fn write(mut self, write: WriteOptions) -> Self {
        self.write = write;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoRegisterOptions {
    pub allow_existing: bool,
    /// Register a `dd/` or `idd/` delegate holding the real value.
    pub delegate: bool,
    pub write: WriteOptions,
}

/// A broadcast commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub txid: Txid,
    /// The `New` output.
    pub outpoint: OutPoint,
    /// Needed for the reveal when `salt_derived` is false.
    pub salt: Salt,
    /// Whether the salt can be derived again from the destination key.
    pub salt_derived: bool,
}

/// Result of [`Registrar::auto_register`](crate::Registrar::auto_register).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoRegistration {
    /// The primary commit.
    pub commit: CommitOutcome,
    /// Queued reveals, primary first.
    pub queued: Vec<Txid>,
    /// The synthesized delegate name, if delegation was requested.
    pub delegate: Option<Name>,
}

/// Result of [`Registrar::enqueue`](crate::Registrar::enqueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The transaction was valid right away and has been relayed.
    Broadcast(Txid),
    /// The transaction is held in the deferred queue.
    Queued(Txid),
}

impl EnqueueOutcome {
    pub fn txid(&self) -> Txid {
        match self {
            Self::Broadcast(txid) | Self::Queued(txid) => *txid,
        }
    }
}

/// What one pass of [`Registrar::release_matured`](crate::Registrar::release_matured) did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Broadcast and removed from the queue.
    pub released: Vec<Txid>,
    /// Still queued: immature, or not yet acceptable to the pool.
    pub waiting: Vec<Txid>,
    /// Removed because the pool rejected them for good.
    pub dropped: Vec<(Txid, String)>,
    /// Removed because the ledger already contains them.
    pub confirmed: Vec<Txid>,
}

/// A name owned or once owned by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub name: Name,
    pub value: Value,
    pub outpoint: OutPoint,
    pub script: Script,
    pub height: u64,
    /// Blocks left until expiry, zero or negative once expired.
    pub expires_in: i64,
    pub expired: bool,
    pub is_mine: bool,
}
