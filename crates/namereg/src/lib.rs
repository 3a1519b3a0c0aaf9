//! # Name Registrar
//!
//! The unified API for registering names on a UTXO ledger with a two-phase
//! commit-reveal protocol.
//!
//! ## Overview
//!
//! The registrar provides:
//!
//! - **Commit**: Publish a blinded commitment to a name, so observers cannot
//!   front-run the registration
//! - **Reveal**: Open the commitment once it has matured, activating the name
//! - **Update**: Write a new value or move a name, following pending chains
//! - **Deferred queue**: Hold signed transactions until they may be broadcast
//! - **Auto-registration**: Commit now, queue the reveal, optionally with a
//!   delegate name carrying the real value
//!
//! ## Key Concepts
//!
//! - **Salt**: Derived from the destination key and the name, so nothing has
//!   to be stored between commit and reveal
//! - **Maturity**: A queued reveal waits for its commit's confirmations
//! - **Wallet lock**: Reservation, signing and queue writes are serialized
//!
//! ## Usage
//!
//! ```rust,no_run
//! use namereg::{ChainBackends, CommitOptions, Registrar, RegistrarConfig, RevealRequest};
//! use namereg::core::Name;
//! use namereg::store::SqliteQueueStore;
//! use namereg_testkit::{TestChain, TestWallet};
//!
//! let chain = TestChain::new();
//! let wallet = TestWallet::new(chain.clone());
//! let store = SqliteQueueStore::open("queue.db").unwrap();
//! let registrar = Registrar::new(
//!     wallet,
//!     store,
//!     ChainBackends::shared(chain.clone()),
//!     RegistrarConfig::default(),
//! )
//! .unwrap();
//!
//! let name = Name::from("d/example");
//! let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
//!
//! // ... twelve blocks later
//! let reveal = RevealRequest::new(name, "hello").commit_txid(commit.txid);
//! registrar.reveal(&reveal).unwrap();
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `namereg::core` - Core primitives (Name, Salt, Commitment, Transaction, etc.)
//! - `namereg::store` - Queue storage abstraction and SQLite

pub mod autoregister;
pub mod commit_reveal;
pub mod config;
pub mod destination;
pub mod error;
pub mod index;
pub mod listing;
pub mod options;
pub mod queue;
pub mod registrar;
pub mod update;

// Re-export component crates
pub use namereg_core as core;
pub use namereg_store as store;

// Re-export main types for convenience
pub use config::RegistrarConfig;
pub use destination::DestinationResolver;
pub use error::{ErrorClass, RegistrarError, Result, Stage};
pub use index::CommitmentIndex;
pub use options::{
    AutoRegisterOptions, AutoRegistration, CommitOptions, CommitOutcome, EnqueueOutcome,
    NameEntry, ReleaseReport, RevealRequest, UpdateRequest, WriteOptions,
};
pub use queue::DeferredQueue;
pub use registrar::{ChainBackends, Registrar};
pub use update::UpdateInput;

// Re-export commonly used core types
pub use namereg_core::{
    Commitment, Maturity, Name, NameOp, QueuedTransaction, Salt, Transaction, Txid, Value,
};
