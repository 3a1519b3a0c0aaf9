//! # Name Registrar Testkit
//!
//! Testing utilities for the name registrar.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known salts and commitments that must never change
//! - **Generators**: Proptest strategies for names, salts, name ops and transactions
//! - **Chain**: An in-memory ledger, pending pool and broadcaster
//! - **Wallet**: An in-memory keypool and coin wallet on top of that chain
//! - **Fixtures**: Ready-made setups and a queue store with injectable failures
//!
//! ## Golden Vectors
//!
//! ```rust
//! use namereg_testkit::vectors::{all_vectors, compute_vector};
//!
//! for vector in all_vectors() {
//!     let (salt, commitment) = compute_vector(&vector);
//!     assert_eq!(salt, vector.expected_salt);
//!     assert_eq!(commitment, vector.expected_commitment);
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use namereg_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.chain.mine_block();
//! ```

pub mod chain;
pub mod fixtures;
pub mod generators;
pub mod vectors;
pub mod wallet;

pub use chain::{TestChain, EXPIRATION_DEPTH, FIRST_UPDATE_DEPTH, NAME_AMOUNT};
pub use fixtures::{FailingQueueStore, TestFixture};
pub use vectors::{all_vectors, compute_vector, verify_all_vectors, GoldenVector};
pub use wallet::{TestWallet, FEE};
