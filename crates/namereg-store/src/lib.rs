//! # Name Registrar Store
//!
//! Persistence for the deferred transaction queue, the only state the
//! registrar keeps across restarts. Entries are keyed by txid and hold the
//! canonical bytes of the signed transaction plus its maturity metadata.
//!
//! ## Key Types
//!
//! - [`QueueStore`] - The storage trait the registrar is generic over
//! - [`SqliteQueueStore`] - SQLite-backed persistent queue
//! - [`MemoryQueueStore`] - In-memory queue for tests
//! - [`PutResult`] - Result of queueing an entry
//!
//! ## Usage
//!
//! ```rust,no_run
//! use namereg_store::{QueueStore, SqliteQueueStore};
//!
//! let store = SqliteQueueStore::open("queue.db").unwrap();
//! for (txid, entry) in store.list().unwrap() {
//!     println!("{} waits on {:?}", txid, entry.maturity);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent puts**: Queueing the same txid twice returns `AlreadyQueued`
//! - **Self-verifying rows**: Loaded bytes must decode to the stored txid

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryQueueStore;
pub use sqlite::SqliteQueueStore;
pub use traits::{PutResult, QueueStore};
