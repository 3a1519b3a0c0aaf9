//! Transactions held back from broadcast.

use crate::canonical::canonical_bytes;
use crate::transaction::Transaction;
use crate::types::Txid;

/// The confirmation depth a queued transaction waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maturity {
    /// The transaction whose confirmations gate release, usually a commit.
    pub depends_on: Txid,
    /// Confirmations `depends_on` needs before release.
    pub depth: u32,
}

impl Maturity {
    pub const fn new(depends_on: Txid, depth: u32) -> Self {
        Self { depends_on, depth }
    }

    /// Whether `confirmations` of the dependency satisfy this maturity.
    pub fn is_satisfied(&self, confirmations: Option<u32>) -> bool {
        confirmations.map_or(false, |c| c >= self.depth)
    }
}

/// A signed transaction in the deferred queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTransaction {
    pub txid: Txid,
    pub tx: Transaction,
    /// `None` means the entry may be released at any time.
    pub maturity: Option<Maturity>,
    /// Unix timestamp in milliseconds.
    pub queued_at: i64,
}

impl QueuedTransaction {
    pub fn new(tx: Transaction, maturity: Option<Maturity>, queued_at: i64) -> Self {
        Self {
            txid: tx.txid(),
            tx,
            maturity,
            queued_at,
        }
    }

    /// The canonical bytes persisted for this entry.
    pub fn raw_bytes(&self) -> Vec<u8> {
        canonical_bytes(&self.tx)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.raw_bytes())
    }
}
