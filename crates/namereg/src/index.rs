//! Index of the wallet's unspent commits.
//!
//! Reveal has to find the `New` output a name was committed in. Instead of
//! rescanning every wallet transaction per lookup, the index remembers each
//! commit output by commitment and only looks at transactions it has not seen
//! before. Outputs spent by a later wallet transaction drop out.

use std::collections::{BTreeSet, HashMap, HashSet};

use namereg_core::{
    derive_salt, Commitment, Name, NameOp, OutPoint, Salt, Script, Txid, Wallet,
};

use crate::error::{RegistrarError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedCommit {
    outpoint: OutPoint,
    script: Script,
}

#[derive(Debug, Default)]
pub struct CommitmentIndex {
    by_commitment: HashMap<Commitment, Vec<IndexedCommit>>,
    seen: HashSet<Txid>,
}

impl CommitmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed commit outputs.
    pub fn len(&self) -> usize {
        self.by_commitment.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a commit output directly.
    pub fn insert(&mut self, commitment: Commitment, outpoint: OutPoint, script: Script) {
        let entries = self.by_commitment.entry(commitment).or_default();
        if !entries.iter().any(|e| e.outpoint == outpoint) {
            entries.push(IndexedCommit { outpoint, script });
        }
    }

    /// Forget a commit output, e.g. after revealing it.
    pub fn remove(&mut self, outpoint: &OutPoint) {
        self.by_commitment.retain(|_, entries| {
            entries.retain(|e| e.outpoint != *outpoint);
            !entries.is_empty()
        });
    }

    /// Pick up wallet transactions added since the last refresh.
    pub fn refresh<W: Wallet + ?Sized>(&mut self, wallet: &W) {
        let fresh: Vec<_> = wallet
            .transactions()
            .into_iter()
            .filter(|wtx| wtx.depth >= 0 && !self.seen.contains(&wtx.tx.txid()))
            .collect();

        for wtx in &fresh {
            let txid = wtx.tx.txid();
            self.seen.insert(txid);
            if wtx.tx.name_output_count() > 1 {
                tracing::error!(txid = %txid, "wallet contains a transaction with several name outputs");
            }
            if let Some((vout, out)) = wtx.tx.name_output() {
                if let Some(NameOp::New { commitment }) = &out.name_op {
                    self.insert(*commitment, OutPoint::new(txid, vout), out.script.clone());
                }
            }
        }
        for wtx in &fresh {
            for prevout in wtx.tx.prevouts() {
                self.remove(prevout);
            }
        }
    }

    /// The txid of the single commit `name` opens.
    ///
    /// With `salt` the commitment is looked up directly. Without, the salt is
    /// derived for each indexed destination script the wallet holds a key for.
    pub fn find<W: Wallet + ?Sized>(
        &self,
        wallet: &W,
        name: &Name,
        salt: Option<&Salt>,
    ) -> Result<Txid> {
        let mut candidates = BTreeSet::new();
        match salt {
            Some(salt) => {
                if let Some(entries) = self.by_commitment.get(&Commitment::compute(salt, name)) {
                    candidates.extend(entries.iter().map(|e| e.outpoint.txid));
                }
            }
            None => {
                let scripts: HashSet<&Script> = self
                    .by_commitment
                    .values()
                    .flatten()
                    .map(|e| &e.script)
                    .collect();
                for script in scripts {
                    let Some(key) = wallet.signing_key(script) else {
                        continue;
                    };
                    let commitment = Commitment::compute(&derive_salt(&key, name), name);
                    if let Some(entries) = self.by_commitment.get(&commitment) {
                        candidates.extend(
                            entries
                                .iter()
                                .filter(|e| e.script == *script)
                                .map(|e| e.outpoint.txid),
                        );
                    }
                }
            }
        }

        let mut candidates: Vec<Txid> = candidates.into_iter().collect();
        match candidates.len() {
            0 => Err(RegistrarError::CommitNotFound(name.clone())),
            1 => Ok(candidates.remove(0)),
            _ => Err(RegistrarError::AmbiguousCommit {
                name: name.clone(),
                candidates,
            }),
        }
    }
}
