//! The UTXO transaction shape the registrar builds, queues and persists.

use bytes::Bytes;
use std::fmt;

use crate::canonical::{canonical_bytes, canonical_txid_bytes, decode_transaction};
use crate::error::CoreError;
use crate::nameop::NameOp;
use crate::script::Script;
use crate::types::{Amount, Txid};

/// Sequence number of an input that opts out of relative locking.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl OutPoint {
    pub const fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub sequence: u32,
    /// Signature data. Not covered by the txid.
    pub witness: Bytes,
}

impl TxIn {
    /// An unsigned input spending `prevout`.
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            sequence: SEQUENCE_FINAL,
            witness: Bytes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub amount: Amount,
    pub script: Script,
    pub name_op: Option<NameOp>,
}

impl TxOut {
    /// A plain currency output.
    pub fn new(amount: Amount, script: Script) -> Self {
        Self {
            amount,
            script,
            name_op: None,
        }
    }

    /// An output carrying a name operation.
    pub fn with_name_op(amount: Amount, script: Script, op: NameOp) -> Self {
        Self {
            amount,
            script,
            name_op: Some(op),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// Transaction format version produced by this crate.
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Blake3 of the canonical encoding without witnesses.
    pub fn txid(&self) -> Txid {
        Txid(*blake3::hash(&canonical_txid_bytes(self)).as_bytes())
    }

    /// The first output carrying a name operation, with its index.
    pub fn name_output(&self) -> Option<(u32, &TxOut)> {
        self.outputs
            .iter()
            .enumerate()
            .find(|(_, out)| out.name_op.is_some())
            .map(|(i, out)| (i as u32, out))
    }

    pub fn name_output_count(&self) -> usize {
        self.outputs.iter().filter(|o| o.name_op.is_some()).count()
    }

    /// Previous outputs spent by this transaction.
    pub fn prevouts(&self) -> impl Iterator<Item = &OutPoint> {
        self.inputs.iter().map(|i| &i.prevout)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        canonical_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        decode_transaction(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s.trim())?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::Commitment;
    use crate::crypto::Keypair;

    fn sample() -> Transaction {
        let key = Keypair::from_seed(&[3; 32]).public_key();
        Transaction::new(
            vec![TxIn::new(OutPoint::new(Txid::from_bytes([9; 32]), 1))],
            vec![
                TxOut::new(5_000, Script::pay_to_key(&key)),
                TxOut::with_name_op(
                    1_000_000,
                    Script::pay_to_key(&key),
                    NameOp::New {
                        commitment: Commitment::from_bytes([4; 20]),
                    },
                ),
            ],
        )
    }

    #[test]
    fn test_txid_ignores_witness() {
        let unsigned = sample();
        let mut signed = unsigned.clone();
        signed.inputs[0].witness = Bytes::from_static(b"signature");
        assert_eq!(unsigned.txid(), signed.txid());
        assert_ne!(unsigned.to_bytes(), signed.to_bytes());
    }

    #[test]
    fn test_txid_covers_outputs() {
        let a = sample();
        let mut b = a.clone();
        b.outputs[0].amount += 1;
        assert_ne!(a.txid(), b.txid());
    }

    #[test]
    fn test_name_output_lookup() {
        let tx = sample();
        let (vout, out) = tx.name_output().unwrap();
        assert_eq!(vout, 1);
        assert_eq!(out.amount, 1_000_000);
        assert_eq!(tx.name_output_count(), 1);
    }

    #[test]
    fn test_hex_roundtrip() {
        let mut tx = sample();
        tx.inputs[0].witness = Bytes::from_static(&[1, 2, 3]);
        let recovered = Transaction::from_hex(&tx.to_hex()).unwrap();
        assert_eq!(tx, recovered);
    }

    #[test]
    fn test_outpoint_display() {
        let op = OutPoint::new(Txid::from_bytes([0xab; 32]), 7);
        assert!(op.to_string().ends_with(":7"));
    }
}
