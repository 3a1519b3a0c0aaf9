//! Canonical CBOR encoding for transactions.
//!
//! RFC 8949 Core Deterministic Encoding:
//! - Integer map keys, written in ascending order
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats, no tags
//!
//! The same transaction always produces identical bytes, so txids are stable
//! and the raw bytes persisted by the deferred queue decode back unchanged.
//! Decoding goes through `ciborium` and then re-encodes; any input that is
//! not byte-identical to its re-encoding is rejected as non-canonical.

use bytes::Bytes;
use ciborium::value::Value;

use crate::commitment::{Commitment, Salt};
use crate::error::CoreError;
use crate::nameop::{NameOp, NameOpKind};
use crate::script::Script;
use crate::transaction::{OutPoint, Transaction, TxIn, TxOut};
use crate::types::{Name, Txid, Value as NameValue};

/// Map keys. Keys 0-23 encode as single bytes.
mod keys {
    pub mod tx {
        pub const VERSION: u64 = 0;
        pub const INPUTS: u64 = 1;
        pub const OUTPUTS: u64 = 2;
        pub const LOCK_TIME: u64 = 3;
    }

    pub mod input {
        pub const TXID: u64 = 0;
        pub const VOUT: u64 = 1;
        pub const SEQUENCE: u64 = 2;
        pub const WITNESS: u64 = 3;
    }

    pub mod output {
        pub const AMOUNT: u64 = 0;
        pub const SCRIPT: u64 = 1;
        pub const NAME_OP: u64 = 2;
    }

    pub mod name_op {
        pub const KIND: u64 = 0;
        pub const COMMITMENT: u64 = 1;
        pub const NAME: u64 = 2;
        pub const VALUE: u64 = 3;
        pub const SALT: u64 = 4;
    }
}

const MAJOR_UINT: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const NULL: u8 = 0xf6;

/// Encode a full transaction, witnesses included.
pub fn canonical_bytes(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    encode_transaction(&mut buf, tx, true);
    buf
}

/// Encode a transaction without witnesses. This is the txid preimage.
pub fn canonical_txid_bytes(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    encode_transaction(&mut buf, tx, false);
    buf
}

fn encode_transaction(buf: &mut Vec<u8>, tx: &Transaction, with_witness: bool) {
    encode_uint(buf, MAJOR_MAP, 4);

    encode_uint(buf, MAJOR_UINT, keys::tx::VERSION);
    encode_uint(buf, MAJOR_UINT, tx.version.into());

    encode_uint(buf, MAJOR_UINT, keys::tx::INPUTS);
    encode_uint(buf, MAJOR_ARRAY, tx.inputs.len() as u64);
    for input in &tx.inputs {
        encode_input(buf, input, with_witness);
    }

    encode_uint(buf, MAJOR_UINT, keys::tx::OUTPUTS);
    encode_uint(buf, MAJOR_ARRAY, tx.outputs.len() as u64);
    for output in &tx.outputs {
        encode_output(buf, output);
    }

    encode_uint(buf, MAJOR_UINT, keys::tx::LOCK_TIME);
    encode_uint(buf, MAJOR_UINT, tx.lock_time.into());
}

fn encode_input(buf: &mut Vec<u8>, input: &TxIn, with_witness: bool) {
    encode_uint(buf, MAJOR_MAP, if with_witness { 4 } else { 3 });

    encode_uint(buf, MAJOR_UINT, keys::input::TXID);
    encode_bytes(buf, input.prevout.txid.as_bytes());

    encode_uint(buf, MAJOR_UINT, keys::input::VOUT);
    encode_uint(buf, MAJOR_UINT, input.prevout.vout.into());

    encode_uint(buf, MAJOR_UINT, keys::input::SEQUENCE);
    encode_uint(buf, MAJOR_UINT, input.sequence.into());

    if with_witness {
        encode_uint(buf, MAJOR_UINT, keys::input::WITNESS);
        encode_bytes(buf, &input.witness);
    }
}

fn encode_output(buf: &mut Vec<u8>, output: &TxOut) {
    encode_uint(buf, MAJOR_MAP, 3);

    encode_uint(buf, MAJOR_UINT, keys::output::AMOUNT);
    encode_uint(buf, MAJOR_UINT, output.amount);

    encode_uint(buf, MAJOR_UINT, keys::output::SCRIPT);
    encode_bytes(buf, output.script.as_bytes());

    encode_uint(buf, MAJOR_UINT, keys::output::NAME_OP);
    match &output.name_op {
        Some(op) => encode_name_op(buf, op),
        None => buf.push(NULL),
    }
}

fn encode_name_op(buf: &mut Vec<u8>, op: &NameOp) {
    match op {
        NameOp::New { commitment } => {
            encode_uint(buf, MAJOR_MAP, 2);
            encode_uint(buf, MAJOR_UINT, keys::name_op::KIND);
            encode_uint(buf, MAJOR_UINT, NameOpKind::New.to_u8().into());
            encode_uint(buf, MAJOR_UINT, keys::name_op::COMMITMENT);
            encode_bytes(buf, commitment.as_bytes());
        }
        NameOp::FirstUpdate { name, value, salt } => {
            encode_uint(buf, MAJOR_MAP, 4);
            encode_uint(buf, MAJOR_UINT, keys::name_op::KIND);
            encode_uint(buf, MAJOR_UINT, NameOpKind::FirstUpdate.to_u8().into());
            encode_uint(buf, MAJOR_UINT, keys::name_op::NAME);
            encode_bytes(buf, name.as_bytes());
            encode_uint(buf, MAJOR_UINT, keys::name_op::VALUE);
            encode_bytes(buf, value.as_bytes());
            encode_uint(buf, MAJOR_UINT, keys::name_op::SALT);
            encode_bytes(buf, salt.as_bytes());
        }
        NameOp::Update { name, value } => {
            encode_uint(buf, MAJOR_MAP, 3);
            encode_uint(buf, MAJOR_UINT, keys::name_op::KIND);
            encode_uint(buf, MAJOR_UINT, NameOpKind::Update.to_u8().into());
            encode_uint(buf, MAJOR_UINT, keys::name_op::NAME);
            encode_bytes(buf, name.as_bytes());
            encode_uint(buf, MAJOR_UINT, keys::name_op::VALUE);
            encode_bytes(buf, value.as_bytes());
        }
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, MAJOR_BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

// ── Decoding ──

/// Decode a transaction from its canonical bytes.
///
/// Rejects trailing data and any encoding that differs from what
/// [`canonical_bytes`] would produce for the decoded transaction.
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, CoreError> {
    if bytes.is_empty() {
        return Err(CoreError::DecodingError("empty input".into()));
    }

    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let tx = value_to_transaction(&value)?;

    if canonical_bytes(&tx) != bytes {
        return Err(CoreError::NonCanonical);
    }
    Ok(tx)
}

fn malformed(what: &str) -> CoreError {
    CoreError::DecodingError(format!("malformed transaction: {}", what))
}

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)], CoreError> {
    match value {
        Value::Map(m) => Ok(m.as_slice()),
        _ => Err(malformed(&format!("{} is not a map", what))),
    }
}

fn field<'a>(map: &'a [(Value, Value)], key: u64) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if u64::try_from(*i).ok() == Some(key)))
        .map(|(_, v)| v)
}

fn uint_field(map: &[(Value, Value)], key: u64, what: &str) -> Result<u64, CoreError> {
    match field(map, key) {
        Some(Value::Integer(i)) => {
            u64::try_from(*i).map_err(|_| malformed(&format!("{} out of range", what)))
        }
        _ => Err(malformed(&format!("missing {}", what))),
    }
}

fn u32_field(map: &[(Value, Value)], key: u64, what: &str) -> Result<u32, CoreError> {
    let n = uint_field(map, key, what)?;
    u32::try_from(n).map_err(|_| malformed(&format!("{} out of range", what)))
}

fn bytes_field<'a>(map: &'a [(Value, Value)], key: u64, what: &str) -> Result<&'a [u8], CoreError> {
    match field(map, key) {
        Some(Value::Bytes(b)) => Ok(b.as_slice()),
        _ => Err(malformed(&format!("missing {}", what))),
    }
}

fn array_field<'a>(map: &'a [(Value, Value)], key: u64, what: &str) -> Result<&'a [Value], CoreError> {
    match field(map, key) {
        Some(Value::Array(a)) => Ok(a.as_slice()),
        _ => Err(malformed(&format!("missing {}", what))),
    }
}

fn value_to_transaction(value: &Value) -> Result<Transaction, CoreError> {
    let map = as_map(value, "transaction")?;

    let version = u32_field(map, keys::tx::VERSION, "version")?;
    let inputs = array_field(map, keys::tx::INPUTS, "inputs")?
        .iter()
        .map(value_to_input)
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = array_field(map, keys::tx::OUTPUTS, "outputs")?
        .iter()
        .map(value_to_output)
        .collect::<Result<Vec<_>, _>>()?;
    let lock_time = u32_field(map, keys::tx::LOCK_TIME, "lock_time")?;

    Ok(Transaction {
        version,
        inputs,
        outputs,
        lock_time,
    })
}

fn value_to_input(value: &Value) -> Result<TxIn, CoreError> {
    let map = as_map(value, "input")?;

    let txid = Txid::try_from(bytes_field(map, keys::input::TXID, "prevout txid")?)
        .map_err(|_| malformed("prevout txid must be 32 bytes"))?;
    let vout = u32_field(map, keys::input::VOUT, "vout")?;
    let sequence = u32_field(map, keys::input::SEQUENCE, "sequence")?;
    let witness = bytes_field(map, keys::input::WITNESS, "witness")?;

    Ok(TxIn {
        prevout: OutPoint::new(txid, vout),
        sequence,
        witness: Bytes::copy_from_slice(witness),
    })
}

fn value_to_output(value: &Value) -> Result<TxOut, CoreError> {
    let map = as_map(value, "output")?;

    let amount = uint_field(map, keys::output::AMOUNT, "amount")?;
    let script = Script::from_bytes(bytes_field(map, keys::output::SCRIPT, "script")?.to_vec());
    let name_op = match field(map, keys::output::NAME_OP) {
        Some(Value::Null) => None,
        Some(op) => Some(value_to_name_op(op)?),
        None => return Err(malformed("missing name_op")),
    };

    Ok(TxOut {
        amount,
        script,
        name_op,
    })
}

fn value_to_name_op(value: &Value) -> Result<NameOp, CoreError> {
    let map = as_map(value, "name_op")?;

    let kind = uint_field(map, keys::name_op::KIND, "name_op kind")?;
    let kind = u8::try_from(kind)
        .ok()
        .and_then(NameOpKind::from_u8)
        .ok_or_else(|| malformed(&format!("unknown name_op kind {}", kind)))?;

    match kind {
        NameOpKind::New => {
            let raw = bytes_field(map, keys::name_op::COMMITMENT, "commitment")?;
            let bytes: [u8; 20] = raw
                .try_into()
                .map_err(|_| malformed("commitment must be 20 bytes"))?;
            Ok(NameOp::New {
                commitment: Commitment::from_bytes(bytes),
            })
        }
        NameOpKind::FirstUpdate => {
            let name = Name::from(bytes_field(map, keys::name_op::NAME, "name")?);
            let value = NameValue::from(bytes_field(map, keys::name_op::VALUE, "value")?.to_vec());
            let salt = Salt::from_bytes(bytes_field(map, keys::name_op::SALT, "salt")?)
                .map_err(|e| CoreError::DecodingError(e.to_string()))?;
            Ok(NameOp::FirstUpdate { name, value, salt })
        }
        NameOpKind::Update => {
            let name = Name::from(bytes_field(map, keys::name_op::NAME, "name")?);
            let value = NameValue::from(bytes_field(map, keys::name_op::VALUE, "value")?.to_vec());
            Ok(NameOp::Update { name, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::types::Value as NameValue;

    fn reveal_tx() -> Transaction {
        let key = Keypair::from_seed(&[0x42; 32]).public_key();
        let mut input = TxIn::new(OutPoint::new(Txid::from_bytes([1; 32]), 0));
        input.witness = Bytes::from_static(&[0xaa; 64]);
        Transaction::new(
            vec![input],
            vec![TxOut::with_name_op(
                1_000_000,
                Script::pay_to_key(&key),
                NameOp::FirstUpdate {
                    name: Name::from("bob"),
                    value: NameValue::from("hello"),
                    salt: Salt::from_bytes(&[0x07; 20]).unwrap(),
                },
            )],
        )
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let tx = reveal_tx();
        assert_eq!(canonical_bytes(&tx), canonical_bytes(&tx.clone()));
    }

    #[test]
    fn test_decode_roundtrip() {
        let tx = reveal_tx();
        let decoded = decode_transaction(&canonical_bytes(&tx)).unwrap();
        assert_eq!(tx, decoded);
    }

    #[test]
    fn test_decode_update_and_plain_outputs() {
        let key = Keypair::from_seed(&[1; 32]).public_key();
        let tx = Transaction::new(
            vec![TxIn::new(OutPoint::new(Txid::from_bytes([2; 32]), 300))],
            vec![
                TxOut::new(u64::MAX, Script::pay_to_key(&key)),
                TxOut::with_name_op(
                    1,
                    Script::pay_to_key(&key),
                    NameOp::Update {
                        name: Name::from(vec![0u8, 255]),
                        value: NameValue::empty(),
                    },
                ),
            ],
        );
        assert_eq!(decode_transaction(&canonical_bytes(&tx)).unwrap(), tx);
    }

    #[test]
    fn test_txid_bytes_exclude_witness() {
        let tx = reveal_tx();
        let full = canonical_bytes(&tx);
        let stripped = canonical_txid_bytes(&tx);
        assert!(stripped.len() < full.len());
        assert!(decode_transaction(&stripped).is_err());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = canonical_bytes(&reveal_tx());
        bytes.push(0x00);
        assert!(matches!(decode_transaction(&bytes), Err(CoreError::NonCanonical)));
    }

    #[test]
    fn test_rejects_non_minimal_integer() {
        // version 1 written as a two-byte uint instead of a single byte
        let mut bytes = canonical_bytes(&reveal_tx());
        assert_eq!(&bytes[..3], &[0xa4, 0x00, 0x01]);
        bytes.splice(2..3, [0x18, 0x01]);
        assert!(matches!(decode_transaction(&bytes), Err(CoreError::NonCanonical)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decode_transaction(&[]).is_err());
        assert!(decode_transaction(&[0xff, 0x00]).is_err());
        assert!(decode_transaction(&[0x01]).is_err());
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 65536);
        assert_eq!(buf, vec![0x1a, 0x00, 0x01, 0x00, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 1 << 32);
        assert_eq!(buf, vec![0x1b, 0, 0, 0, 1, 0, 0, 0, 0]);
    }
}
