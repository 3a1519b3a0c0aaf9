//! Proptest generators for property-based testing.

use proptest::prelude::*;

use namereg_core::{
    Commitment, Ed25519PublicKey, Keypair, Name, NameOp, OutPoint, Salt, Script, Transaction,
    TxIn, TxOut, Txid, Value, SALT_LENGTH,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

pub fn txid() -> impl Strategy<Value = Txid> {
    any::<[u8; 32]>().prop_map(Txid::from_bytes)
}

/// Arbitrary name bytes, 1..=max_len.
pub fn name(max_len: usize) -> impl Strategy<Value = Name> {
    prop::collection::vec(any::<u8>(), 1..=max_len).prop_map(Name::from)
}

/// Names in the delegating namespaces, e.g. `d/abc` or `id/x-1`.
pub fn delegatable_name() -> impl Strategy<Value = Name> {
    ("(d|id)", "[a-z][a-z0-9-]{0,15}").prop_map(|(ns, label)| Name::from(format!("{}/{}", ns, label)))
}

/// Arbitrary value bytes, 0..=max_len.
pub fn value(max_len: usize) -> impl Strategy<Value = Value> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Value::from)
}

/// Salts of any accepted length.
pub fn salt() -> impl Strategy<Value = Salt> {
    prop::collection::vec(any::<u8>(), 0..=SALT_LENGTH)
        .prop_map(|b| Salt::from_bytes(&b).expect("length is in range"))
}

pub fn script() -> impl Strategy<Value = Script> {
    prop_oneof![
        public_key().prop_map(|k| Script::pay_to_key(&k)),
        prop::collection::vec(public_key(), 1..4)
            .prop_map(|keys| Script::multisig(keys.len() as u8, &keys)),
    ]
}

pub fn name_op() -> impl Strategy<Value = NameOp> {
    prop_oneof![
        any::<[u8; 20]>().prop_map(|c| NameOp::New {
            commitment: Commitment::from_bytes(c)
        }),
        (name(64), value(128), salt())
            .prop_map(|(name, value, salt)| NameOp::FirstUpdate { name, value, salt }),
        (name(64), value(128)).prop_map(|(name, value)| NameOp::Update { name, value }),
    ]
}

pub fn tx_in() -> impl Strategy<Value = TxIn> {
    (txid(), any::<u32>(), any::<u32>(), prop::collection::vec(any::<u8>(), 0..80)).prop_map(
        |(txid, vout, sequence, witness)| TxIn {
            prevout: OutPoint::new(txid, vout),
            sequence,
            witness: witness.into(),
        },
    )
}

pub fn tx_out() -> impl Strategy<Value = TxOut> {
    (any::<u64>(), script(), prop::option::of(name_op())).prop_map(|(amount, script, name_op)| {
        TxOut {
            amount,
            script,
            name_op,
        }
    })
}

/// Transactions of any shape, including structurally invalid ones.
pub fn transaction() -> impl Strategy<Value = Transaction> {
    (
        any::<u32>(),
        prop::collection::vec(tx_in(), 0..4),
        prop::collection::vec(tx_out(), 0..4),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, lock_time)| Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
}
