//! Updates: pending chains, value inheritance and the chain cap.

mod common;

use namereg::core::{NameIndex, NameOp, PendingPool, Transaction};
use namereg::{
    CommitOptions, ErrorClass, Name, RegistrarConfig, RegistrarError, RevealRequest,
    UpdateRequest, Value, WriteOptions,
};
use namereg::store::MemoryQueueStore;
use namereg_testkit::{TestFixture, TestWallet, FIRST_UPDATE_DEPTH};

use common::{registrar, registrar_with};

fn sent(fixture: &TestFixture, txid: &namereg::Txid) -> Transaction {
    fixture
        .chain
        .mempool()
        .into_iter()
        .find(|tx| tx.txid() == *txid)
        .unwrap()
}

fn written_value(tx: &Transaction) -> Value {
    match &tx.name_output().unwrap().1.name_op {
        Some(NameOp::Update { value, .. }) => value.clone(),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_update_confirmed_name() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("d/mine");
    let outpoint =
        fixture
            .chain
            .insert_name(&name, &Value::from("v1"), &fixture.wallet.new_script());

    let txid = registrar
        .update(&UpdateRequest::new(name.clone(), Some(Value::from("v2"))))
        .unwrap();
    let tx = sent(&fixture, &txid);
    assert!(tx.prevouts().any(|p| *p == outpoint));
    assert_eq!(written_value(&tx), Value::from("v2"));

    fixture.chain.mine_block();
    let record = fixture.chain.get_name(&name).unwrap().unwrap();
    assert_eq!(record.value, Value::from("v2"));
}

#[test]
fn test_value_is_inherited() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("d/keep");
    fixture
        .chain
        .insert_name(&name, &Value::from("ledger"), &fixture.wallet.new_script());

    // from the ledger record
    let first = registrar
        .update(&UpdateRequest::new(name.clone(), None))
        .unwrap();
    assert_eq!(written_value(&sent(&fixture, &first)), Value::from("ledger"));

    let second = registrar
        .update(&UpdateRequest::new(name.clone(), Some(Value::from("pending"))))
        .unwrap();
    let second_tx = sent(&fixture, &second);
    assert!(second_tx.prevouts().any(|p| p.txid == first));

    // from the newest pending output
    let third = registrar
        .update(&UpdateRequest::new(name.clone(), None))
        .unwrap();
    let third_tx = sent(&fixture, &third);
    assert!(third_tx.prevouts().any(|p| p.txid == second));
    assert_eq!(written_value(&third_tx), Value::from("pending"));
}

#[test]
fn test_chain_cap() {
    let fixture = TestFixture::new();
    let limit = 5;
    let config = RegistrarConfig {
        name_chain_limit: limit,
        ..RegistrarConfig::default()
    };
    let registrar = registrar_with(&fixture, MemoryQueueStore::new(), config);
    let name = Name::from("d/busy");
    fixture
        .chain
        .insert_name(&name, &Value::from("0"), &fixture.wallet.new_script());

    registrar
        .update(&UpdateRequest::new(name.clone(), Some(Value::from("1"))))
        .unwrap();
    assert_eq!(fixture.chain.pending_chain_length(&name), 1);

    for i in 0..limit - 1 {
        let value = Value::from(format!("v{}", i));
        registrar
            .update(&UpdateRequest::new(name.clone(), Some(value)))
            .unwrap();
    }
    assert_eq!(fixture.chain.pending_chain_length(&name), limit);

    let err = registrar
        .update(&UpdateRequest::new(name.clone(), Some(Value::from("over"))))
        .unwrap_err();
    match &err {
        RegistrarError::TooManyPending { pending, limit: l, .. } => {
            assert_eq!(*pending, limit);
            assert_eq!(*l, limit);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert!(err.is_retryable());

    // a block clears the pending chain
    fixture.chain.mine_block();
    registrar
        .update(&UpdateRequest::new(name, Some(Value::from("after"))))
        .unwrap();
}

#[test]
fn test_not_updatable() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);

    let err = registrar
        .update(&UpdateRequest::new("d/nobody", Some(Value::from("x"))))
        .unwrap_err();
    assert!(matches!(err, RegistrarError::NotUpdatable(_)));

    let name = Name::from("d/stale");
    fixture
        .chain
        .insert_name(&name, &Value::from("x"), &fixture.wallet.new_script());
    fixture.chain.expire(&name);
    let err = registrar
        .update(&UpdateRequest::new(name, None))
        .unwrap_err();
    assert_eq!(err.code(), "not_updatable");
}

#[test]
fn test_inherited_value_is_bounded() {
    let fixture = TestFixture::new();
    let config = RegistrarConfig {
        max_value_length: 4,
        ..RegistrarConfig::default()
    };
    let registrar = registrar_with(&fixture, MemoryQueueStore::new(), config);
    let name = Name::from("d/big");
    fixture
        .chain
        .insert_name(&name, &Value::from("too big"), &fixture.wallet.new_script());

    let err = registrar
        .update(&UpdateRequest::new(name.clone(), None))
        .unwrap_err();
    assert_eq!(err.code(), "value_too_long");

    let err = registrar
        .update(&UpdateRequest::new(name.clone(), Some(Value::from("12345"))))
        .unwrap_err();
    assert_eq!(err.code(), "value_too_long");
    assert!(fixture.chain.mempool().is_empty());

    // exactly at the bound
    let txid = registrar
        .update(&UpdateRequest::new(name, Some(Value::from("1234"))))
        .unwrap();
    assert_eq!(written_value(&sent(&fixture, &txid)), Value::from("1234"));
}

#[test]
fn test_transfer_to_other_wallet() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let other = fixture.other_wallet(7);

    let name = Name::from("d/moving");
    let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);
    registrar
        .reveal(&RevealRequest::new(name.clone(), "here").commit_txid(commit.txid))
        .unwrap();
    fixture.chain.mine_block();

    let destination = other.new_address();
    let request = UpdateRequest::new(name.clone(), None)
        .write(WriteOptions::to_address(destination.clone()));
    registrar.update(&request).unwrap();
    fixture.chain.mine_block();

    let record = fixture.chain.get_name(&name).unwrap().unwrap();
    assert_eq!(TestWallet::address_of(&record.script), destination);
    assert_eq!(record.value, Value::from("here"));
}
