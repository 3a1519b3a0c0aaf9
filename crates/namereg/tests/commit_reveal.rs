//! Commit and reveal against the in-memory chain.

mod common;

use namereg::core::{derive_salt, NameIndex, NameOp, Wallet, WalletError, COIN};
use namereg::{
    CommitOptions, ErrorClass, Name, RegistrarError, RevealRequest, Salt, Value, WriteOptions,
};
use namereg_testkit::{TestFixture, TestWallet, FIRST_UPDATE_DEPTH};

use common::registrar;

#[test]
fn test_commit_then_reveal_bob() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("bob");

    let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
    assert!(commit.salt_derived);
    assert_eq!(commit.salt.len(), 20);
    assert!(fixture.chain.in_mempool(&commit.txid));

    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);
    let request = RevealRequest::new("bob", "hello")
        .salt(commit.salt.clone())
        .commit_txid(commit.txid);
    let txid = registrar.reveal(&request).unwrap();

    let reveal = fixture
        .chain
        .mempool()
        .into_iter()
        .find(|tx| tx.txid() == txid)
        .unwrap();
    assert_eq!(reveal.name_output_count(), 1);
    let (_, out) = reveal.name_output().unwrap();
    assert_eq!(
        out.name_op,
        Some(NameOp::FirstUpdate {
            name: name.clone(),
            value: Value::from("hello"),
            salt: commit.salt.clone(),
        })
    );
    assert!(reveal.prevouts().any(|p| *p == commit.outpoint));

    fixture.chain.mine_block();
    let record = fixture.chain.get_name(&name).unwrap().unwrap();
    assert_eq!(record.value, Value::from("hello"));
    assert!(fixture.wallet.is_mine(&record.script));
}

#[test]
fn test_reveal_finds_commit_and_salt() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("d/lookup");

    let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);

    // neither salt nor txid: both come from the wallet
    let txid = registrar
        .reveal(&RevealRequest::new(name.clone(), "v"))
        .unwrap();
    let reveal = fixture
        .chain
        .mempool()
        .into_iter()
        .find(|tx| tx.txid() == txid)
        .unwrap();
    match &reveal.name_output().unwrap().1.name_op {
        Some(NameOp::FirstUpdate { salt, .. }) => assert_eq!(*salt, commit.salt),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_commit_salt_is_derived_from_destination() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("id/alice");

    let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
    let tx = fixture.wallet.get_transaction(&commit.txid).unwrap().tx;
    let script = &tx.outputs[commit.outpoint.vout as usize].script;
    let key = fixture.wallet.signing_key(script).unwrap();
    assert_eq!(derive_salt(&key, &name), commit.salt);
}

#[test]
fn test_second_commit_before_activation() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("bob");

    let first = registrar.commit(&name, &CommitOptions::default()).unwrap();
    let second = registrar.commit(&name, &CommitOptions::default()).unwrap();
    assert_ne!(first.txid, second.txid);
    assert_ne!(first.salt, second.salt);

    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);
    let err = registrar
        .reveal(&RevealRequest::new(name.clone(), "x"))
        .unwrap_err();
    match err {
        RegistrarError::AmbiguousCommit { candidates, .. } => {
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("unexpected {:?}", other),
    }

    // the salt picks one of them
    registrar
        .reveal(&RevealRequest::new(name, "x").salt(second.salt))
        .unwrap();
}

#[test]
fn test_reveal_before_maturity_returns_key() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("d/early");

    let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH - 1);

    let keypool = fixture.wallet.keypool_len();
    let err = registrar
        .reveal(&RevealRequest::new(name, "v").commit_txid(commit.txid))
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Chain { .. }));
    assert_eq!(err.class(), ErrorClass::Resource);
    assert_eq!(fixture.wallet.keypool_len(), keypool);
    assert_eq!(fixture.wallet.reserved_count(), 0);
}

#[test]
fn test_wrong_salt() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("d/salty");

    let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);
    let wrong = Salt::from_bytes(&[7; 20]).unwrap();

    let err = registrar
        .reveal(
            &RevealRequest::new(name.clone(), "v")
                .salt(wrong.clone())
                .commit_txid(commit.txid),
        )
        .unwrap_err();
    assert_eq!(err.code(), "commitment_mismatch");
    assert_eq!(err.class(), ErrorClass::Conflict);

    let err = registrar
        .reveal(&RevealRequest::new(name, "v").salt(wrong))
        .unwrap_err();
    assert!(matches!(err, RegistrarError::CommitNotFound(_)));
}

#[test]
fn test_reveal_needs_a_commit() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);

    let err = registrar
        .reveal(&RevealRequest::new("d/never", "v"))
        .unwrap_err();
    assert!(matches!(err, RegistrarError::CommitNotFound(_)));

    // a plain payment is not a commit
    let funding = fixture.wallet.fund(50_000);
    let err = registrar
        .reveal(&RevealRequest::new("d/never", "v").commit_txid(funding.txid))
        .unwrap_err();
    assert!(matches!(err, RegistrarError::CommitOutputMissing(_)));
}

#[test]
fn test_reveal_of_active_name() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("d/taken");

    let commit = registrar.commit(&name, &CommitOptions::default()).unwrap();
    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);
    registrar
        .reveal(&RevealRequest::new(name.clone(), "v").commit_txid(commit.txid))
        .unwrap();

    let again = RevealRequest::new(name.clone(), "w").commit_txid(commit.txid);
    assert!(matches!(
        registrar.reveal(&again),
        Err(RegistrarError::NameBeingRegistered(_))
    ));

    fixture.chain.mine_block();
    assert!(matches!(
        registrar.reveal(&again),
        Err(RegistrarError::NameActive(_))
    ));
}

#[test]
fn test_commit_of_existing_name() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let name = Name::from("d/exists");
    fixture
        .chain
        .insert_name(&name, &Value::from("v"), &fixture.wallet.new_script());

    let err = registrar
        .commit(&name, &CommitOptions::default())
        .unwrap_err();
    assert!(matches!(err, RegistrarError::NameExists(_)));

    let options = CommitOptions {
        allow_existing: true,
        ..CommitOptions::default()
    };
    assert!(registrar.commit(&name, &options).is_ok());

    fixture.chain.expire(&name);
    assert!(registrar.commit(&name, &CommitOptions::default()).is_ok());
}

#[test]
fn test_length_bounds() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);

    let too_long = Name::from("n".repeat(256));
    let err = registrar
        .commit(&too_long, &CommitOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), "name_too_long");
    assert_eq!(err.class(), ErrorClass::InvalidInput);
    assert!(fixture.chain.mempool().is_empty());

    let longest = Name::from("n".repeat(255));
    let commit = registrar
        .commit(&longest, &CommitOptions::default())
        .unwrap();
    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);

    let err = registrar
        .reveal(&RevealRequest::new(longest.clone(), vec![b'v'; 521]).commit_txid(commit.txid))
        .unwrap_err();
    assert_eq!(err.code(), "value_too_long");

    registrar
        .reveal(&RevealRequest::new(longest, vec![b'v'; 520]).commit_txid(commit.txid))
        .unwrap();
}

#[test]
fn test_dest_address_override() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let other = fixture.other_wallet(9);
    let address = other.new_address();
    let keypool = fixture.wallet.keypool_len();

    let options = CommitOptions {
        allow_existing: false,
        write: WriteOptions::to_address(address.clone()),
    };
    let commit = registrar.commit(&Name::from("d/gift"), &options).unwrap();
    // no key on our side for that destination
    assert!(!commit.salt_derived);
    assert_eq!(fixture.wallet.keypool_len(), keypool);

    let tx = fixture.wallet.get_transaction(&commit.txid).unwrap().tx;
    let script = &tx.outputs[commit.outpoint.vout as usize].script;
    assert_eq!(TestWallet::address_of(script), address);
}

#[test]
fn test_salt_unavailable_for_foreign_script() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let other = fixture.other_wallet(4);
    let script = other.new_script();

    let options = CommitOptions {
        allow_existing: false,
        write: WriteOptions::to_address(TestWallet::address_of(&script)),
    };
    let name = Name::from("d/foreign");
    let commit = registrar.commit(&name, &options).unwrap();
    fixture.chain.mine_blocks(FIRST_UPDATE_DEPTH);

    let err = registrar
        .reveal(&RevealRequest::new(name, "v").commit_txid(commit.txid))
        .unwrap_err();
    assert!(matches!(err, RegistrarError::SaltUnavailable(_)));
}

#[test]
fn test_send_coins_ride_along() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    let payee = fixture.other_wallet(5).new_script();

    let options = CommitOptions {
        allow_existing: false,
        write: WriteOptions {
            dest_address: None,
            send_coins: vec![(TestWallet::address_of(&payee), 12_345)],
        },
    };
    let commit = registrar.commit(&Name::from("d/pay"), &options).unwrap();
    let tx = fixture.wallet.get_transaction(&commit.txid).unwrap().tx;
    assert!(tx
        .outputs
        .iter()
        .any(|o| o.script == payee && o.amount == 12_345 && o.name_op.is_none()));
}

#[test]
fn test_wallet_failures() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);

    fixture.wallet.set_locked(true);
    let err = registrar
        .commit(&Name::from("d/locked"), &CommitOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrarError::Wallet {
            source: WalletError::Locked,
            ..
        }
    ));
    fixture.wallet.set_locked(false);

    let empty = TestFixture::funded(&[]);
    let broke = common::registrar(&empty);
    let err = broke
        .commit(&Name::from("d/broke"), &CommitOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
    assert!(err.is_retryable());
    assert_eq!(empty.wallet.reserved_count(), 0);
}

#[test]
fn test_keypool_exhaustion() {
    let fixture = TestFixture::new();
    let chain = fixture.chain.clone();
    let wallet = TestWallet::with_keypool(chain.clone(), 2, 0);
    wallet.fund(COIN);
    let drained = TestFixture { chain, wallet };
    let registrar = registrar(&drained);

    let err = registrar
        .commit(&Name::from("d/nokeys"), &CommitOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), "keypool_exhausted");
    assert!(err.is_retryable());
}

#[test]
fn test_inconsistent_when_wallet_record_fails() {
    let fixture = TestFixture::new();
    let registrar = registrar(&fixture);
    fixture.wallet.fail_commits(true);

    let err = registrar
        .commit(&Name::from("d/half"), &CommitOptions::default())
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Inconsistent);
    match err {
        RegistrarError::Inconsistent { committed, .. } => {
            assert!(fixture.chain.in_mempool(&committed[0]));
        }
        other => panic!("unexpected {:?}", other),
    }
    // the broadcast transaction pays the reserved key, so it is kept
    assert_eq!(fixture.wallet.kept_count(), 1);
}
