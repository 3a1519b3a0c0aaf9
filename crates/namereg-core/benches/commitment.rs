// Salt derivation, commitment and canonical encoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use namereg_core::{
    canonical_bytes, decode_transaction, derive_salt, Commitment, Keypair, Name, NameOp, OutPoint,
    Script, Transaction, TxIn, TxOut, Txid, Value,
};

fn bench_derive_salt(c: &mut Criterion) {
    let key = Keypair::from_seed(&[0x42; 32]);
    let name = Name::from("d/example");

    c.bench_function("salt/derive", |b| {
        b.iter(|| derive_salt(black_box(&key), black_box(&name)));
    });
}

fn bench_commitment(c: &mut Criterion) {
    let key = Keypair::from_seed(&[0x42; 32]);
    let mut group = c.benchmark_group("commitment/compute");

    for len in [8usize, 64, 255] {
        let name = Name::from(vec![b'a'; len]);
        let salt = derive_salt(&key, &name);
        group.bench_with_input(BenchmarkId::from_parameter(len), &name, |b, name| {
            b.iter(|| Commitment::compute(black_box(&salt), black_box(name)));
        });
    }
    group.finish();
}

fn bench_canonical_roundtrip(c: &mut Criterion) {
    let key = Keypair::from_seed(&[0x42; 32]);
    let name = Name::from("d/example");
    let salt = derive_salt(&key, &name);
    let tx = Transaction::new(
        vec![TxIn::new(OutPoint::new(Txid::from_bytes([1; 32]), 0))],
        vec![TxOut::with_name_op(
            1_000_000,
            Script::pay_to_key(&key.public_key()),
            NameOp::FirstUpdate {
                name,
                value: Value::from(r#"{"ip":"127.0.0.1"}"#),
                salt,
            },
        )],
    );
    let bytes = canonical_bytes(&tx);

    c.bench_function("canonical/encode", |b| {
        b.iter(|| canonical_bytes(black_box(&tx)));
    });
    c.bench_function("canonical/decode", |b| {
        b.iter(|| decode_transaction(black_box(&bytes)));
    });
    c.bench_function("canonical/txid", |b| {
        b.iter(|| black_box(&tx).txid());
    });
}

criterion_group!(benches, bench_derive_salt, bench_commitment, bench_canonical_roundtrip);
criterion_main!(benches);
