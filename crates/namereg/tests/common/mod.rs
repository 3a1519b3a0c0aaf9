//! Shared setup for the registrar integration tests.

#![allow(dead_code)]

use namereg::store::{MemoryQueueStore, QueueStore};
use namereg::{ChainBackends, Registrar, RegistrarConfig};
use namereg_testkit::{TestFixture, TestWallet};

pub type TestRegistrar<Q = MemoryQueueStore> = Registrar<TestWallet, Q>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A registrar over the fixture's wallet and chain with a memory queue.
pub fn registrar(fixture: &TestFixture) -> TestRegistrar {
    registrar_with(fixture, MemoryQueueStore::new(), RegistrarConfig::default())
}

pub fn registrar_with<Q: QueueStore>(
    fixture: &TestFixture,
    store: Q,
    config: RegistrarConfig,
) -> TestRegistrar<Q> {
    init_tracing();
    Registrar::new(
        fixture.wallet.clone(),
        store,
        ChainBackends::shared(fixture.chain.clone()),
        config,
    )
    .unwrap()
}
