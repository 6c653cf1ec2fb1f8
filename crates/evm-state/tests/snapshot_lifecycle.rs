//! どこで: evm-state統合テスト / 何を: snapshotとcommitの境界 / なぜ: WAS運用の前提を固定するため

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use evm_db::MemDb;
use evm_state::{StateDb, StateError};

#[test]
fn snapshot_changes_stay_invisible_until_promoted() {
    let store = Arc::new(MemDb::new());
    let mut canonical = StateDb::new(Arc::clone(&store));
    let addr = Address::from([0xaau8; 20]);
    canonical.add_balance(addr, U256::from(1_000u64));
    let base_root = canonical.intermediate_root(true);

    let mut snapshot = canonical.copy();
    snapshot.add_balance(addr, U256::from(500u64));
    snapshot.set_storage(addr, B256::with_last_byte(1), U256::from(9u64));

    // Canonical readers keep seeing the pre-block world.
    assert_eq!(canonical.balance(&addr), U256::from(1_000u64));
    assert_eq!(canonical.intermediate_root(true), base_root);
    assert_ne!(snapshot.intermediate_root(true), base_root);

    let root = snapshot.commit(true).expect("commit");
    assert_ne!(root, base_root);
    assert_eq!(snapshot.intermediate_root(true), root);

    // Promotion is the caller's pointer swap; the old handle is untouched.
    assert_eq!(canonical.intermediate_root(true), base_root);
}

#[test]
fn commit_reports_store_failure_without_panicking() {
    let store = Arc::new(MemDb::new());
    let mut state = StateDb::new(Arc::clone(&store));
    state.add_balance(Address::from([0xbbu8; 20]), U256::from(1u64));

    store.close();
    let err = state.commit(true).expect_err("closed store must fail");
    assert!(matches!(err, StateError::Store(_)));
}

#[test]
fn roots_do_not_depend_on_insertion_order() {
    let store = Arc::new(MemDb::new());
    let mut first = StateDb::new(Arc::clone(&store));
    let mut second = StateDb::new(store);

    let a = Address::from([0x01u8; 20]);
    let b = Address::from([0x02u8; 20]);
    first.add_balance(a, U256::from(1u64));
    first.add_balance(b, U256::from(2u64));
    second.add_balance(b, U256::from(2u64));
    second.add_balance(a, U256::from(1u64));

    assert_eq!(
        first.intermediate_root(true),
        second.intermediate_root(true)
    );
}
