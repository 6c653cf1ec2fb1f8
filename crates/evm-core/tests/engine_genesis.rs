//! どこで: エンジン統合テスト / 何を: genesis導入と正本読み取り / なぜ: 初回ブロック前の状態投入を固定するため

mod common;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_trie::EMPTY_ROOT_HASH;
use evm_core::genesis::AccountSeed;

#[test]
fn genesis_balance_is_readable_and_nonce_starts_at_zero() {
    let address = Address::from([0xaau8; 20]);
    let engine = common::funded_engine(address, 1000);

    assert_eq!(engine.balance(&address), U256::from(1000u64));
    assert_eq!(engine.nonce(&address), 0);
    assert_ne!(engine.canonical_root(), EMPTY_ROOT_HASH);
}

#[test]
fn genesis_installs_code_and_storage_slots() {
    let address = Address::from([0xabu8; 20]);
    let engine = common::engine();
    let root = engine
        .create_accounts(&[AccountSeed {
            address,
            balance: U256::from(5u64),
            code: Bytes::from(vec![0x60, 0x00]),
            storage: vec![(B256::with_last_byte(1), U256::from(42u64))],
        }])
        .expect("install");

    assert_ne!(root, EMPTY_ROOT_HASH);
    assert_eq!(engine.canonical_root(), root);
    assert_eq!(engine.balance(&address), U256::from(5u64));
}

#[test]
fn repeated_installs_accumulate_balance() {
    let address = Address::from([0xacu8; 20]);
    let engine = common::engine();
    let seed = |wei: u64| AccountSeed {
        address,
        balance: U256::from(wei),
        code: Bytes::new(),
        storage: Vec::new(),
    };
    engine
        .create_accounts(&[seed(700), seed(300)])
        .expect("install");

    assert_eq!(engine.balance(&address), U256::from(1000u64));
}

#[test]
fn unknown_accounts_read_as_zero() {
    let engine = common::engine();
    let ghost = Address::from([0xadu8; 20]);
    assert_eq!(engine.balance(&ghost), U256::ZERO);
    assert_eq!(engine.nonce(&ghost), 0);
}
