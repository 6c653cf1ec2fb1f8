//! どこで: エンジン統合テスト / 何を: CheckTxの境界と純粋性 / なぜ: mempool入場規則の回帰を防ぐため

mod common;

use alloy_primitives::Address;
use evm_core::Code;

#[test]
fn malformed_bytes_are_an_encoding_error() {
    let engine = common::engine();
    assert_eq!(engine.check_tx(&[]).code, Code::EncodingError);
    assert_eq!(engine.check_tx(&[0xc0, 0xff, 0xee]).code, Code::EncodingError);
    assert_eq!(engine.append_tx(&[0xc0, 0xff, 0xee]).code, Code::EncodingError);
}

#[test]
fn foreign_chain_id_reads_as_invalid_sender() {
    let signer = common::test_signer();
    let engine = common::funded_engine(signer.address(), 1_000_000);
    let (raw, _) = common::sign_legacy_with_chain(
        &signer,
        61,
        0,
        Some(Address::from([0x01u8; 20])),
        1,
        21_000,
        0,
        Vec::new(),
    );

    let result = engine.check_tx(&raw);
    assert_eq!(result.code, Code::InternalError);
    assert!(result.log.contains("invalid sender"));
}

#[test]
fn stale_nonce_is_rejected_but_future_nonce_passes() {
    let signer = common::test_signer();
    let engine = common::funded_engine(signer.address(), 1_000_000);
    let to = Address::from([0x02u8; 20]);

    let (raw0, _) = common::transfer(&signer, 0, to, 1);
    assert!(engine.append_tx(&raw0).is_ok());
    assert!(engine.commit().is_ok());

    // Replays sit below the write-ahead nonce.
    assert_eq!(engine.check_tx(&raw0).code, Code::BadNonce);

    // The mempool may hold future nonces.
    let (raw5, _) = common::transfer(&signer, 5, to, 1);
    assert_eq!(engine.check_tx(&raw5).code, Code::Ok);
}

#[test]
fn oversized_gas_exhausts_the_block_pool() {
    let signer = common::test_signer();
    let engine = common::funded_engine(signer.address(), 1_000_000);
    let (raw, _) = common::sign_legacy(
        &signer,
        0,
        Some(Address::from([0x03u8; 20])),
        0,
        u64::MAX,
        0,
        Vec::new(),
    );

    let result = engine.check_tx(&raw);
    assert_eq!(result.code, Code::InternalError);
    assert!(result.log.contains("gas limit"));
}

#[test]
fn cost_above_balance_is_insufficient_funds() {
    let signer = common::test_signer();
    let engine = common::funded_engine(signer.address(), 1_000);
    let (raw, _) = common::transfer(&signer, 0, Address::from([0x04u8; 20]), 10_000);

    assert_eq!(engine.check_tx(&raw).code, Code::InsufficientFunds);
}

#[test]
fn check_tx_never_mutates_canonical_state() {
    let signer = common::test_signer();
    let sender = signer.address();
    let engine = common::funded_engine(sender, 1_000);
    let root_before = engine.canonical_root();

    let (ok_tx, _) = common::transfer(&signer, 0, Address::from([0x05u8; 20]), 10);
    let (poor_tx, _) = common::transfer(&signer, 0, Address::from([0x05u8; 20]), 10_000);
    assert_eq!(engine.check_tx(&ok_tx).code, Code::Ok);
    assert_eq!(engine.check_tx(&poor_tx).code, Code::InsufficientFunds);

    assert_eq!(engine.balance(&sender), alloy_primitives::U256::from(1_000u64));
    assert_eq!(engine.nonce(&sender), 0);
    assert_eq!(engine.canonical_root(), root_before);
}

#[test]
fn check_tx_sees_the_block_in_flight() {
    let signer = common::test_signer();
    let engine = common::funded_engine(signer.address(), 100_000);
    let to = Address::from([0x06u8; 20]);

    // Nearly drain the balance inside the current block.
    let (raw0, _) = common::transfer(&signer, 0, to, 99_999);
    assert!(engine.append_tx(&raw0).is_ok());

    // Admission runs against the write-ahead balance, not the canonical one.
    let (raw1, _) = common::transfer(&signer, 1, to, 50_000);
    assert_eq!(engine.check_tx(&raw1).code, Code::InsufficientFunds);
    assert_eq!(engine.check_tx(&raw0).code, Code::BadNonce);
}
