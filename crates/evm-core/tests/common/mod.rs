//! どこで: evm-core integration tests / 何を: エンジンと署名txの補助関数 / なぜ: 重複を減らし変更点を1箇所に集約するため

#![allow(dead_code)]

use std::sync::Arc;

use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use evm_core::genesis::AccountSeed;
use evm_core::{Engine, CHAIN_ID};
use evm_db::MemDb;

pub fn test_signer() -> PrivateKeySigner {
    "0x59c6995e998f97a5a0044966f094538e0d7f4f4e4d5d8dd6a8c4f9d5f8b1e8a1"
        .parse()
        .expect("signer")
}

pub fn engine() -> Engine {
    Engine::new(Arc::new(MemDb::new()))
}

/// Engine with one genesis account holding `wei`.
pub fn funded_engine(address: Address, wei: u64) -> Engine {
    let engine = engine();
    engine
        .create_accounts(&[AccountSeed {
            address,
            balance: U256::from(wei),
            code: Bytes::new(),
            storage: Vec::new(),
        }])
        .expect("genesis install");
    engine
}

pub fn sign_legacy(
    signer: &PrivateKeySigner,
    nonce: u64,
    to: Option<Address>,
    value: u64,
    gas_limit: u64,
    gas_price: u128,
    data: Vec<u8>,
) -> (Vec<u8>, B256) {
    sign_legacy_with_chain(signer, CHAIN_ID, nonce, to, value, gas_limit, gas_price, data)
}

pub fn sign_legacy_with_chain(
    signer: &PrivateKeySigner,
    chain_id: u64,
    nonce: u64,
    to: Option<Address>,
    value: u64,
    gas_limit: u64,
    gas_price: u128,
    data: Vec<u8>,
) -> (Vec<u8>, B256) {
    let tx = TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_limit,
        to: to.map(TxKind::Call).unwrap_or(TxKind::Create),
        value: U256::from(value),
        input: Bytes::from(data),
    };
    let signature = signer.sign_hash_sync(&tx.signature_hash()).expect("sign");
    let signed = tx.into_signed(signature);
    let hash = *signed.hash();
    (signed.encoded_2718(), hash)
}

/// Plain 21k transfer at gas price zero.
pub fn transfer(
    signer: &PrivateKeySigner,
    nonce: u64,
    to: Address,
    value: u64,
) -> (Vec<u8>, B256) {
    sign_legacy(signer, nonce, Some(to), value, 21_000, 0, Vec::new())
}

/// Runtime code that emits one empty LOG0 and stops.
pub const LOG_RUNTIME: [u8; 6] = [0x60, 0x00, 0x60, 0x00, 0xa0, 0x00];

/// Init code deploying `LOG_RUNTIME`.
pub fn log_contract_init() -> Vec<u8> {
    vec![
        0x65, 0x60, 0x00, 0x60, 0x00, 0xa0, 0x00, // PUSH6 runtime
        0x60, 0x00, 0x52, // MSTORE at 0 (right-aligned)
        0x60, 0x06, 0x60, 0x1a, 0xf3, // RETURN 6 bytes at offset 26
    ]
}
