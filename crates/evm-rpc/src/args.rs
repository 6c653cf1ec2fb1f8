//! どこで: /tx引数とtx組み立て / 何を: 既定値補完とEIP-155署名 / なぜ: 提出経路の形をAPI境界で固定するため

use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use serde::Deserialize;

use evm_core::CHAIN_ID;

pub const DEFAULT_GAS: u64 = 90_000;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendTxArgs {
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub gas: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<u128>,
    #[serde(default)]
    pub value: Option<u128>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub nonce: Option<u64>,
}

impl SendTxArgs {
    pub fn gas(&self) -> u64 {
        self.gas.unwrap_or(DEFAULT_GAS)
    }

    pub fn gas_price(&self) -> u128 {
        self.gas_price.unwrap_or(0)
    }

    pub fn value(&self) -> U256 {
        U256::from(self.value.unwrap_or(0))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PrepareError {
    Address(String),
    Hex(String),
    Sign(String),
}

pub struct PreparedTx {
    pub raw: Vec<u8>,
    pub hash: B256,
}

pub fn parse_address(raw: &str) -> Result<Address, PrepareError> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(stripped).map_err(|_| PrepareError::Address(raw.to_string()))?;
    if bytes.len() != 20 {
        return Err(PrepareError::Address(raw.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn parse_data(raw: &Option<String>) -> Result<Vec<u8>, PrepareError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if stripped.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(stripped).map_err(|_| PrepareError::Hex(raw.to_string()))
}

/// Builds and signs the legacy transaction for `/tx`. The caller resolves
/// the nonce default from the canonical state.
pub fn prepare_transaction(
    args: &SendTxArgs,
    nonce: u64,
    signer: &PrivateKeySigner,
) -> Result<PreparedTx, PrepareError> {
    let to = match &args.to {
        Some(raw) => TxKind::Call(parse_address(raw)?),
        None => TxKind::Create,
    };
    let tx = TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_price: args.gas_price(),
        gas_limit: args.gas(),
        to,
        value: args.value(),
        input: Bytes::from(parse_data(&args.data)?),
    };

    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|err| PrepareError::Sign(err.to_string()))?;
    let signed = tx.into_signed(signature);
    Ok(PreparedTx {
        hash: *signed.hash(),
        raw: signed.encoded_2718(),
    })
}
