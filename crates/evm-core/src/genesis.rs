//! どこで: genesis導入口 / 何を: Allocファイルのparse / なぜ: 初回ブロック前の残高・コード一括投入のため

use std::collections::BTreeMap;
use std::path::Path;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::Deserialize;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GenesisError {
    Io(String),
    Json(String),
    Address(String),
    Balance(String),
    Hex(String),
}

/// One genesis account, already parsed into engine-native types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountSeed {
    pub address: Address,
    pub balance: U256,
    pub code: Bytes,
    pub storage: Vec<(B256, U256)>,
}

#[derive(Debug, Deserialize)]
struct GenesisFile {
    #[serde(rename = "Alloc", default)]
    alloc: BTreeMap<String, RawAccount>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAccount {
    #[serde(rename = "Balance", default)]
    balance: String,
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Storage", default)]
    storage: BTreeMap<String, String>,
}

pub fn load(path: &Path) -> Result<Vec<AccountSeed>, GenesisError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| GenesisError::Io(format!("{}: {err}", path.display())))?;
    parse(&contents)
}

pub fn parse(contents: &str) -> Result<Vec<AccountSeed>, GenesisError> {
    let file: GenesisFile =
        serde_json::from_str(contents).map_err(|err| GenesisError::Json(err.to_string()))?;

    let mut seeds = Vec::with_capacity(file.alloc.len());
    for (raw_address, account) in file.alloc.iter() {
        let address = parse_address(raw_address)?;
        let balance = parse_balance(&account.balance)?;
        let code = Bytes::from(parse_hex(&account.code)?);
        let mut storage = Vec::with_capacity(account.storage.len());
        for (raw_slot, raw_value) in account.storage.iter() {
            let slot = parse_word(raw_slot)?;
            let value = U256::from_be_bytes(parse_word(raw_value)?.0);
            storage.push((slot, value));
        }
        seeds.push(AccountSeed {
            address,
            balance,
            code,
            storage,
        });
    }
    Ok(seeds)
}

fn parse_address(raw: &str) -> Result<Address, GenesisError> {
    let bytes = parse_hex(raw)?;
    if bytes.len() != 20 {
        return Err(GenesisError::Address(raw.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

/// Balances are decimal strings; empty means zero.
fn parse_balance(raw: &str) -> Result<U256, GenesisError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| GenesisError::Balance(raw.to_string()))
}

/// Storage words are hex, left-padded to 32 bytes.
fn parse_word(raw: &str) -> Result<B256, GenesisError> {
    let bytes = parse_hex(raw)?;
    if bytes.len() > 32 {
        return Err(GenesisError::Hex(raw.to_string()));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(B256::from(word))
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, GenesisError> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if stripped.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(stripped).map_err(|_| GenesisError::Hex(raw.to_string()))
}
