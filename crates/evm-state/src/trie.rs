//! どこで: state root計算 / 何を: secure MPTの決定的root / なぜ: commitとintermediateで同じ規則を使うため

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::encode as rlp_encode;
use alloy_trie::{HashBuilder, Nibbles, TrieAccount, EMPTY_ROOT_HASH};

use crate::account::AccountState;

/// Root of the secure account trie: leaves are RLP trie accounts keyed by
/// the keccak of the address, inserted in hashed-key order.
pub fn account_trie_root(
    accounts: &BTreeMap<Address, AccountState>,
    delete_empty: bool,
) -> B256 {
    let mut leaves: BTreeMap<B256, Vec<u8>> = BTreeMap::new();
    for (address, account) in accounts.iter() {
        if delete_empty && account.is_empty() {
            continue;
        }
        let trie_account = TrieAccount {
            nonce: account.nonce,
            balance: account.balance,
            storage_root: storage_trie_root(&account.storage),
            code_hash: account.code_hash(),
        };
        leaves.insert(keccak256(address), rlp_encode(&trie_account));
    }
    hashed_leaves_root(leaves)
}

/// Root of one account's storage trie. Zero-valued slots are absent by
/// construction; stray zeroes are skipped anyway.
pub fn storage_trie_root(storage: &BTreeMap<B256, U256>) -> B256 {
    let mut leaves: BTreeMap<B256, Vec<u8>> = BTreeMap::new();
    for (slot, value) in storage.iter() {
        if value.is_zero() {
            continue;
        }
        leaves.insert(keccak256(slot), rlp_encode(value));
    }
    hashed_leaves_root(leaves)
}

fn hashed_leaves_root(leaves: BTreeMap<B256, Vec<u8>>) -> B256 {
    if leaves.is_empty() {
        return EMPTY_ROOT_HASH;
    }
    let mut builder = HashBuilder::default();
    for (hashed_key, value) in leaves.iter() {
        builder.add_leaf(Nibbles::unpack(hashed_key), value);
    }
    builder.root()
}
