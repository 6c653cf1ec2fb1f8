//! どこで: state trieハンドル / 何を: copy/intermediate_root/commit / なぜ: WASと正本を同じ操作で回すため

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::encode as rlp_encode;
use alloy_trie::TrieAccount;
use evm_db::{MemDb, StoreError, WriteBatch};
use revm::primitives::HashMap as RevmHashMap;
use revm::state::Account as RevmAccount;

use crate::account::AccountState;
use crate::trie;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StateError {
    Store(StoreError),
}

// Snapshot record prefixes, internal to the trie's keying scheme.
const ACCOUNT_RECORD_PREFIX: u8 = 0x01;
const STORAGE_RECORD_PREFIX: u8 = 0x02;
const CODE_RECORD_PREFIX: u8 = 0x03;

/// One world state: a deterministic account map over a shared backing store.
/// `copy` snapshots are mutation-isolated in both directions; only `commit`
/// touches the store.
pub struct StateDb {
    store: Arc<MemDb>,
    accounts: BTreeMap<Address, AccountState>,
}

impl StateDb {
    pub fn new(store: Arc<MemDb>) -> Self {
        Self {
            store,
            accounts: BTreeMap::new(),
        }
    }

    /// Deep logical snapshot. The backing store handle is shared; the account
    /// map is not.
    pub fn copy(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            accounts: self.accounts.clone(),
        }
    }

    pub fn store(&self) -> &Arc<MemDb> {
        &self.store
    }

    pub fn account(&self, address: &Address) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    pub fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|account| account.balance)
            .unwrap_or(U256::ZERO)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts
            .get(address)
            .map(|account| account.nonce)
            .unwrap_or(0)
    }

    pub fn code(&self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .map(|account| account.code.clone())
            .unwrap_or_default()
    }

    pub fn storage_at(&self, address: &Address, slot: &B256) -> U256 {
        self.accounts
            .get(address)
            .and_then(|account| account.storage.get(slot).copied())
            .unwrap_or(U256::ZERO)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.accounts.entry(address).or_default().nonce = nonce;
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.accounts.entry(address).or_default().code = code;
    }

    pub fn set_storage(&mut self, address: Address, slot: B256, value: U256) {
        let account = self.accounts.entry(address).or_default();
        if value.is_zero() {
            account.storage.remove(&slot);
        } else {
            account.storage.insert(slot, value);
        }
    }

    /// Folds one EVM run's account diff into this state. Selfdestructed and
    /// touched-empty accounts are dropped, zeroed slots erased.
    pub fn apply_changes(&mut self, changes: RevmHashMap<Address, RevmAccount>) {
        for (address, account) in changes.into_iter() {
            if account.is_selfdestructed() || (account.is_empty() && account.is_touched()) {
                self.accounts.remove(&address);
                continue;
            }
            if !account.is_touched() {
                continue;
            }

            let entry = self.accounts.entry(address).or_default();
            entry.balance = account.info.balance;
            entry.nonce = account.info.nonce;
            if let Some(code) = account.info.code.as_ref() {
                if !code.is_empty() {
                    entry.code = Bytes::from(code.original_byte_slice().to_vec());
                }
            }
            for (slot, slot_state) in account.changed_storage_slots() {
                let key = B256::from(slot.to_be_bytes::<32>());
                if slot_state.present_value.is_zero() {
                    entry.storage.remove(&key);
                } else {
                    entry.storage.insert(key, slot_state.present_value);
                }
            }
        }
    }

    /// Merkle root of the current state, without persisting anything.
    pub fn intermediate_root(&self, delete_empty: bool) -> B256 {
        trie::account_trie_root(&self.accounts, delete_empty)
    }

    /// Merkle root plus one atomic batch of snapshot records into the
    /// backing store. With `delete_empty`, empty accounts are pruned from
    /// the map before hashing.
    pub fn commit(&mut self, delete_empty: bool) -> Result<B256, StateError> {
        if delete_empty {
            self.accounts.retain(|_, account| !account.is_empty());
        }
        let root = trie::account_trie_root(&self.accounts, false);

        let mut batch = WriteBatch::new();
        for (address, account) in self.accounts.iter() {
            let hashed_address = keccak256(address);
            let trie_account = TrieAccount {
                nonce: account.nonce,
                balance: account.balance,
                storage_root: trie::storage_trie_root(&account.storage),
                code_hash: account.code_hash(),
            };
            batch.put(
                record_key(ACCOUNT_RECORD_PREFIX, hashed_address.as_slice()),
                rlp_encode(&trie_account),
            );
            for (slot, value) in account.storage.iter() {
                if value.is_zero() {
                    continue;
                }
                let mut path = Vec::with_capacity(64);
                path.extend_from_slice(hashed_address.as_slice());
                path.extend_from_slice(keccak256(slot).as_slice());
                batch.put(record_key(STORAGE_RECORD_PREFIX, &path), rlp_encode(value));
            }
            if !account.code.is_empty() {
                batch.put(
                    record_key(CODE_RECORD_PREFIX, account.code_hash().as_slice()),
                    account.code.to_vec(),
                );
            }
        }
        self.store.write(batch).map_err(StateError::Store)?;
        Ok(root)
    }
}

fn record_key(prefix: u8, path: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + path.len());
    out.push(prefix);
    out.extend_from_slice(path);
    out
}
