//! どこで: アカウント状態の最小表現 / 何を: balance/nonce/code/storage / なぜ: trie葉とEVM入力の共通の素材にするため

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_trie::KECCAK_EMPTY;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccountState {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub storage: BTreeMap<B256, U256>,
}

impl AccountState {
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// EIP-161 emptiness: no balance, no nonce, no code. Storage does not
    /// count; an empty account cannot hold live slots through the EVM.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code.is_empty()
    }

    pub fn code_hash(&self) -> B256 {
        if self.code.is_empty() {
            KECCAK_EMPTY
        } else {
            keccak256(&self.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AccountState;
    use alloy_primitives::{keccak256, Bytes, U256};
    use alloy_trie::KECCAK_EMPTY;

    #[test]
    fn fresh_account_is_empty() {
        assert!(AccountState::default().is_empty());
        assert!(!AccountState::with_balance(U256::from(1u64)).is_empty());
    }

    #[test]
    fn code_hash_matches_keccak_of_code() {
        let mut account = AccountState::default();
        assert_eq!(account.code_hash(), KECCAK_EMPTY);
        account.code = Bytes::from(vec![0x60, 0x00]);
        assert_eq!(account.code_hash(), keccak256([0x60, 0x00]));
    }
}
