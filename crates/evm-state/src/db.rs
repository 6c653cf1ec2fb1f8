//! どこで: REVM DBアダプタ / 何を: StateDbの読み取り接続 / なぜ: 実行エンジンとワールドステートを繋ぐため

use core::convert::Infallible;

use revm::database_interface::{Database, DatabaseRef};
use revm::primitives::{Address, StorageKey, StorageValue, B256, KECCAK_EMPTY};
use revm::state::{AccountInfo, Bytecode};

use crate::statedb::StateDb;

/// Read-only view of a `StateDb` for the EVM. Effects come back as a diff
/// through `StateDb::apply_changes`, never through this adapter.
pub struct StateRef<'a> {
    state: &'a StateDb,
}

impl<'a> StateRef<'a> {
    pub fn new(state: &'a StateDb) -> Self {
        Self { state }
    }

    fn basic_account(&self, address: Address) -> Option<AccountInfo> {
        let account = self.state.account(&address)?;
        let code_hash = if account.code.is_empty() {
            KECCAK_EMPTY
        } else {
            account.code_hash()
        };
        // Code travels inline so code_by_hash stays a stub.
        let code = if account.code.is_empty() {
            None
        } else {
            Some(Bytecode::new_legacy(account.code.clone()))
        };
        Some(AccountInfo {
            balance: account.balance,
            nonce: account.nonce,
            code_hash,
            code,
            ..Default::default()
        })
    }
}

impl Database for StateRef<'_> {
    type Error = Infallible;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(self.basic_account(address))
    }

    fn code_by_hash(&mut self, _code_hash: B256) -> Result<Bytecode, Self::Error> {
        Ok(Bytecode::default())
    }

    fn storage(
        &mut self,
        address: Address,
        index: StorageKey,
    ) -> Result<StorageValue, Self::Error> {
        let slot = B256::from(index.to_be_bytes::<32>());
        Ok(self.state.storage_at(&address, &slot))
    }

    // This application has no block-hash oracle.
    fn block_hash(&mut self, _number: u64) -> Result<B256, Self::Error> {
        Ok(B256::ZERO)
    }
}

impl DatabaseRef for StateRef<'_> {
    type Error = Infallible;

    fn basic_ref(&self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(self.basic_account(address))
    }

    fn code_by_hash_ref(&self, _code_hash: B256) -> Result<Bytecode, Self::Error> {
        Ok(Bytecode::default())
    }

    fn storage_ref(
        &self,
        address: Address,
        index: StorageKey,
    ) -> Result<StorageValue, Self::Error> {
        let slot = B256::from(index.to_be_bytes::<32>());
        Ok(self.state.storage_at(&address, &slot))
    }

    fn block_hash_ref(&self, _number: u64) -> Result<B256, Self::Error> {
        Ok(B256::ZERO)
    }
}
