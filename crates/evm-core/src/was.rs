//! どこで: Write-Ahead State / 何を: ブロック内効果の緩衝とcommit / なぜ: 棄却ブロックを正本に触れず捨てるため

use std::sync::Arc;

use alloy_primitives::{Log, B256};
use evm_db::{keys, MemDb, StoreError, WriteBatch};
use evm_state::{StateDb, StateError};
use tracing::debug;

use crate::receipt::Receipt;
use crate::tx_recovery::RecoveredTx;
use crate::BLOCK_GAS_LIMIT;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WasError {
    State(StateError),
    Store(StoreError),
}

/// Scratch state for the block in flight: one snapshot of the canonical
/// state plus the per-block accumulators. Rebuilt after every successful
/// commit.
pub struct WriteAheadState {
    store: Arc<MemDb>,
    state: StateDb,
    tx_index: usize,
    transactions: Vec<RecoveredTx>,
    receipts: Vec<Receipt>,
    all_logs: Vec<Log>,
    total_used_gas: u64,
    gas_pool: u64,
}

impl WriteAheadState {
    pub fn new(state: StateDb, store: Arc<MemDb>) -> Self {
        Self {
            store,
            state,
            tx_index: 0,
            transactions: Vec::new(),
            receipts: Vec::new(),
            all_logs: Vec::new(),
            total_used_gas: 0,
            gas_pool: BLOCK_GAS_LIMIT,
        }
    }

    pub fn state(&self) -> &StateDb {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateDb {
        &mut self.state
    }

    pub fn tx_index(&self) -> usize {
        self.tx_index
    }

    pub fn total_used_gas(&self) -> u64 {
        self.total_used_gas
    }

    pub fn gas_pool(&self) -> u64 {
        self.gas_pool
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn transactions(&self) -> &[RecoveredTx] {
        &self.transactions
    }

    pub fn logs(&self) -> &[Log] {
        &self.all_logs
    }

    /// Books one applied transaction: gas accounting plus the positional
    /// tx/receipt/log append.
    pub fn append(&mut self, tx: RecoveredTx, receipt: Receipt, gas_used: u64) {
        self.gas_pool -= gas_used;
        self.total_used_gas += gas_used;
        self.all_logs.extend(receipt.logs.iter().cloned());
        self.transactions.push(tx);
        self.receipts.push(receipt);
        self.tx_index += 1;
    }

    /// Commits the block: trie first, then the tx and receipt batches.
    /// A failure after the trie commit is the documented inconsistency
    /// window; the store is ephemeral, so it does not outlive the process.
    pub fn commit(&mut self) -> Result<B256, WasError> {
        let root = self.state.commit(true).map_err(WasError::State)?;
        self.write_transactions().map_err(WasError::Store)?;
        self.write_receipts().map_err(WasError::Store)?;
        debug!(
            txs = self.transactions.len(),
            gas = self.total_used_gas,
            "committed write-ahead state"
        );
        Ok(root)
    }

    fn write_transactions(&self) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        for tx in self.transactions.iter() {
            batch.put(keys::tx_key(&tx.hash.0), tx.raw.clone());
        }
        self.store.write(batch)
    }

    fn write_receipts(&self) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        for receipt in self.receipts.iter() {
            batch.put(
                keys::receipt_key(&receipt.tx_hash.0),
                receipt.to_stored().encode(),
            );
        }
        self.store.write(batch)
    }

    /// Hands the committed state out for promotion, leaving a placeholder
    /// until `reset` installs the next snapshot.
    pub fn take_state(&mut self) -> StateDb {
        std::mem::replace(&mut self.state, StateDb::new(Arc::clone(&self.store)))
    }

    /// Rebuilds the WAS around a fresh snapshot: zero accumulators, full
    /// gas pool.
    pub fn reset(&mut self, snapshot: StateDb) {
        self.state = snapshot;
        self.tx_index = 0;
        self.transactions.clear();
        self.receipts.clear();
        self.all_logs.clear();
        self.total_used_gas = 0;
        self.gas_pool = BLOCK_GAS_LIMIT;
        debug!("reset write-ahead state");
    }
}

#[cfg(test)]
mod tests {
    use super::WriteAheadState;
    use crate::receipt::Receipt;
    use crate::tx_recovery::RecoveredTx;
    use crate::{BLOCK_GAS_LIMIT, CHAIN_ID};
    use alloy_primitives::{Address, B256, U256};
    use evm_db::{keys, MemDb};
    use evm_state::StateDb;
    use std::sync::Arc;

    fn sample_tx(hash_byte: u8) -> RecoveredTx {
        RecoveredTx {
            hash: B256::with_last_byte(hash_byte),
            from: Address::from([0x01u8; 20]),
            to: Some(Address::from([0x02u8; 20])),
            nonce: 0,
            value: U256::ZERO,
            input: Vec::new(),
            gas_limit: 21_000,
            gas_price: Some(0),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            chain_id: Some(CHAIN_ID),
            tx_type: 0,
            raw: vec![hash_byte, 0xde, 0xad],
        }
    }

    fn sample_receipt(hash_byte: u8, cumulative: u64, gas: u64) -> Receipt {
        Receipt::new(
            B256::with_last_byte(0xf0 ^ hash_byte),
            cumulative,
            gas,
            B256::with_last_byte(hash_byte),
            None,
            Vec::new(),
        )
    }

    #[test]
    fn append_keeps_gas_pool_complement_invariant() {
        let store = Arc::new(MemDb::new());
        let mut was = WriteAheadState::new(StateDb::new(Arc::clone(&store)), store);

        was.append(sample_tx(1), sample_receipt(1, 21_000, 21_000), 21_000);
        was.append(sample_tx(2), sample_receipt(2, 42_000, 21_000), 21_000);

        assert_eq!(was.tx_index(), 2);
        assert_eq!(was.total_used_gas(), 42_000);
        assert_eq!(was.gas_pool() + was.total_used_gas(), BLOCK_GAS_LIMIT);
        assert_eq!(was.receipts().len(), was.transactions().len());
    }

    #[test]
    fn commit_persists_txs_and_receipts_under_their_namespaces() {
        let store = Arc::new(MemDb::new());
        let mut was = WriteAheadState::new(StateDb::new(Arc::clone(&store)), Arc::clone(&store));
        was.append(sample_tx(7), sample_receipt(7, 21_000, 21_000), 21_000);

        was.commit().expect("commit");

        let hash = B256::with_last_byte(7).0;
        assert_eq!(store.get(&keys::tx_key(&hash)), Some(vec![7, 0xde, 0xad]));
        assert!(store.get(&keys::receipt_key(&hash)).is_some());
    }

    #[test]
    fn reset_restores_the_initial_block_shape() {
        let store = Arc::new(MemDb::new());
        let mut was = WriteAheadState::new(StateDb::new(Arc::clone(&store)), Arc::clone(&store));
        was.append(sample_tx(3), sample_receipt(3, 21_000, 21_000), 21_000);

        let next = was.take_state();
        was.reset(next.copy());

        assert_eq!(was.tx_index(), 0);
        assert_eq!(was.total_used_gas(), 0);
        assert_eq!(was.gas_pool(), BLOCK_GAS_LIMIT);
        assert!(was.receipts().is_empty());
        assert!(was.transactions().is_empty());
        assert!(was.logs().is_empty());
    }
}
