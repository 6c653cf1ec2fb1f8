//! どこで: driver向けエンジン / 何を: 5操作+genesis導入+正本読み取り / なぜ: ブロック周期の直列実行を一点で守るため

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use evm_db::{keys, MemDb};
use evm_state::{StateDb, StateError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::exec::execute_message;
use crate::genesis::AccountSeed;
use crate::receipt::{Receipt, StoredReceipt};
use crate::result::{AppResult, Code};
use crate::tx_recovery::{recover_tx, RecoveredTx, RecoveryError};
use crate::was::WriteAheadState;

/// Fixed identifier returned to the driver's `Info`.
pub const APP_INFO: &str = "evm-app";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineError {
    NotFound(&'static str),
    Decode(String),
    State(StateError),
}

/// The application engine. Owns the backing store, the canonical state
/// behind a publication handle, and the write-ahead state behind the commit
/// mutex. Drivers call the five operations strictly sequentially; HTTP
/// readers resolve the canonical Arc and never touch the commit mutex.
pub struct Engine {
    store: Arc<MemDb>,
    canonical: RwLock<Arc<StateDb>>,
    was: Mutex<WriteAheadState>,
}

impl Engine {
    pub fn new(store: Arc<MemDb>) -> Self {
        let canonical = Arc::new(StateDb::new(Arc::clone(&store)));
        let was = WriteAheadState::new(canonical.copy(), Arc::clone(&store));
        Self {
            store,
            canonical: RwLock::new(canonical),
            was: Mutex::new(was),
        }
    }

    pub fn store(&self) -> &Arc<MemDb> {
        &self.store
    }

    pub fn info(&self) -> &'static str {
        APP_INFO
    }

    pub fn set_option(&self, _key: &str, _value: &str) -> &'static str {
        "not implemented"
    }

    pub fn query(&self, _query: &[u8]) -> AppResult {
        AppResult::ok_with(Vec::new(), "not implemented")
    }

    /// Mempool admission. Reads the write-ahead state so decisions see the
    /// block in flight; never mutates anything.
    pub fn check_tx(&self, bytes: &[u8]) -> AppResult {
        let was = self.was.lock();
        debug!("check_tx");

        let tx = match recover_tx(bytes) {
            Ok(tx) => tx,
            Err(err) => return recovery_result("check_tx", err),
        };
        debug!(hash = %tx.hash, "decoded tx");

        // Future nonces pass; the mempool may hold them.
        if was.state().nonce(&tx.from) > tx.nonce {
            error!(hash = %tx.hash, "bad nonce");
            return AppResult::error(Code::BadNonce, "check_tx bad nonce");
        }
        if was.gas_pool() < tx.gas_limit {
            error!(hash = %tx.hash, "not enough block gas");
            return AppResult::internal("check_tx gas limit");
        }
        // cost == value + gas price * gas limit
        if was.state().balance(&tx.from) < tx.cost() {
            error!(hash = %tx.hash, "insufficient funds");
            return AppResult::error(Code::InsufficientFunds, "check_tx insufficient funds");
        }
        debug!(hash = %tx.hash, "checked tx");
        AppResult::ok()
    }

    /// Executes one ordered transaction against the write-ahead state and
    /// books its receipt. The canonical state is never touched here.
    pub fn append_tx(&self, bytes: &[u8]) -> AppResult {
        let mut was = self.was.lock();
        debug!("append_tx");

        let tx = match recover_tx(bytes) {
            Ok(tx) => tx,
            Err(err) => return recovery_result("append_tx", err),
        };
        debug!(hash = %tx.hash, "decoded tx");

        let gas_pool = was.gas_pool();
        let outcome = match execute_message(was.state_mut(), &tx, gas_pool) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(hash = %tx.hash, ?err, "applying transaction to write-ahead state");
                return AppResult::internal(format!("append_tx apply message: {err:?}"));
            }
        };

        // Post-root over the WAS as it stands with this tx folded in, so
        // every receipt records its own monotonic root.
        let post_state = was.state().intermediate_root(true);
        let cumulative_gas_used = was.total_used_gas() + outcome.gas_used;
        let contract_address = tx.is_create().then(|| tx.from.create(tx.nonce));
        let receipt = Receipt::new(
            post_state,
            cumulative_gas_used,
            outcome.gas_used,
            tx.hash,
            contract_address,
            outcome.logs,
        );

        debug!(hash = %tx.hash, gas = outcome.gas_used, "applied tx to write-ahead state");
        was.append(tx, receipt, outcome.gas_used);
        AppResult::ok()
    }

    /// Materializes the write-ahead state: trie commit, tx/receipt batches,
    /// canonical pointer swap, WAS reset. Returns the new root as payload.
    pub fn commit(&self) -> AppResult {
        let mut was = self.was.lock();
        info!("commit");

        let root = match was.commit() {
            Ok(root) => root,
            Err(err) => {
                error!(?err, "committing write-ahead state");
                return AppResult::internal(format!("commit: {err:?}"));
            }
        };

        let canonical = Arc::new(was.take_state());
        let snapshot = canonical.copy();
        *self.canonical.write() = Arc::clone(&canonical);
        was.reset(snapshot);

        info!(%root, "committed");
        AppResult::ok_with(root.to_vec(), "")
    }

    /// Genesis-time bulk install, under the same mutex as the block cycle.
    /// Calling this after the first `append_tx` is undefined.
    pub fn create_accounts(&self, seeds: &[AccountSeed]) -> Result<B256, EngineError> {
        let mut was = self.was.lock();

        for seed in seeds.iter() {
            let state = was.state_mut();
            state.add_balance(seed.address, seed.balance);
            if !seed.code.is_empty() {
                state.set_code(seed.address, seed.code.clone());
            }
            for (slot, value) in seed.storage.iter() {
                state.set_storage(seed.address, *slot, *value);
            }
            info!(address = %seed.address, "adding account");
        }

        let root = was
            .state_mut()
            .commit(true)
            .map_err(EngineError::State)?;

        let canonical = Arc::new(was.take_state());
        let snapshot = canonical.copy();
        *self.canonical.write() = Arc::clone(&canonical);
        was.reset(snapshot);
        Ok(root)
    }

    // Reads below serve the HTTP layer and run against the canonical state
    // only.

    pub fn balance(&self, address: &Address) -> U256 {
        self.canonical_state().balance(address)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.canonical_state().nonce(address)
    }

    /// Root of the canonical state as published; pure.
    pub fn canonical_root(&self) -> B256 {
        self.canonical_state().intermediate_root(true)
    }

    pub fn transaction(&self, hash: &B256) -> Result<RecoveredTx, EngineError> {
        let data = self
            .store
            .get(&keys::tx_key(&hash.0))
            .ok_or(EngineError::NotFound("transaction"))?;
        recover_tx(&data).map_err(|err| EngineError::Decode(format!("{err:?}")))
    }

    pub fn receipt(&self, hash: &B256) -> Result<StoredReceipt, EngineError> {
        let data = self
            .store
            .get(&keys::receipt_key(&hash.0))
            .ok_or(EngineError::NotFound("receipt"))?;
        StoredReceipt::decode(&data).map_err(|err| EngineError::Decode(err.to_string()))
    }

    fn canonical_state(&self) -> Arc<StateDb> {
        Arc::clone(&self.canonical.read())
    }
}

fn recovery_result(op: &str, err: RecoveryError) -> AppResult {
    match err {
        RecoveryError::InvalidSignature
        | RecoveryError::LegacyChainIdMissing
        | RecoveryError::WrongChainId => {
            error!(?err, "extracting tx sender");
            AppResult::internal(format!("{op} invalid sender: {err:?}"))
        }
        _ => {
            error!(?err, "decoding transaction");
            AppResult::error(Code::EncodingError, format!("{op} decode: {err:?}"))
        }
    }
}
