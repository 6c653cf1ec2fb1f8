//! どこで: REVM適用層 / 何を: WAS snapshot上でのメッセージ実行 / なぜ: 状態更新を必ずEVM経由にするため

use alloy_primitives::{Bytes, Log, TxKind};
use evm_state::{StateDb, StateRef};
use revm::context::{BlockEnv, Context, Journal, TxEnv};
use revm::context_interface::result::ExecutionResult;
use revm::handler::{ExecuteEvm, MainBuilder};
use revm::primitives::hardfork::SpecId;

use crate::tx_recovery::RecoveredTx;
use crate::{BLOCK_GAS_LIMIT, CHAIN_ID};

// EIP-155/158 era: touched-empty deletion active, matching delete_empty
// commits.
const SPEC: SpecId = SpecId::SPURIOUS_DRAGON;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExecError {
    GasPoolExhausted,
    Invalid(String),
    Reverted { gas_used: u64 },
    Halted { reason: String, gas_used: u64 },
}

#[derive(Debug)]
pub struct ExecOutcome {
    pub gas_used: u64,
    pub logs: Vec<Log>,
    pub output: Vec<u8>,
}

/// Runs one recovered message against `state` and folds the diff back in on
/// success. Failed runs (invalid message, revert, halt) leave `state`
/// untouched and surface as errors; the engine reports them without a
/// receipt.
pub fn execute_message(
    state: &mut StateDb,
    msg: &RecoveredTx,
    gas_pool: u64,
) -> Result<ExecOutcome, ExecError> {
    if gas_pool < msg.gas_limit {
        return Err(ExecError::GasPoolExhausted);
    }

    let tx_env = build_tx_env(msg);
    let result = {
        let db = StateRef::new(state);
        let mut ctx: Context<BlockEnv, TxEnv, _, StateRef<'_>, Journal<StateRef<'_>>, (), _> =
            Context::new(db, SPEC);
        ctx.block = block_env();
        ctx.cfg.chain_id = CHAIN_ID;
        let mut evm = ctx.build_mainnet();
        evm.transact(tx_env)
            .map_err(|err| ExecError::Invalid(format!("{err:?}")))?
    };

    let changes = result.state;
    match result.result {
        ExecutionResult::Success {
            gas_used,
            output,
            logs,
            ..
        } => {
            state.apply_changes(changes);
            Ok(ExecOutcome {
                gas_used,
                logs,
                output: output.data().to_vec(),
            })
        }
        ExecutionResult::Revert { gas_used, .. } => Err(ExecError::Reverted { gas_used }),
        ExecutionResult::Halt { gas_used, reason } => Err(ExecError::Halted {
            reason: format!("{reason:?}"),
            gas_used,
        }),
    }
}

fn block_env() -> BlockEnv {
    BlockEnv {
        gas_limit: BLOCK_GAS_LIMIT,
        basefee: 0,
        ..Default::default()
    }
}

fn build_tx_env(msg: &RecoveredTx) -> TxEnv {
    let kind = match msg.to {
        Some(addr) => TxKind::Call(addr),
        None => TxKind::Create,
    };
    TxEnv {
        tx_type: msg.tx_type,
        caller: msg.from,
        gas_limit: msg.gas_limit,
        gas_price: msg.effective_gas_price(),
        kind,
        value: msg.value,
        data: Bytes::from(msg.input.clone()),
        nonce: msg.nonce,
        chain_id: msg.chain_id,
        access_list: Default::default(),
        gas_priority_fee: msg.max_priority_fee_per_gas,
        blob_hashes: Vec::new(),
        max_fee_per_blob_gas: 0,
        authorization_list: Vec::new(),
    }
}
