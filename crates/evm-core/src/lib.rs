//! どこで: 実行エンジンの核 / 何を: tx復元・EVM適用・WAS・5操作のエンジン / なぜ: コンセンサスdriverから状態遷移を分離するため

pub mod engine;
pub mod exec;
pub mod genesis;
pub mod receipt;
pub mod result;
pub mod tx_recovery;
pub mod was;

pub use engine::{Engine, EngineError};
pub use result::{AppResult, Code};

/// Chain id bound into every EIP-155 signature this engine accepts.
pub const CHAIN_ID: u64 = 1;

/// Fixed per-block gas ceiling; the WAS gas pool starts here.
pub const BLOCK_GAS_LIMIT: u64 = 1_000_000_000_000_000_000;
