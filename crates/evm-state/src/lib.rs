//! どこで: ワールドステートの実体 / 何を: アカウントmapとMerkle-Patricia root / なぜ: canonical/WASを同じ型で扱うため

pub mod account;
pub mod db;
pub mod statedb;
pub mod trie;

pub use account::AccountState;
pub use db::StateRef;
pub use statedb::{StateDb, StateError};
