//! どこで: ストレージの土台 / 何を: 揮発KVストアとバッチ書き込み / なぜ: commit境界の原子性を一点に集約するため

pub mod keys;
pub mod memdb;

pub use memdb::{MemDb, StoreError, WriteBatch};
