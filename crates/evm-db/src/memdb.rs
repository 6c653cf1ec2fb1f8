//! どこで: 揮発KVストア / 何を: 順序付きmapとバッチ適用 / なぜ: 再起動で消える前提の決定的ストアのため

use std::collections::BTreeMap;

use parking_lot::RwLock;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    Closed,
}

#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push((key, Some(value)));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push((key, None));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

struct Inner {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
    closed: bool,
}

/// In-memory backing store shared by the state trie and the tx/receipt
/// namespaces. Nothing here survives process exit.
pub struct MemDb {
    inner: RwLock<Inner>,
}

impl MemDb {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                map: BTreeMap::new(),
                closed: false,
            }),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.read().map.get(key).cloned()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.inner.read().map.contains_key(key)
    }

    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(StoreError::Closed);
        }
        inner.map.insert(key, value);
        Ok(())
    }

    /// Applies every op under one write-lock acquisition; readers observe
    /// either none or all of the batch.
    pub fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(StoreError::Closed);
        }
        for (key, value) in batch.ops {
            match value {
                Some(value) => {
                    inner.map.insert(key, value);
                }
                None => {
                    inner.map.remove(&key);
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().map.is_empty()
    }

    /// Rejects all subsequent writes. Reads keep working so failure windows
    /// stay observable in tests.
    pub fn close(&self) {
        self.inner.write().closed = true;
    }
}

impl Default for MemDb {
    fn default() -> Self {
        Self::new()
    }
}
