//! どこで: KVストアのキー規約 / 何を: tx/receiptの平坦な名前空間 / なぜ: hash引きの互換キーを凍結するため

pub const HASH_LEN: usize = 32;
pub const RECEIPTS_PREFIX: &[u8] = b"receipts-";

/// Raw transactions are keyed by their 32-byte hash, verbatim.
pub fn tx_key(hash: &[u8; HASH_LEN]) -> Vec<u8> {
    hash.to_vec()
}

/// Stored receipts share the tx hash, shifted into the `receipts-` namespace.
pub fn receipt_key(hash: &[u8; HASH_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RECEIPTS_PREFIX.len() + HASH_LEN);
    out.extend_from_slice(RECEIPTS_PREFIX);
    out.extend_from_slice(hash);
    out
}
