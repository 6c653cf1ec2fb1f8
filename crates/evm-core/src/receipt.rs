//! どこで: レシートの生成と保存形 / 何を: post-root/gas/logs/bloomの2つのRLP形 / なぜ: hash引き参照と互換encodeを両立するため

use alloy_primitives::{Address, Bloom, Log, B256};
use alloy_rlp::{encode as rlp_encode, Decodable, RlpDecodable, RlpEncodable};

/// Per-transaction execution summary held in the WAS until commit.
/// `contract_address == Address::ZERO` means "not a creation" in the stored
/// form; the lookup format cannot represent a creation at the zero address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Receipt {
    pub post_state: B256,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub tx_hash: B256,
    pub contract_address: Address,
    pub logs: Vec<Log>,
    pub bloom: Bloom,
}

impl Receipt {
    pub fn new(
        post_state: B256,
        cumulative_gas_used: u64,
        gas_used: u64,
        tx_hash: B256,
        contract_address: Option<Address>,
        logs: Vec<Log>,
    ) -> Self {
        let bloom = logs_bloom(&logs);
        Self {
            post_state,
            cumulative_gas_used,
            gas_used,
            tx_hash,
            contract_address: contract_address.unwrap_or(Address::ZERO),
            logs,
            bloom,
        }
    }

    pub fn has_contract_address(&self) -> bool {
        self.contract_address != Address::ZERO
    }

    /// Consensus wire form: post-state root, cumulative gas, bloom, logs.
    pub fn encode_wire(&self) -> Vec<u8> {
        let wire = WireReceipt {
            post_state: self.post_state,
            cumulative_gas_used: self.cumulative_gas_used,
            bloom: self.bloom,
            logs: self.logs.clone(),
        };
        rlp_encode(&wire)
    }

    /// Storage form: wire fields plus the redundant lookup fields.
    pub fn to_stored(&self) -> StoredReceipt {
        StoredReceipt {
            post_state: self.post_state,
            cumulative_gas_used: self.cumulative_gas_used,
            bloom: self.bloom,
            tx_hash: self.tx_hash,
            contract_address: self.contract_address,
            logs: self.logs.clone(),
            gas_used: self.gas_used,
        }
    }
}

#[derive(Clone, Debug, RlpEncodable)]
struct WireReceipt {
    post_state: B256,
    cumulative_gas_used: u64,
    bloom: Bloom,
    logs: Vec<Log>,
}

/// RLP-stored receipt, keyed under the `receipts-` namespace.
#[derive(Clone, Debug, Eq, PartialEq, RlpEncodable, RlpDecodable)]
pub struct StoredReceipt {
    pub post_state: B256,
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub tx_hash: B256,
    pub contract_address: Address,
    pub logs: Vec<Log>,
    pub gas_used: u64,
}

impl StoredReceipt {
    pub fn encode(&self) -> Vec<u8> {
        rlp_encode(self)
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Self, alloy_rlp::Error> {
        <StoredReceipt as Decodable>::decode(&mut bytes)
    }

    pub fn has_contract_address(&self) -> bool {
        self.contract_address != Address::ZERO
    }
}

pub fn logs_bloom(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::default();
    for log in logs.iter() {
        bloom.accrue_log(log);
    }
    bloom
}
