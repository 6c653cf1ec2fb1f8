//! どこで: evm-core の Eth署名復元境界
//! 何を: alloy-consensus/k256 依存を1箇所に隔離
//! なぜ: 依存汚染範囲を最小化して driver向け検証を一点に集約するため

use alloy_consensus::transaction::SignerRecoverable;
use alloy_consensus::{Transaction, TxEnvelope};
use alloy_eips::eip2718::{Decodable2718, Eip2718Error};
use alloy_eips::Typed2718;
use alloy_primitives::{Address, TxKind, B256, U256};

use crate::CHAIN_ID;

const TX_TYPE_EIP4844: u8 = 0x03;
const TX_TYPE_EIP7702: u8 = 0x04;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecoveryError {
    EmptyInput,
    UnsupportedType,
    LegacyChainIdMissing,
    WrongChainId,
    InvalidSignature,
    InvalidRlp,
    TrailingBytes,
}

/// Flat view of a recovered signed transaction, plus the raw bytes it came
/// from. `to == None` means contract creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecoveredTx {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub input: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub chain_id: Option<u64>,
    pub tx_type: u8,
    pub raw: Vec<u8>,
}

impl RecoveredTx {
    /// Price the EVM charges per gas unit; dynamic-fee txs fall back to
    /// their fee cap (this chain runs with a zero base fee).
    pub fn effective_gas_price(&self) -> u128 {
        self.gas_price.or(self.max_fee_per_gas).unwrap_or(0)
    }

    /// Admission cost: value + gas_limit * gas price.
    pub fn cost(&self) -> U256 {
        let gas = U256::from(self.gas_limit)
            .saturating_mul(U256::from(self.effective_gas_price()));
        self.value.saturating_add(gas)
    }

    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

pub fn recover_tx(bytes: &[u8]) -> Result<RecoveredTx, RecoveryError> {
    if bytes.is_empty() {
        return Err(RecoveryError::EmptyInput);
    }
    if should_reject_typed_prefix(bytes[0]) {
        return Err(RecoveryError::UnsupportedType);
    }

    let envelope = TxEnvelope::decode_2718_exact(bytes).map_err(map_eip2718_error)?;

    match envelope.chain_id() {
        None => return Err(RecoveryError::LegacyChainIdMissing),
        Some(chain_id) if chain_id != CHAIN_ID => return Err(RecoveryError::WrongChainId),
        _ => {}
    }

    let sender = envelope
        .recover_signer()
        .map_err(|_| RecoveryError::InvalidSignature)?;
    let hash = *envelope.tx_hash();

    let recovered = match envelope {
        TxEnvelope::Legacy(tx) => recovered_from_tx(tx.tx(), sender, tx.ty()),
        TxEnvelope::Eip2930(tx) => recovered_from_tx(tx.tx(), sender, tx.ty()),
        TxEnvelope::Eip1559(tx) => recovered_from_tx(tx.tx(), sender, tx.ty()),
        TxEnvelope::Eip4844(tx) => recovered_from_tx(tx.tx(), sender, tx.ty()),
        TxEnvelope::Eip7702(tx) => recovered_from_tx(tx.tx(), sender, tx.ty()),
    };
    Ok(RecoveredTx {
        hash,
        raw: bytes.to_vec(),
        ..recovered
    })
}

fn should_reject_typed_prefix(first_byte: u8) -> bool {
    first_byte == TX_TYPE_EIP4844 || first_byte == TX_TYPE_EIP7702
}

fn recovered_from_tx<T: Transaction>(tx: &T, from: Address, tx_type: u8) -> RecoveredTx {
    let to = match tx.kind() {
        TxKind::Call(addr) => Some(addr),
        TxKind::Create => None,
    };
    let is_dynamic_fee = tx.is_dynamic_fee();
    let gas_price = if is_dynamic_fee { None } else { tx.gas_price() };
    let max_fee_per_gas = if is_dynamic_fee {
        Some(tx.max_fee_per_gas())
    } else {
        None
    };
    let max_priority_fee_per_gas = if is_dynamic_fee {
        tx.max_priority_fee_per_gas()
    } else {
        None
    };
    RecoveredTx {
        hash: B256::ZERO,
        from,
        to,
        nonce: tx.nonce(),
        value: tx.value(),
        input: tx.input().to_vec(),
        gas_limit: tx.gas_limit(),
        gas_price,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        chain_id: tx.chain_id(),
        tx_type,
        raw: Vec::new(),
    }
}

fn map_eip2718_error(error: Eip2718Error) -> RecoveryError {
    match error {
        Eip2718Error::UnexpectedType(_) => RecoveryError::UnsupportedType,
        Eip2718Error::RlpError(alloy_rlp::Error::UnexpectedLength) => RecoveryError::TrailingBytes,
        Eip2718Error::RlpError(_) => RecoveryError::InvalidRlp,
        _ => RecoveryError::InvalidRlp,
    }
}

#[cfg(test)]
mod tests {
    use super::{recover_tx, should_reject_typed_prefix, RecoveryError};

    #[test]
    fn unsupported_typed_prefixes_are_rejected_early() {
        assert!(should_reject_typed_prefix(0x03));
        assert!(should_reject_typed_prefix(0x04));
        assert!(!should_reject_typed_prefix(0x01));
        assert!(!should_reject_typed_prefix(0x02));
    }

    #[test]
    fn empty_and_garbage_input_fail_cleanly() {
        assert_eq!(recover_tx(&[]).err(), Some(RecoveryError::EmptyInput));
        assert_eq!(recover_tx(&[0x03]).err(), Some(RecoveryError::UnsupportedType));
        assert_eq!(
            recover_tx(&[0xc0, 0xff, 0xee]).err(),
            Some(RecoveryError::InvalidRlp)
        );
    }
}
