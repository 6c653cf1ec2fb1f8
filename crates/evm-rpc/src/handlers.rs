//! どこで: HTTPハンドラ / 何を: accounts参照と/tx提出とreceipt参照 / なぜ: 正本読みと送信経路を薄い面で公開するため

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use alloy_primitives::{Log, B256};
use evm_core::receipt::StoredReceipt;
use evm_core::tx_recovery::RecoveredTx;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::args::{parse_address, prepare_transaction, SendTxArgs};
use crate::AppState;

type HandlerError = (StatusCode, String);

// Lookup and signing failures surface as 500 with the error text; there is
// no dedicated 404 on this surface.
fn internal(err: impl std::fmt::Debug) -> HandlerError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:?}"))
}

#[derive(Debug, Serialize)]
pub struct JsonAccount {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Balance")]
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct JsonAccountList {
    #[serde(rename = "Accounts")]
    pub accounts: Vec<JsonAccount>,
}

#[derive(Debug, Serialize)]
pub struct TxHashReply {
    #[serde(rename = "TxHash")]
    pub tx_hash: String,
}

/// GET /accounts: every unlocked keystore account with its canonical
/// balance.
pub async fn accounts(
    State(state): State<AppState>,
) -> Result<Json<JsonAccountList>, HandlerError> {
    let _guard = state.lock().await;

    let accounts = state
        .keystore
        .addresses()
        .map(|address| JsonAccount {
            address: format!("{address:#x}"),
            balance: state.engine.balance(address).to_string(),
        })
        .collect();
    Ok(Json(JsonAccountList { accounts }))
}

/// POST /tx: fill defaults, sign with the unlocked key, hand the raw bytes
/// to the driver's mempool.
pub async fn send_tx(
    State(state): State<AppState>,
    Json(args): Json<SendTxArgs>,
) -> Result<Json<TxHashReply>, HandlerError> {
    let _guard = state.lock().await;
    debug!(from = %args.from, "send tx");

    let from = parse_address(&args.from).map_err(internal)?;
    let signer = state
        .keystore
        .signer(&from)
        .ok_or_else(|| internal(format!("unknown account {from:#x}")))?;
    let nonce = args.nonce.unwrap_or_else(|| state.engine.nonce(&from));

    let prepared = prepare_transaction(&args, nonce, signer).map_err(internal)?;
    state
        .driver
        .broadcast_tx_sync(&prepared.raw)
        .await
        .map_err(internal)?;

    Ok(Json(TxHashReply {
        tx_hash: format!("{:#x}", prepared.hash),
    }))
}

/// GET /tx/{hash}: stored transaction joined with its stored receipt.
pub async fn tx_receipt(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, HandlerError> {
    let _guard = state.lock().await;

    let hash = parse_hash(&hash).map_err(internal)?;
    debug!(%hash, "receipt lookup");
    let tx = state.engine.transaction(&hash).map_err(internal)?;
    let receipt = state.engine.receipt(&hash).map_err(internal)?;
    Ok(Json(receipt_fields(&tx, &receipt)))
}

fn parse_hash(raw: &str) -> Result<B256, String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(stripped).map_err(|err| err.to_string())?;
    if bytes.len() != 32 {
        return Err(format!("hash must be 32 bytes, got {}", bytes.len()));
    }
    Ok(B256::from_slice(&bytes))
}

pub(crate) fn receipt_fields(tx: &RecoveredTx, receipt: &StoredReceipt) -> Value {
    let mut fields = json!({
        "root": format!("{:#x}", receipt.post_state),
        "transactionHash": format!("{:#x}", receipt.tx_hash),
        "from": format!("{:#x}", tx.from),
        "to": tx.to.map(|to| format!("{to:#x}")),
        "gasUsed": hex_u64(receipt.gas_used),
        "cumulativeGasUsed": hex_u64(receipt.cumulative_gas_used),
        "contractAddress": Value::Null,
        "logs": receipt.logs.iter().map(log_fields).collect::<Vec<_>>(),
        "logsBloom": format!("0x{}", hex::encode(receipt.bloom.as_slice())),
    });
    // All-zero means "not a creation" in the stored form.
    if receipt.has_contract_address() {
        fields["contractAddress"] = json!(format!("{:#x}", receipt.contract_address));
    }
    fields
}

fn log_fields(log: &Log) -> Value {
    json!({
        "address": format!("{:#x}", log.address),
        "topics": log
            .data
            .topics()
            .iter()
            .map(|topic| format!("{topic:#x}"))
            .collect::<Vec<_>>(),
        "data": format!("0x{}", hex::encode(&log.data.data)),
    })
}

fn hex_u64(value: u64) -> String {
    format!("{value:#x}")
}

#[cfg(test)]
mod tests {
    use super::{parse_hash, receipt_fields};
    use alloy_primitives::{Address, B256, U256};
    use evm_core::receipt::Receipt;
    use evm_core::tx_recovery::RecoveredTx;
    use evm_core::CHAIN_ID;

    fn sample_tx(to: Option<Address>) -> RecoveredTx {
        RecoveredTx {
            hash: B256::with_last_byte(9),
            from: Address::from([0x01u8; 20]),
            to,
            nonce: 0,
            value: U256::ZERO,
            input: Vec::new(),
            gas_limit: 21_000,
            gas_price: Some(0),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            chain_id: Some(CHAIN_ID),
            tx_type: 0,
            raw: Vec::new(),
        }
    }

    #[test]
    fn receipt_json_carries_the_documented_fields() {
        let tx = sample_tx(Some(Address::from([0x02u8; 20])));
        let receipt = Receipt::new(
            B256::with_last_byte(1),
            21_000,
            21_000,
            tx.hash,
            None,
            Vec::new(),
        )
        .to_stored();

        let fields = receipt_fields(&tx, &receipt);
        assert_eq!(fields["gasUsed"], "0x5208");
        assert_eq!(fields["cumulativeGasUsed"], "0x5208");
        assert!(fields["contractAddress"].is_null());
        assert!(fields["to"].is_string());
        assert!(fields["logs"].as_array().expect("logs").is_empty());
        assert!(fields["logsBloom"]
            .as_str()
            .expect("bloom")
            .starts_with("0x"));
    }

    #[test]
    fn creation_receipts_expose_the_contract_address() {
        let tx = sample_tx(None);
        let contract = Address::from([0x03u8; 20]);
        let receipt = Receipt::new(
            B256::with_last_byte(2),
            53_000,
            53_000,
            tx.hash,
            Some(contract),
            Vec::new(),
        )
        .to_stored();

        let fields = receipt_fields(&tx, &receipt);
        assert!(fields["to"].is_null());
        assert_eq!(
            fields["contractAddress"],
            format!("{contract:#x}").as_str()
        );
    }

    #[test]
    fn hashes_parse_with_and_without_prefix() {
        let hex = "11".repeat(32);
        assert!(parse_hash(&hex).is_ok());
        assert!(parse_hash(&format!("0x{hex}")).is_ok());
        assert!(parse_hash("0x1234").is_err());
    }
}
