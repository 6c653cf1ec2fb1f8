//! どこで: driver RPCクライアント / 何を: broadcast_tx_syncの送信 / なぜ: 署名txをコンセンサス入口へ戻すため

use serde_json::json;
use tracing::debug;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DriverError {
    Http(String),
    Rpc(String),
}

/// JSON-RPC client for the consensus driver's RPC endpoint. Signed
/// transactions submitted over `/tx` re-enter the engine through the
/// driver's mempool.
#[derive(Clone)]
pub struct DriverClient {
    url: String,
    http: reqwest::Client,
}

impl DriverClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn broadcast_tx_sync(&self, raw_tx: &[u8]) -> Result<(), DriverError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "broadcast_tx_sync",
            "params": {"tx": hex::encode(raw_tx)},
        });
        debug!(url = %self.url, bytes = raw_tx.len(), "broadcast_tx_sync");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|err| DriverError::Http(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Http(format!("driver returned {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| DriverError::Http(err.to_string()))?;
        match body.get("error") {
            Some(err) if !err.is_null() => Err(DriverError::Rpc(err.to_string())),
            _ => Ok(()),
        }
    }
}
