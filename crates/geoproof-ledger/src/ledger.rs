use alloy_primitives::keccak256;
use async_trait::async_trait;
use geoproof_types::WalletAddress;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default timeout for ledger RPC requests. The orchestrator treats any
/// failure as zero prior contributions, so a short bound keeps the run
/// from stalling on a dead endpoint.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error response: {0}")]
    Rpc(String),

    #[error("Malformed RPC response: {0}")]
    Decode(String),
}

/// On-chain record of prior per-wallet submission counts.
#[async_trait]
pub trait ContributionLedger: Send + Sync {
    /// Number of files the ledger already records for the wallet.
    async fn file_count(&self, wallet: &WalletAddress) -> Result<u64, LedgerError>;
}

/// JSON-RPC client reading `contributorInfo(address)` from the DLP
/// registry contract.
pub struct RpcLedgerClient {
    http: Client,
    rpc_url: String,
    contract_address: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcLedgerClient {
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
        })
    }

    /// ABI calldata for `contributorInfo(address)`: 4-byte selector plus
    /// the address left-padded to one 32-byte word.
    fn call_data(wallet: &WalletAddress) -> String {
        let selector = &keccak256(b"contributorInfo(address)")[..4];
        let mut data = Vec::with_capacity(36);
        data.extend_from_slice(selector);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(wallet.as_bytes());
        format!("0x{}", hex::encode(data))
    }
}

#[async_trait]
impl ContributionLedger for RpcLedgerClient {
    async fn file_count(&self, wallet: &WalletAddress) -> Result<u64, LedgerError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": self.contract_address, "data": Self::call_data(wallet) },
                "latest"
            ],
        });

        debug!(wallet = %wallet, contract = %self.contract_address, "Querying contributor info");

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(LedgerError::Rpc(format!("{} (code {})", err.message, err.code)));
        }
        let raw = response
            .result
            .ok_or_else(|| LedgerError::Decode("response carries neither result nor error".to_string()))?;
        decode_file_count(&raw)
    }
}

/// `contributorInfo` returns `(address contributorAddress, uint256
/// filesListCount)`; the file count is the second 32-byte word.
fn decode_file_count(raw: &str) -> Result<u64, LedgerError> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| LedgerError::Decode(e.to_string()))?;
    if bytes.len() < 64 {
        return Err(LedgerError::Decode(format!(
            "expected at least 64 bytes, got {}",
            bytes.len()
        )));
    }

    let word = &bytes[32..64];
    if word[..24].iter().any(|b| *b != 0) {
        return Err(LedgerError::Decode("file count exceeds u64 range".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..32]);
    Ok(u64::from_be_bytes(buf))
}
