use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::LedgerError;
use crate::ledger::client::{LedgerClient, RawTransaction};
use crate::ledger::transfer::signed_transfer;
use crate::ledger::types::{
    LatestBlockhash, RpcRequest, RpcResponse, SignatureInfo, SignatureStatus,
    TransactionResponse, WithContext,
};
use crate::ledger::Pubkey;
use crate::storage::Keypair;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// JSON-RPC client for a Solana cluster.
pub struct RpcClient {
    url: String,
    http_client: reqwest::Client,
    next_id: AtomicU64,
    confirm_timeout: Duration,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, LedgerError> {
        Self::with_timeouts(url, DEFAULT_REQUEST_TIMEOUT, DEFAULT_CONFIRM_TIMEOUT)
    }

    /// `request_timeout` bounds every single HTTP call; `confirm_timeout`
    /// bounds the whole status polling loop after a send.
    pub fn with_timeouts(
        url: impl Into<String>,
        request_timeout: Duration,
        confirm_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            url: url.into(),
            http_client,
            next_id: AtomicU64::new(1),
            confirm_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call. A `null` result comes back as `Ok(None)`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        log::debug!("RPC {} -> {}", method, self.url);

        let response: RpcResponse<T> = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        what: &str,
    ) -> Result<T, LedgerError> {
        self.call(method, params)
            .await?
            .ok_or_else(|| LedgerError::NotFound(what.to_string()))
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], LedgerError> {
        let latest: WithContext<LatestBlockhash> = self
            .call_required(
                "getLatestBlockhash",
                json!([{ "commitment": "finalized" }]),
                "latest blockhash",
            )
            .await?;

        let bytes = bs58::decode(&latest.value.blockhash)
            .into_vec()
            .map_err(|e| LedgerError::InvalidResponse(format!("blockhash: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidResponse("blockhash is not 32 bytes".to_string()))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, LedgerError> {
        self.call_required(
            "sendTransaction",
            json!([BASE64.encode(wire), { "encoding": "base64" }]),
            "sendTransaction result",
        )
        .await
    }

    /// Poll signature status until confirmed, failed or past the deadline.
    async fn wait_for_confirmation(&self, signature: &str) -> Result<(), LedgerError> {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
                .call_required(
                    "getSignatureStatuses",
                    json!([[signature], { "searchTransactionHistory": true }]),
                    "signature statuses",
                )
                .await?;

            if let Some(Some(status)) = statuses.value.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(LedgerError::TransactionFailed {
                        signature: signature.to_string(),
                        reason: err.to_string(),
                    });
                }
                if status.is_confirmed() {
                    log::debug!("Transaction {} confirmed in slot {}", signature, status.slot);
                    return Ok(());
                }
            }

            if Instant::now() + STATUS_POLL_INTERVAL > deadline {
                return Err(LedgerError::ConfirmationTimeout(signature.to_string()));
            }
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, LedgerError> {
        let balance: WithContext<u64> = self
            .call_required(
                "getBalance",
                json!([address.to_string(), { "commitment": "finalized" }]),
                "balance",
            )
            .await?;
        Ok(balance.value)
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
    ) -> Result<Vec<String>, LedgerError> {
        let infos: Vec<SignatureInfo> = self
            .call("getSignaturesForAddress", json!([address.to_string()]))
            .await?
            .unwrap_or_default();

        log::debug!("{} signatures for {}", infos.len(), address);
        Ok(infos.into_iter().map(|info| info.signature).collect())
    }

    async fn get_transaction(&self, signature: &str) -> Result<RawTransaction, LedgerError> {
        let response: TransactionResponse = self
            .call_required(
                "getTransaction",
                json!([
                    signature,
                    { "encoding": "base64", "maxSupportedTransactionVersion": 0 }
                ]),
                signature,
            )
            .await?;

        let (data, encoding) = &response.transaction;
        if encoding != "base64" {
            return Err(LedgerError::InvalidResponse(format!(
                "unexpected transaction encoding: {}",
                encoding
            )));
        }
        let bytes = BASE64
            .decode(data)
            .map_err(|e| LedgerError::InvalidResponse(format!("transaction base64: {}", e)))?;

        let mut loaded_addresses = Vec::new();
        if let Some(loaded) = response.meta.and_then(|meta| meta.loaded_addresses) {
            for address in loaded.writable.iter().chain(loaded.readonly.iter()) {
                let key = Pubkey::from_str(address).map_err(|e| {
                    LedgerError::InvalidResponse(format!("loaded address {}: {}", address, e))
                })?;
                loaded_addresses.push(key);
            }
        }

        Ok(RawTransaction {
            slot: response.slot,
            bytes,
            loaded_addresses,
        })
    }

    async fn get_block_time(&self, slot: u64) -> Result<i64, LedgerError> {
        self.call_required("getBlockTime", json!([slot]), &format!("block time for slot {}", slot))
            .await
    }

    async fn submit_signed_transfer(
        &self,
        from: &Keypair,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<String, LedgerError> {
        let blockhash = self.latest_blockhash().await?;
        let transaction = signed_transfer(from, to, lamports, blockhash)?;

        let signature = self.send_transaction(&transaction.encode()).await?;
        log::info!("Submitted transfer of {} lamports to {}: {}", lamports, to, signature);

        self.wait_for_confirmation(&signature).await?;
        Ok(signature)
    }
}
