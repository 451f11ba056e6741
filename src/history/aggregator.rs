use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::error::LedgerError;
use crate::history::decoder::{decode_system_transfers, TransferEvent};
use crate::ledger::wire::Transaction;
use crate::ledger::{LedgerClient, Pubkey};

pub const DEFAULT_MAX_CONCURRENCY: usize = 50;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

/// Rebuilds the native transfer history of an address from the ledger.
///
/// One signature lookup, then per signature a transaction fetch followed by a
/// block-time fetch, run in parallel under a fixed in-flight budget. The first
/// failing signature cancels everything still queued or running.
pub struct HistoryAggregator {
    client: Arc<dyn LedgerClient>,
    max_concurrency: usize,
    task_timeout: Duration,
}

impl HistoryAggregator {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self::with_limits(client, DEFAULT_MAX_CONCURRENCY, DEFAULT_TASK_TIMEOUT)
    }

    pub fn with_limits(
        client: Arc<dyn LedgerClient>,
        max_concurrency: usize,
        task_timeout: Duration,
    ) -> Self {
        Self {
            client,
            max_concurrency: max_concurrency.max(1),
            task_timeout,
        }
    }

    /// All transfers touching `address`, in completion order.
    pub async fn fetch_transfers(
        &self,
        address: &Pubkey,
    ) -> Result<Vec<TransferEvent>, LedgerError> {
        let signatures = self.client.get_signatures_for_address(address).await?;
        log::info!(
            "Fetching {} transactions for {} ({} in flight)",
            signatures.len(),
            address,
            self.max_concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for signature in signatures {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let events = Arc::clone(&events);
            let owner = *address;
            let task_timeout = self.task_timeout;

            tasks.spawn(async move {
                // closed semaphore means another task already failed
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| LedgerError::Cancelled)?;

                let decoded = tokio::time::timeout(
                    task_timeout,
                    fetch_one(client.as_ref(), &signature, &owner),
                )
                .await
                .map_err(|_| LedgerError::Timeout(task_timeout))
                .and_then(|result| result)
                .map_err(|e| e.for_signature(&signature))?;

                events.lock().await.extend(decoded);
                Ok::<(), LedgerError>(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => LedgerError::TaskFailed(e.to_string()),
            };

            log::warn!("History fetch for {} aborted: {}", address, failure);
            semaphore.close();
            tasks.abort_all();
            return Err(failure);
        }

        let events = match Arc::try_unwrap(events) {
            Ok(events) => events.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        log::debug!("Decoded {} transfers for {}", events.len(), address);
        Ok(events)
    }
}

async fn fetch_one(
    client: &dyn LedgerClient,
    signature: &str,
    owner: &Pubkey,
) -> Result<Vec<TransferEvent>, LedgerError> {
    let raw = client.get_transaction(signature).await?;
    let block_time = client.get_block_time(raw.slot).await?;

    let transaction = Transaction::decode(&raw.bytes)?;
    let timestamp = block_timestamp(block_time)?;

    Ok(decode_system_transfers(
        &transaction,
        &raw.loaded_addresses,
        timestamp,
        owner,
    )?)
}

fn block_timestamp(unix_seconds: i64) -> Result<DateTime<Utc>, LedgerError> {
    Utc.timestamp_opt(unix_seconds, 0)
        .single()
        .ok_or_else(|| LedgerError::InvalidResponse(format!("block time {}", unix_seconds)))
}
