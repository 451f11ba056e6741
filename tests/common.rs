//! Common test utilities for wallet integration tests
//!
//! This module provides shared test infrastructure including:
//! - Isolated key files in a temp directory
//! - An in-memory ledger with scripted transactions, failures and delays
//! - Fixed and failing rate sources
#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use lamport_wallet::error::{LedgerError, RateError};
use lamport_wallet::ledger::transfer::transfer_message;
use lamport_wallet::ledger::wire::{CompiledInstruction, Transaction};
use lamport_wallet::ledger::{LedgerClient, Pubkey, RawTransaction, SYSTEM_PROGRAM_ID};
use lamport_wallet::rates::{FixedRate, RateSource};
use lamport_wallet::storage::{KeyStore, Keypair};
use lamport_wallet::{WalletConfig, WalletManager};

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// Test environment with automatic cleanup
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub ledger: Arc<MockLedger>,
    pub manager: WalletManager,
}

impl TestEnvironment {
    pub fn new(ledger: MockLedger, rate: Arc<dyn RateSource>) -> anyhow::Result<Self> {
        init_logging();

        let temp_dir = TempDir::new()?;
        log::info!("Test directory: {:?}", temp_dir.path());

        let config = WalletConfig {
            key_file: temp_dir.path().join("wallets.json"),
            ..WalletConfig::default()
        };
        let store = KeyStore::with_path(config.key_file.clone());
        let ledger = Arc::new(ledger);
        let manager = WalletManager::new_with_parts(
            config,
            store,
            ledger.clone() as Arc<dyn LedgerClient>,
            rate,
        );

        Ok(Self {
            temp_dir,
            ledger,
            manager,
        })
    }

    /// Empty ledger, SOL at 5.00 EUR
    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::new(MockLedger::new(), fixed_rate("5.00"))
    }

    pub fn key_file(&self) -> PathBuf {
        self.manager.store.path().to_path_buf()
    }

    pub fn key_file_bytes(&self) -> Vec<u8> {
        std::fs::read(self.key_file()).unwrap()
    }
}

pub fn fixed_rate(rate: &str) -> Arc<dyn RateSource> {
    Arc::new(FixedRate(rate.parse::<Decimal>().unwrap()))
}

/// Rate source that is always down
pub struct FailingRate;

#[async_trait]
impl RateSource for FailingRate {
    async fn sol_eur_rate(&self) -> Result<Decimal, RateError> {
        Err(RateError::Api("EService:Unavailable".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransfer {
    pub from: Pubkey,
    pub to: Pubkey,
    pub lamports: u64,
}

struct ScriptedTransaction {
    raw: RawTransaction,
    block_time: i64,
    delay: Duration,
}

/// In-memory ledger.
///
/// Transactions are registered per signature; each can be delayed or made to
/// fail. Tracks how many fetches ran and the peak number in flight.
#[derive(Default)]
pub struct MockLedger {
    balances: HashMap<Pubkey, u64>,
    signatures: Vec<String>,
    transactions: HashMap<String, ScriptedTransaction>,
    failing: HashSet<String>,
    pub fetches: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub submitted: Mutex<Vec<SubmittedTransfer>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, address: Pubkey, lamports: u64) -> Self {
        self.balances.insert(address, lamports);
        self
    }

    pub fn with_transaction(
        mut self,
        signature: &str,
        bytes: Vec<u8>,
        block_time: i64,
        delay: Duration,
    ) -> Self {
        let slot = self.signatures.len() as u64 + 100;
        self.signatures.push(signature.to_string());
        self.transactions.insert(
            signature.to_string(),
            ScriptedTransaction {
                raw: RawTransaction {
                    slot,
                    bytes,
                    loaded_addresses: Vec::new(),
                },
                block_time,
                delay,
            },
        );
        self
    }

    pub fn failing_on(mut self, signature: &str) -> Self {
        self.failing.insert(signature.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<SubmittedTransfer> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, LedgerError> {
        Ok(self.balances.get(address).copied().unwrap_or(0))
    }

    async fn get_signatures_for_address(
        &self,
        _address: &Pubkey,
    ) -> Result<Vec<String>, LedgerError> {
        Ok(self.signatures.clone())
    }

    async fn get_transaction(&self, signature: &str) -> Result<RawTransaction, LedgerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let scripted = self.transactions.get(signature);
        if let Some(scripted) = scripted {
            tokio::time::sleep(scripted.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(signature) {
            return Err(LedgerError::Rpc {
                code: -32603,
                message: "internal error".to_string(),
            });
        }
        scripted
            .map(|s| s.raw.clone())
            .ok_or_else(|| LedgerError::NotFound(signature.to_string()))
    }

    async fn get_block_time(&self, slot: u64) -> Result<i64, LedgerError> {
        self.transactions
            .values()
            .find(|s| s.raw.slot == slot)
            .map(|s| s.block_time)
            .ok_or_else(|| LedgerError::NotFound(format!("slot {}", slot)))
    }

    async fn submit_signed_transfer(
        &self,
        from: &Keypair,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<String, LedgerError> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(SubmittedTransfer {
            from: from.pubkey(),
            to: *to,
            lamports,
        });
        Ok(format!("mock-signature-{}", submitted.len()))
    }
}

pub fn key(byte: u8) -> Pubkey {
    Pubkey::new([byte; 32])
}

/// Wire bytes of a single System transfer `from -> to`.
pub fn transfer_bytes(from: &Pubkey, to: &Pubkey, lamports: u64) -> Vec<u8> {
    Transaction {
        signatures: vec![[0u8; 64]],
        message: transfer_message(from, to, lamports, [7u8; 32]),
    }
    .encode()
}

/// Wire bytes of a transaction with arbitrary instructions over `keys`.
pub fn transaction_bytes(keys: Vec<Pubkey>, instructions: Vec<CompiledInstruction>) -> Vec<u8> {
    let mut message = transfer_message(&keys[0], &SYSTEM_PROGRAM_ID, 0, [7u8; 32]);
    message.account_keys = keys;
    message.instructions = instructions;
    Transaction {
        signatures: vec![[0u8; 64]],
        message,
    }
    .encode()
}
