/// Wallet configuration from environment variables
///
/// Controls the Solana RPC endpoint, key file location, rate source and the
/// history fetch limits. Defaults to devnet.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::history::{DEFAULT_MAX_CONCURRENCY, DEFAULT_TASK_TIMEOUT};
use crate::ledger::DEFAULT_RPC_URL;
use crate::rates::DEFAULT_RATE_URL;
use crate::storage::DEFAULT_KEY_FILE;

const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct WalletConfig {
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,
    /// Multi-wallet key file
    pub key_file: PathBuf,
    /// SOL/EUR ticker endpoint
    pub rate_url: String,
    /// Max in-flight transaction fetches when building history
    pub history_concurrency: usize,
    /// Per-transaction fetch timeout
    pub rpc_timeout: Duration,
    /// How long `send` waits for confirmation
    pub confirm_timeout: Duration,
}

impl WalletConfig {
    /// Load configuration from `.env` and environment variables
    ///
    /// Environment variables:
    /// - `SOLANA_RPC_URL`: RPC endpoint (default devnet)
    /// - `WALLET_KEY_FILE`: key file path (default `standard.solana-keygen.json`)
    /// - `RATE_API_URL`: SOL/EUR ticker URL
    /// - `HISTORY_CONCURRENCY`: in-flight history fetches (default 50)
    /// - `RPC_TIMEOUT_SECS`: per-transaction timeout (default 10)
    /// - `CONFIRM_TIMEOUT_SECS`: send confirmation deadline (default 60)
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Local validator
    /// SOLANA_RPC_URL=http://127.0.0.1:8899 lamport-wallet balance
    /// ```
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let rpc_url = env::var("SOLANA_RPC_URL").unwrap_or(defaults.rpc_url);
        log::info!("RPC endpoint: {}", rpc_url);

        let key_file = env::var("WALLET_KEY_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.key_file);
        log::debug!("Key file: {}", key_file.display());

        let rate_url = env::var("RATE_API_URL").unwrap_or(defaults.rate_url);

        let history_concurrency =
            parse_var("HISTORY_CONCURRENCY").unwrap_or(defaults.history_concurrency);
        let rpc_timeout = parse_var("RPC_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.rpc_timeout);
        let confirm_timeout = parse_var("CONFIRM_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.confirm_timeout);

        Self {
            rpc_url,
            key_file,
            rate_url,
            history_concurrency,
            rpc_timeout,
            confirm_timeout,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {}='{}', using default", name, raw);
            None
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            rate_url: DEFAULT_RATE_URL.to_string(),
            history_concurrency: DEFAULT_MAX_CONCURRENCY,
            rpc_timeout: DEFAULT_TASK_TIMEOUT,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }
}
