//! Lamport Wallet: multi-wallet key custody and transfer history for Solana
//!
//! Wallets live in a single `solana-keygen` compatible JSON file with an
//! active selector. Balances are priced in EUR through a rate source, and a
//! wallet's history is rebuilt from the ledger by fetching and decoding every
//! transaction that touches it, in parallel under a fixed budget.
//!
//! # Architecture
//!
//! - **Key store**: persistent CRUD over named wallets, atomic rewrites
//! - **Ledger client**: JSON-RPC adapter behind the `LedgerClient` trait
//! - **History aggregator**: bounded concurrent fetch + System transfer decode
//! - **Rate source**: SOL/EUR lookup behind the `RateSource` trait
//! - **Wallet manager**: facade used by the command line
//!
//! # Example
//!
//! ```ignore
//! use lamport_wallet::{WalletConfig, WalletManager};
//!
//! let manager = WalletManager::new_with_config(WalletConfig::from_env())?;
//! let info = manager.create_wallet(Some("alice"))?;
//! let history = manager.transaction_history().await?;
//! ```

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod manager;
pub mod rates;
pub mod storage;

// Re-exports for convenience
pub use config::WalletConfig;
pub use error::{
    DecodeError, ErrorKind, KeyError, LedgerError, RateError, StorageError, WalletError,
};
pub use history::{HistoryAggregator, SystemInstruction, TransferEvent};
pub use ledger::{LedgerClient, Pubkey, RawTransaction, RpcClient};
pub use manager::{WalletInfo, WalletManager, LAMPORTS_PER_SOL};
pub use rates::{FixedRate, KrakenRateSource, RateSource};
pub use storage::{KeyManager, KeyStore, Keypair, WalletListing};

/// Result type alias for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;
