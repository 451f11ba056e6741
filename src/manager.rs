/// Wallet Manager - Orchestration Layer
///
/// Binds the key store, the ledger client, the history aggregator and the
/// rate source behind one facade for the command layer.
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::WalletConfig;
use crate::error::{RateError, StorageError, WalletError};
use crate::history::{HistoryAggregator, TransferEvent};
use crate::ledger::{LedgerClient, Pubkey, RpcClient};
use crate::rates::{KrakenRateSource, RateSource};
use crate::storage::{KeyManager, KeyStore, Keypair, WalletListing};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Result of creating or importing a stored wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub alias: String,
    pub public_key: String,
}

/// A freshly generated paper wallet. The seed phrase is shown once and never
/// written anywhere.
#[derive(Debug, Clone)]
pub struct PaperWallet {
    pub mnemonic: String,
    pub public_key: String,
}

pub struct WalletManager {
    pub config: WalletConfig,
    pub store: KeyStore,
    ledger: Arc<dyn LedgerClient>,
    rates: Arc<dyn RateSource>,
    history: HistoryAggregator,
    // In-memory only; overrides the active stored wallet while set
    paper_wallet: Option<Keypair>,
}

impl WalletManager {
    // ============================================================================
    // Constructor
    // ============================================================================

    pub fn new() -> Result<Self, WalletError> {
        Self::new_with_config(WalletConfig::from_env())
    }

    pub fn new_with_config(config: WalletConfig) -> Result<Self, WalletError> {
        let store = KeyStore::with_path(config.key_file.clone());
        let ledger: Arc<dyn LedgerClient> = Arc::new(RpcClient::with_timeouts(
            config.rpc_url.clone(),
            config.rpc_timeout,
            config.confirm_timeout,
        )?);
        let rates: Arc<dyn RateSource> = Arc::new(KrakenRateSource::new(
            config.rate_url.clone(),
            config.rpc_timeout,
        )?);

        Ok(Self::new_with_parts(config, store, ledger, rates))
    }

    /// Create WalletManager with custom collaborators (for testing)
    pub fn new_with_parts(
        config: WalletConfig,
        store: KeyStore,
        ledger: Arc<dyn LedgerClient>,
        rates: Arc<dyn RateSource>,
    ) -> Self {
        let history = HistoryAggregator::with_limits(
            Arc::clone(&ledger),
            config.history_concurrency,
            config.rpc_timeout,
        );

        Self {
            config,
            store,
            ledger,
            rates,
            history,
            paper_wallet: None,
        }
    }

    // ============================================================================
    // Wallet Lifecycle
    // ============================================================================

    /// Generate a keypair and store it under `alias` (or a random
    /// `<word>-wallet` alias). The new wallet becomes active.
    pub fn create_wallet(&self, alias: Option<&str>) -> Result<WalletInfo, WalletError> {
        let keypair = KeyManager::generate();
        self.store_keypair(alias, &keypair)
    }

    /// Store an existing private key, given as base58 or as a byte array.
    pub fn import_wallet(
        &self,
        alias: Option<&str>,
        private_key: &str,
    ) -> Result<WalletInfo, WalletError> {
        let keypair = Keypair::parse(private_key)?;
        keypair.signing_key()?;
        self.store_keypair(alias, &keypair)
    }

    fn store_keypair(
        &self,
        alias: Option<&str>,
        keypair: &Keypair,
    ) -> Result<WalletInfo, WalletError> {
        let alias = match alias {
            Some(alias) if !alias.trim().is_empty() => alias.trim().to_string(),
            _ => KeyManager::random_alias(),
        };
        let public_key = keypair.pubkey().to_string();

        self.store.write_new_wallet(&alias, keypair, &public_key)?;
        log::info!("Created wallet '{}' ({})", alias, public_key);

        Ok(WalletInfo { alias, public_key })
    }

    pub fn switch_wallet(&self, alias: &str) -> Result<(), WalletError> {
        self.store.set_active(alias)?;
        Ok(())
    }

    pub async fn list_wallets(&self) -> Result<Vec<WalletListing>, WalletError> {
        self.store.list_all(self.rates.as_ref()).await
    }

    /// Whether the key file exists and holds at least one wallet.
    pub fn has_wallets(&self) -> Result<bool, WalletError> {
        if !self.store.is_store_present()? {
            return Ok(false);
        }
        Ok(!self.store.load()?.wallets.is_empty())
    }

    // ============================================================================
    // Paper Wallets
    // ============================================================================

    pub fn generate_paper_wallet(&mut self) -> Result<PaperWallet, WalletError> {
        let (mnemonic, keypair) = KeyManager::generate_with_mnemonic()?;
        let public_key = keypair.pubkey().to_string();
        self.paper_wallet = Some(keypair);

        log::info!("Paper wallet loaded: {}", public_key);
        Ok(PaperWallet {
            mnemonic: mnemonic.to_string(),
            public_key,
        })
    }

    pub fn import_paper_wallet(&mut self, words: &str) -> Result<String, WalletError> {
        let keypair = KeyManager::from_mnemonic(words)?;
        let public_key = keypair.pubkey().to_string();
        self.paper_wallet = Some(keypair);

        log::info!("Paper wallet imported: {}", public_key);
        Ok(public_key)
    }

    pub fn validate_seed(&self, words: &str) -> Result<(), WalletError> {
        KeyManager::validate_seed(words)
    }

    pub fn has_paper_wallet(&self) -> bool {
        self.paper_wallet.is_some()
    }

    pub fn clear_paper_wallet(&mut self) {
        self.paper_wallet = None;
    }

    // ============================================================================
    // Addresses
    // ============================================================================

    /// Address of the loaded paper wallet, or else of the active stored wallet.
    pub fn current_address(&self) -> Result<Pubkey, WalletError> {
        if let Some(paper) = &self.paper_wallet {
            return Ok(paper.pubkey());
        }

        let store = self.store.load()?;
        let record = store.active().ok_or(StorageError::ActiveWalletNotFound)?;
        parse_stored_address(&store.active_alias, &record.public_key)
    }

    pub fn address_by_alias(&self, alias: &str) -> Result<Pubkey, WalletError> {
        let text = self.store.public_key_by_alias(alias)?;
        parse_stored_address(alias, &text)
    }

    // ============================================================================
    // Balance & Rates
    // ============================================================================

    /// Balance in lamports. With an alias, the address is derived from that
    /// wallet's stored keypair.
    pub async fn balance_lamports(&self, alias: Option<&str>) -> Result<u64, WalletError> {
        let address = match alias {
            Some(alias) => self.store.private_key_by_alias(alias)?.derive_pubkey(),
            None => self.current_address()?,
        };
        Ok(self.ledger.get_balance(&address).await?)
    }

    pub async fn balance_sol(&self, alias: Option<&str>) -> Result<Decimal, WalletError> {
        let lamports = self.balance_lamports(alias).await?;
        Ok(lamports_to_sol(lamports))
    }

    /// Balance in EUR, rounded to cents.
    pub async fn balance_eur(&self, alias: Option<&str>) -> Result<Decimal, WalletError> {
        let lamports = self.balance_lamports(alias).await?;
        let rate = self.exchange_rate().await?;
        Ok(lamports_to_eur(lamports, rate))
    }

    pub async fn exchange_rate(&self) -> Result<Decimal, WalletError> {
        Ok(self.rates.sol_eur_rate().await?)
    }

    // ============================================================================
    // History & Transfers
    // ============================================================================

    /// Native transfers touching the current address, newest first.
    pub async fn transaction_history(&self) -> Result<Vec<TransferEvent>, WalletError> {
        let address = self.current_address()?;
        let mut events = self.history.fetch_transfers(&address).await?;
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    /// Send `eur` worth of SOL from the current wallet to `recipient`.
    /// Returns the confirmed transaction signature.
    pub async fn send_funds(&self, eur: Decimal, recipient: &str) -> Result<String, WalletError> {
        if eur <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount(format!(
                "amount must be positive, got {}",
                eur
            )));
        }

        let to = Pubkey::from_str(recipient.trim())
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", recipient, e)))?;

        let rate = self.exchange_rate().await?;
        let lamports = eur_to_lamports(eur, rate)?;
        if lamports == 0 {
            return Err(WalletError::InvalidAmount(format!(
                "€ {} is less than one lamport",
                eur
            )));
        }

        let keypair = match &self.paper_wallet {
            Some(paper) => paper.clone(),
            None => self.store.current_private_key()?,
        };

        log::info!("Sending {} lamports (€ {}) to {}", lamports, eur, to);
        let signature = self
            .ledger
            .submit_signed_transfer(&keypair, &to, lamports)
            .await?;
        Ok(signature)
    }
}

fn parse_stored_address(alias: &str, text: &str) -> Result<Pubkey, WalletError> {
    Pubkey::from_str(text).map_err(|source| {
        StorageError::InvalidKey {
            alias: alias.to_string(),
            source,
        }
        .into()
    })
}

pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

/// `lamports / 10^9 × rate`, rounded half away from zero to 2 dp.
pub fn lamports_to_eur(lamports: u64, rate: Decimal) -> Decimal {
    (lamports_to_sol(lamports) * rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `eur / rate × 10^9`, truncated to whole lamports.
pub fn eur_to_lamports(eur: Decimal, rate: Decimal) -> Result<u64, WalletError> {
    if rate <= Decimal::ZERO {
        return Err(RateError::InvalidRate(rate.to_string()).into());
    }

    let sol = eur
        .checked_div(rate)
        .ok_or_else(|| WalletError::InvalidAmount(eur.to_string()))?;
    let lamports = sol
        .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
        .ok_or_else(|| WalletError::InvalidAmount(eur.to_string()))?;

    lamports
        .trunc()
        .to_u64()
        .ok_or_else(|| WalletError::InvalidAmount(eur.to_string()))
}
