use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::config::WalletConfig;
use crate::history::TransferEvent;
use crate::manager::{lamports_to_eur, WalletManager};
use crate::storage::format_fixed;

/// Solana wallet with a multi-wallet key file
#[derive(Parser, Debug)]
#[command(name = "lamport-wallet")]
#[command(about = "Manage Solana wallets, check balances in EUR, send funds and list transfers")]
#[command(version)]
pub struct Cli {
    /// Key file holding every stored wallet
    #[arg(long, global = true, env = "WALLET_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Solana JSON-RPC endpoint
    #[arg(long, global = true, env = "SOLANA_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Use a paper wallet restored from this seed phrase instead of the active wallet
    #[arg(long, global = true, env = "WALLET_SEED", hide_env_values = true)]
    pub seed: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a wallet, import a private key, or generate a paper wallet
    Init(InitArgs),
    /// Make another stored wallet the active one
    Switch {
        alias: String,
    },
    /// Show wallet addresses
    Address(AddressArgs),
    /// Show the balance in EUR
    Balance {
        /// Stored wallet to query instead of the active one
        #[arg(long)]
        alias: Option<String>,
    },
    /// Show the current SOL/EUR rate
    Exchange,
    /// Send EUR worth of SOL to an address
    Send {
        /// Amount in EUR
        amount: Decimal,
        /// Recipient address (base58)
        destination: String,
    },
    /// List native transfers, newest first
    Transactions,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Wallet alias (random `<word>-wallet` when omitted)
    #[arg(long)]
    pub alias: Option<String>,

    /// Import this private key (base58 or `[..]` byte array)
    #[arg(long, conflicts_with = "paper")]
    pub private_key: Option<String>,

    /// Generate an in-memory paper wallet and print its seed phrase
    #[arg(long, action = ArgAction::SetTrue)]
    pub paper: bool,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    /// List every stored wallet
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "alias")]
    pub all: bool,

    /// Address of a specific stored wallet
    #[arg(long)]
    pub alias: Option<String>,
}

impl Cli {
    /// Environment config with command-line overrides applied.
    pub fn config(&self) -> WalletConfig {
        let mut config = WalletConfig::from_env();
        if let Some(key_file) = &self.key_file {
            config.key_file = key_file.clone();
        }
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        config
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut manager =
        WalletManager::new_with_config(cli.config()).context("Failed to set up wallet")?;

    if let Some(seed) = &cli.seed {
        manager
            .import_paper_wallet(seed)
            .context("Failed to restore paper wallet")?;
    }

    match cli.command {
        Commands::Init(args) => init(&mut manager, args),
        Commands::Switch { alias } => {
            manager
                .switch_wallet(&alias)
                .with_context(|| format!("Failed to switch to '{}'", alias))?;
            println!("Active wallet: {}", alias);
            Ok(())
        }
        Commands::Address(args) => address(&manager, args).await,
        Commands::Balance { alias } => {
            let eur = manager
                .balance_eur(alias.as_deref())
                .await
                .context("Failed to get balance")?;
            println!("€ {}", format_fixed(eur, 2));
            Ok(())
        }
        Commands::Exchange => {
            let rate = manager.exchange_rate().await.context("Failed to get rate")?;
            println!("1 SOL = € {}", format_fixed(rate, 2));
            Ok(())
        }
        Commands::Send {
            amount,
            destination,
        } => {
            let signature = manager
                .send_funds(amount, &destination)
                .await
                .context("Failed to send funds")?;
            println!("Sent € {} to {}", format_fixed(amount, 2), destination);
            println!("Signature: {}", signature);
            Ok(())
        }
        Commands::Transactions => transactions(&manager).await,
    }
}

fn init(manager: &mut WalletManager, args: InitArgs) -> anyhow::Result<()> {
    if args.paper {
        // --seed already restored one
        let paper = if manager.has_paper_wallet() {
            None
        } else {
            Some(manager.generate_paper_wallet()?)
        };
        let address = manager.current_address()?;

        println!("Paper wallet address: {}", address);
        if let Some(paper) = paper {
            println!("Seed phrase (write it down, it is not stored):");
            println!("{}", paper.mnemonic);
        }
        return Ok(());
    }

    let info = match &args.private_key {
        Some(key) => manager
            .import_wallet(args.alias.as_deref(), key)
            .context("Failed to import wallet")?,
        None => manager
            .create_wallet(args.alias.as_deref())
            .context("Failed to create wallet")?,
    };

    println!("Wallet '{}' created and set active", info.alias);
    println!("Address: {}", info.public_key);
    Ok(())
}

async fn address(manager: &WalletManager, args: AddressArgs) -> anyhow::Result<()> {
    if args.all {
        let listings = manager.list_wallets().await.context("Failed to list wallets")?;
        if listings.is_empty() {
            println!("No wallets stored in {}", manager.store.path().display());
        }
        for listing in listings {
            println!("{}  {}", listing.label(), listing.public_key);
        }
        return Ok(());
    }

    let address = match &args.alias {
        Some(alias) => manager.address_by_alias(alias)?,
        None => manager.current_address()?,
    };
    println!("{}", address);
    Ok(())
}

async fn transactions(manager: &WalletManager) -> anyhow::Result<()> {
    let events = manager
        .transaction_history()
        .await
        .context("Failed to fetch transactions")?;
    if events.is_empty() {
        println!("No transfers found");
        return Ok(());
    }

    let rate = manager.exchange_rate().await.context("Failed to get rate")?;
    for event in &events {
        println!("{}", describe_transfer(event, rate));
    }
    Ok(())
}

fn describe_transfer(event: &TransferEvent, rate: Decimal) -> String {
    let eur = format_fixed(lamports_to_eur(event.amount, rate), 2);
    let when = event.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
    if event.is_sender {
        format!("{}  SENT      € {}  to {}", when, eur, event.to)
    } else {
        format!("{}  RECEIVED  € {}  from {}", when, eur, event.from)
    }
}
