//! Data models for the key file

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One managed wallet as persisted in the key file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    /// Keypair bytes in `solana-keygen` array form
    pub private_key: String,
    /// Advisory balance in SOL, written once at creation and never synced
    #[serde(default)]
    pub balance: Decimal,
    pub public_key: String,
}

/// Whole key file: the active selector plus every wallet by alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStore {
    #[serde(default)]
    pub active_alias: String,
    #[serde(default)]
    pub wallets: BTreeMap<String, WalletRecord>,
}

impl WalletStore {
    /// The record `active_alias` points at, if it is set and not dangling.
    pub fn active(&self) -> Option<&WalletRecord> {
        if self.active_alias.is_empty() {
            return None;
        }
        self.wallets.get(&self.active_alias)
    }
}

/// A wallet as presented by a listing, with its advisory balance in EUR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletListing {
    pub alias: String,
    pub is_active: bool,
    pub balance_eur: Decimal,
    pub public_key: String,
}

impl WalletListing {
    /// `alice (Active) // BAL - (€ 10.00)`
    pub fn label(&self) -> String {
        let mut label = self.alias.clone();
        if self.is_active {
            label.push_str(" (Active)");
        }
        label.push_str(&format!(" // BAL - (€ {})", format_fixed(self.balance_eur, 2)));
        label
    }
}

/// Fixed-point rendering, rounding half away from zero.
pub fn format_fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}
