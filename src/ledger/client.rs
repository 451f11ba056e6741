use async_trait::async_trait;

use crate::error::LedgerError;
use crate::ledger::Pubkey;
use crate::storage::Keypair;

/// A transaction as returned by the ledger, still in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    /// Slot the transaction was confirmed in
    pub slot: u64,
    /// Wire-encoded transaction bytes
    pub bytes: Vec<u8>,
    /// Accounts loaded through address lookup tables, writable first then
    /// readonly. Empty for legacy transactions.
    pub loaded_addresses: Vec<Pubkey>,
}

/// Remote ledger capabilities the wallet depends on.
///
/// The history aggregator and the wallet manager only see this trait, so any
/// transport (or an in-memory double) can stand behind it.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance in lamports at finalized commitment.
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, LedgerError>;

    /// Signatures of transactions touching `address`. Order is not meaningful.
    async fn get_signatures_for_address(&self, address: &Pubkey)
        -> Result<Vec<String>, LedgerError>;

    async fn get_transaction(&self, signature: &str) -> Result<RawTransaction, LedgerError>;

    /// Unix timestamp (seconds) of the block produced at `slot`.
    async fn get_block_time(&self, slot: u64) -> Result<i64, LedgerError>;

    /// Build, sign and send a native transfer, returning its signature once
    /// the ledger reports it confirmed.
    async fn submit_signed_transfer(
        &self,
        from: &Keypair,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<String, LedgerError>;
}
