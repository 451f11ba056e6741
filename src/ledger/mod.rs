//! Ledger access
//!
//! - Account addresses
//! - Transaction wire format
//! - Native transfer building
//! - JSON-RPC client

mod client;
mod pubkey;
mod rpc;
pub mod transfer;
pub mod types;
pub mod wire;

pub use client::{LedgerClient, RawTransaction};
pub use pubkey::{Pubkey, PUBKEY_LENGTH, SYSTEM_PROGRAM_ID};
pub use rpc::{RpcClient, DEFAULT_RPC_URL};
