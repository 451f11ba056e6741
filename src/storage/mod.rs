//! Storage and persistence layer
//!
//! - Key file operations
//! - Key management
//! - Data models

mod file_system;
mod keys;
mod models;

pub use file_system::{KeyStore, DEFAULT_KEY_FILE};
pub use keys::{decode_key_array, encode_key_array, KeyManager, Keypair, KEYPAIR_LENGTH};
pub use models::{format_fixed, WalletListing, WalletRecord, WalletStore};
