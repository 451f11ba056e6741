use rust_decimal::Decimal;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::keys::Keypair;
use super::models::{WalletListing, WalletRecord, WalletStore};
use crate::error::{StorageError, WalletError};
use crate::rates::RateSource;

/// Default key file name, relative to the working directory.
pub const DEFAULT_KEY_FILE: &str = "standard.solana-keygen.json";

/// Multi-wallet key store backed by a single JSON file.
///
/// Nothing is cached between calls: every operation reads the file, and every
/// mutation rewrites it whole through a temp file + rename.
#[derive(Clone, Debug)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Create a key store at the default location
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_KEY_FILE),
        }
    }

    /// Create a key store backed by a custom file (for testing)
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the key file.
    pub fn load(&self) -> Result<WalletStore, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::StoreNotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|source| StorageError::Malformed {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Missing file means "no wallets yet"; other read failures are errors.
    pub fn is_store_present(&self) -> Result<bool, StorageError> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn current_private_key(&self) -> Result<Keypair, StorageError> {
        let store = self.load()?;
        let record = store.active().ok_or(StorageError::ActiveWalletNotFound)?;
        decode_private_key(&store.active_alias, record)
    }

    pub fn private_key_by_alias(&self, alias: &str) -> Result<Keypair, StorageError> {
        let store = self.load()?;
        let record = store
            .wallets
            .get(alias)
            .ok_or_else(|| StorageError::AliasNotFound(alias.to_string()))?;
        decode_private_key(alias, record)
    }

    pub fn current_public_key(&self) -> Result<String, StorageError> {
        let store = self.load()?;
        store
            .active()
            .map(|record| record.public_key.clone())
            .ok_or(StorageError::ActiveWalletNotFound)
    }

    pub fn public_key_by_alias(&self, alias: &str) -> Result<String, StorageError> {
        let store = self.load()?;
        store
            .wallets
            .get(alias)
            .map(|record| record.public_key.clone())
            .ok_or_else(|| StorageError::AliasNotFound(alias.to_string()))
    }

    /// Point the active selector at an existing alias.
    pub fn set_active(&self, alias: &str) -> Result<(), StorageError> {
        let mut store = self.load()?;

        if !store.wallets.contains_key(alias) {
            return Err(StorageError::AliasNotFound(alias.to_string()));
        }

        store.active_alias = alias.to_string();
        self.save(&store)?;
        log::info!("Active wallet set to '{}'", alias);
        Ok(())
    }

    /// Add a wallet and make it active. Fails without touching the file when
    /// the alias is taken.
    pub fn write_new_wallet(
        &self,
        alias: &str,
        keypair: &Keypair,
        public_key: &str,
    ) -> Result<(), StorageError> {
        let mut store = if self.is_store_present()? {
            self.load()?
        } else {
            WalletStore::default()
        };

        if store.wallets.contains_key(alias) {
            return Err(StorageError::AliasExists(alias.to_string()));
        }

        store.wallets.insert(
            alias.to_string(),
            WalletRecord {
                private_key: keypair.to_array_string(),
                balance: Decimal::ZERO,
                public_key: public_key.to_string(),
            },
        );
        store.active_alias = alias.to_string();

        self.save(&store)?;
        log::info!("Wallet '{}' written to {}", alias, self.path.display());
        Ok(())
    }

    /// Every wallet, ordered by alias, with its advisory balance priced in EUR.
    ///
    /// The rate is required: if it cannot be fetched nothing is listed.
    pub async fn list_all(&self, rates: &dyn RateSource) -> Result<Vec<WalletListing>, WalletError> {
        let rate = rates.sol_eur_rate().await?;
        // no file yet means no wallets yet
        let store = if self.is_store_present()? {
            self.load()?
        } else {
            WalletStore::default()
        };

        let listings = store
            .wallets
            .iter()
            .map(|(alias, record)| WalletListing {
                alias: alias.clone(),
                is_active: *alias == store.active_alias,
                balance_eur: record.balance * rate,
                public_key: record.public_key.clone(),
            })
            .collect();

        Ok(listings)
    }

    fn save(&self, store: &WalletStore) -> Result<(), StorageError> {
        let json = serde_json::to_vec(store).map_err(|source| StorageError::Malformed {
            path: self.path.display().to_string(),
            source,
        })?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(&json)?;
        temp.as_file().sync_all()?;

        temp.persist(&self.path)
            .map_err(|e| StorageError::Persist {
                path: self.path.display().to_string(),
                source: e.error,
            })?;

        Ok(())
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_private_key(alias: &str, record: &WalletRecord) -> Result<Keypair, StorageError> {
    Keypair::from_array_string(&record.private_key).map_err(|source| StorageError::InvalidKey {
        alias: alias.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KeyManager;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, KeyStore) {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::with_path(dir.path().join("keys.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let (_dir, store) = temp_store();
        assert!(!store.is_store_present().unwrap());
        assert!(matches!(
            store.current_public_key(),
            Err(StorageError::StoreNotFound(_))
        ));
    }

    #[test]
    fn test_garbage_file_is_malformed() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.is_store_present().unwrap());
        assert!(matches!(
            store.current_private_key(),
            Err(StorageError::Malformed { .. })
        ));
    }

    #[test]
    fn test_first_write_creates_file() {
        let (_dir, store) = temp_store();
        let keypair = KeyManager::generate();
        store
            .write_new_wallet("first", &keypair, &keypair.pubkey().to_string())
            .unwrap();

        assert!(store.is_store_present().unwrap());
        assert_eq!(store.current_private_key().unwrap(), keypair);
        assert_eq!(store.private_key_by_alias("first").unwrap(), keypair);
    }

    #[test]
    fn test_bad_stored_key_is_reported_with_alias() {
        let (_dir, store) = temp_store();
        let json = r#"{"activeAlias":"a","wallets":{"a":{"privateKey":"[1,2,3]","balance":"0","publicKey":"PUBKEYA"}}}"#;
        fs::write(store.path(), json).unwrap();

        match store.current_private_key() {
            Err(StorageError::InvalidKey { alias, .. }) => assert_eq!(alias, "a"),
            other => panic!("expected InvalidKey, got {:?}", other),
        }
        // Public key lookups do not need the private half
        assert_eq!(store.current_public_key().unwrap(), "PUBKEYA");
    }
}
