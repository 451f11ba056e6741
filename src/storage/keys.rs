use bip39::{Language, Mnemonic};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use std::fmt;

use crate::error::{KeyError, WalletError};
use crate::ledger::Pubkey;

pub const KEYPAIR_LENGTH: usize = 64;
pub const SECRET_KEY_LENGTH: usize = 32;

const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Ed25519 keypair in the `solana-keygen` layout: 32-byte secret followed
/// by the 32-byte public key.
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair([u8; KEYPAIR_LENGTH]);

impl Keypair {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; KEYPAIR_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidLength {
                expected: KEYPAIR_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn from_signing_key(signing_key: &SigningKey) -> Self {
        Self(signing_key.to_keypair_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; KEYPAIR_LENGTH] {
        &self.0
    }

    /// Public half as stored in the trailing 32 bytes.
    pub fn pubkey(&self) -> Pubkey {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.0[SECRET_KEY_LENGTH..]);
        Pubkey::new(bytes)
    }

    /// Public key recomputed from the secret half.
    pub fn derive_pubkey(&self) -> Pubkey {
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        secret.copy_from_slice(&self.0[..SECRET_KEY_LENGTH]);
        let signing_key = SigningKey::from_bytes(&secret);
        Pubkey::new(signing_key.verifying_key().to_bytes())
    }

    /// Signing key, rejecting pairs whose halves disagree.
    pub fn signing_key(&self) -> Result<SigningKey, KeyError> {
        SigningKey::from_keypair_bytes(&self.0).map_err(|_| KeyError::Mismatch)
    }

    pub fn sign(&self, message: &[u8]) -> Result<[u8; 64], KeyError> {
        Ok(self.signing_key()?.sign(message).to_bytes())
    }

    /// Textual byte array accepted by `solana-keygen`, e.g. `[12,34,...]`.
    pub fn to_array_string(&self) -> String {
        encode_key_array(&self.0)
    }

    pub fn from_array_string(text: &str) -> Result<Self, KeyError> {
        Self::from_bytes(&decode_key_array(text)?)
    }

    pub fn to_base58_string(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn from_base58_string(text: &str) -> Result<Self, KeyError> {
        let bytes = bs58::decode(text.trim())
            .into_vec()
            .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Accepts either the byte-array form or base58.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        if text.trim_start().starts_with('[') {
            Self::from_array_string(text)
        } else {
            Self::from_base58_string(text)
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

pub fn encode_key_array(bytes: &[u8]) -> String {
    let body: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
    format!("[{}]", body.join(","))
}

pub fn decode_key_array(text: &str) -> Result<Vec<u8>, KeyError> {
    serde_json::from_str::<Vec<u8>>(text).map_err(|e| KeyError::InvalidArray(e.to_string()))
}

pub struct KeyManager;

impl KeyManager {
    /// Generate a new random keypair
    pub fn generate() -> Keypair {
        let signing_key = SigningKey::generate(&mut OsRng);
        Keypair::from_signing_key(&signing_key)
    }

    /// Generate a fresh 12-word mnemonic and the keypair it derives
    pub fn generate_with_mnemonic() -> Result<(Mnemonic, Keypair), WalletError> {
        let entropy = rand::random::<[u8; 16]>();

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;

        let keypair = Self::derive_keypair(&mnemonic);
        Ok((mnemonic, keypair))
    }

    /// Import a keypair from an existing mnemonic phrase
    pub fn from_mnemonic(words: &str) -> Result<Keypair, WalletError> {
        Self::validate_seed(words)?;
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, words)
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;

        Ok(Self::derive_keypair(&mnemonic))
    }

    /// Check a seed phrase for emptiness, word count and checksum.
    pub fn validate_seed(words: &str) -> Result<(), WalletError> {
        if words.trim().is_empty() {
            return Err(WalletError::InvalidMnemonic("mnemonic is empty".to_string()));
        }

        let word_count = words.split_whitespace().count();
        if !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(WalletError::InvalidMnemonic(format!(
                "invalid mnemonic length. got {} words, expected 12, 15, 18, 21, or 24 words",
                word_count
            )));
        }

        Mnemonic::parse_in_normalized(Language::English, words)
            .map(|_| ())
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
    }

    /// Random `<word>-wallet` alias drawn from the BIP-39 English list.
    pub fn random_alias() -> String {
        let words = Language::English.word_list();
        let word = words.choose(&mut OsRng).copied().unwrap_or("default");
        format!("{}-wallet", word)
    }

    fn derive_keypair(mnemonic: &Mnemonic) -> Keypair {
        let seed = mnemonic.to_seed("");
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        secret.copy_from_slice(&seed[..SECRET_KEY_LENGTH]);
        Keypair::from_signing_key(&SigningKey::from_bytes(&secret))
    }
}
