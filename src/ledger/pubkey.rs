use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::KeyError;

pub const PUBKEY_LENGTH: usize = 32;

/// Ed25519 public key / account address, displayed as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey([u8; PUBKEY_LENGTH]);

/// Native System program, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey([0u8; PUBKEY_LENGTH]);

impl Pubkey {
    pub const fn new(bytes: [u8; PUBKEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; PUBKEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidLength {
                expected: PUBKEY_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_LENGTH] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; PUBKEY_LENGTH] {
        self.0
    }
}

impl FromStr for Pubkey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_program_renders_as_ones() {
        assert_eq!(
            SYSTEM_PROGRAM_ID.to_string(),
            "11111111111111111111111111111111"
        );
        let parsed: Pubkey = "11111111111111111111111111111111".parse().unwrap();
        assert_eq!(parsed, SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let short = bs58::encode([7u8; 16]).into_string();
        assert_eq!(
            short.parse::<Pubkey>(),
            Err(KeyError::InvalidLength {
                expected: 32,
                actual: 16
            })
        );
        assert!(matches!(
            "not-base58-0OIl".parse::<Pubkey>(),
            Err(KeyError::InvalidBase58(_))
        ));
    }
}
