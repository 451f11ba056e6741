use thiserror::Error;

/// Coarse failure classes shared by every layer.
///
/// Callers that only care about "what went wrong" (the command layer, tests)
/// match on this instead of the concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing alias, missing active wallet, absent key file
    NotFound,
    /// Alias already exists
    Conflict,
    /// Unparsable store content, undersized keys or instruction bytes
    Malformed,
    /// Ledger or rate service failure, timeout, cancellation
    Remote,
    /// Bad seed phrase, address or amount supplied by the user
    Validation,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Key file not found: {0}")]
    StoreNotFound(String),

    #[error("No wallet found for alias: {0}")]
    AliasNotFound(String),

    #[error("Alias already exists: {0}")]
    AliasExists(String),

    #[error("No active wallet found")]
    ActiveWalletNotFound,

    #[error("Malformed key file {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid key material for {alias}: {source}")]
    InvalidKey {
        alias: String,
        #[source]
        source: KeyError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace key file {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StoreNotFound(_) | Self::AliasNotFound(_) | Self::ActiveWalletNotFound => {
                ErrorKind::NotFound
            }
            Self::AliasExists(_) => ErrorKind::Conflict,
            Self::Malformed { .. } | Self::InvalidKey { .. } => ErrorKind::Malformed,
            Self::Io(_) | Self::Persist { .. } => ErrorKind::Malformed,
        }
    }
}

/// Failures parsing key or address text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("expected {expected} key bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("not a byte array: {0}")]
    InvalidArray(String),

    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("secret key does not match public key")]
    Mismatch,
}

/// Binary decoding failures for wire transactions and instructions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("Invalid compact-u16 length prefix")]
    InvalidCompactLength,

    #[error("Unsupported message version: {0}")]
    UnsupportedVersion(u8),

    #[error("Instruction data too short: expected at least {expected} bytes, got {actual}")]
    InstructionTooShort { expected: usize, actual: usize },

    #[error("Transfer instruction references {0} accounts, expected 2")]
    MissingTransferAccounts(usize),

    #[error("Account index {index} out of range ({len} accounts)")]
    AccountIndexOutOfRange { index: usize, len: usize },

    #[error("Trailing bytes after transaction: {0}")]
    TrailingBytes(usize),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Not found on ledger: {0}")]
    NotFound(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("History task failed: {0}")]
    TaskFailed(String),

    #[error("Transaction {0} was not confirmed before the deadline")]
    ConfirmationTimeout(String),

    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid signing key: {0}")]
    SigningKey(#[from] KeyError),

    #[error("Fetching transaction failed for signature {signature}: {source}")]
    Signature {
        signature: String,
        #[source]
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) | Self::SigningKey(_) => ErrorKind::Malformed,
            Self::Signature { source, .. } => source.kind(),
            _ => ErrorKind::Remote,
        }
    }

    /// Attach the signature whose pipeline produced this error.
    pub fn for_signature(self, signature: impl Into<String>) -> Self {
        Self::Signature {
            signature: signature.into(),
            source: Box::new(self),
        }
    }
}

#[derive(Error, Debug)]
pub enum RateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate API returned errors: {0}")]
    Api(String),

    #[error("Unexpected data structure from rate API")]
    UnexpectedShape,

    #[error("Invalid rate value: {0}")]
    InvalidRate(String),
}

impl RateError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Remote
    }
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Exchange rate error: {0}")]
    Rate(#[from] RateError),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(#[from] KeyError),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Rate(e) => e.kind(),
            Self::InvalidMnemonic(_)
            | Self::InvalidAddress(_)
            | Self::InvalidAmount(_)
            | Self::InvalidPrivateKey(_) => ErrorKind::Validation,
        }
    }
}
