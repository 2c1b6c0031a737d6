//! Error types for the vault teller core
//!
//! Every failure the host can observe maps onto one stable [`ErrorKind`].
//! Hosts branch on the kind (or its kebab-case name), never on the message.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Vault teller errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No vault blob has been persisted yet
    #[error("Vault uninitialized: {0}")]
    VaultUninitialized(String),

    /// A vault blob already exists
    #[error("Vault already initialized: {0}")]
    VaultAlreadyInitialized(String),

    /// The operation needs an unlocked vault
    #[error("Vault locked: {0}")]
    VaultLocked(String),

    /// The vault blob could not be decrypted with the supplied passphrase
    #[error("Vault restore failed: {0}")]
    VaultRestoreFailed(String),

    /// Unknown session id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session expired or revoked
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Session lacks the requested permission
    #[error("Session forbidden: {0}")]
    SessionForbidden(String),

    /// Unknown account
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// An account with the same address and protocol exists
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// Unknown recovery phrase
    #[error("Recovery phrase not found: {0}")]
    RecoveryPhraseNotFound(String),

    /// The same mnemonic and passphrase are already stored
    #[error("Recovery phrase already exists: {0}")]
    RecoveryPhraseAlreadyExists(String),

    /// Mnemonic failed wordlist or checksum validation
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Private key is malformed for its protocol
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// An account secret could not be decrypted with the supplied passphrase
    #[error("Private key restore failed: {0}")]
    PrivateKeyRestoreFailed(String),

    /// The network rejected a transaction
    #[error("Protocol transaction failed: {0}")]
    ProtocolTransactionFailed(String),

    /// A network request could not be completed or decoded
    #[error("Network request failed: {0}")]
    NetworkRequestFailed(String),

    /// Caller supplied an invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not supported by the protocol
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption collaborator failed to encrypt
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Encryption collaborator failed to decrypt
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Storage collaborator error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable error kinds exposed to hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::VaultUninitialized`]
    VaultUninitialized,
    /// See [`Error::VaultAlreadyInitialized`]
    VaultAlreadyInitialized,
    /// See [`Error::VaultLocked`]
    VaultLocked,
    /// See [`Error::VaultRestoreFailed`]
    VaultRestoreFailed,
    /// See [`Error::SessionNotFound`]
    SessionNotFound,
    /// See [`Error::SessionInvalid`]
    SessionInvalid,
    /// See [`Error::SessionForbidden`]
    SessionForbidden,
    /// See [`Error::AccountNotFound`]
    AccountNotFound,
    /// See [`Error::AccountAlreadyExists`]
    AccountAlreadyExists,
    /// See [`Error::RecoveryPhraseNotFound`]
    RecoveryPhraseNotFound,
    /// See [`Error::RecoveryPhraseAlreadyExists`]
    RecoveryPhraseAlreadyExists,
    /// See [`Error::InvalidMnemonic`]
    InvalidMnemonic,
    /// See [`Error::InvalidPrivateKey`]
    InvalidPrivateKey,
    /// See [`Error::PrivateKeyRestoreFailed`]
    PrivateKeyRestoreFailed,
    /// See [`Error::ProtocolTransactionFailed`]
    ProtocolTransactionFailed,
    /// See [`Error::NetworkRequestFailed`]
    NetworkRequestFailed,
    /// See [`Error::InvalidArgument`]
    InvalidArgument,
    /// See [`Error::UnsupportedOperation`]
    UnsupportedOperation,
    /// See [`Error::KeyDerivation`]
    KeyDerivation,
    /// See [`Error::Encryption`]
    EncryptionFailed,
    /// See [`Error::Decryption`]
    DecryptionFailed,
    /// See [`Error::Storage`]
    Storage,
    /// See [`Error::Serialization`]
    Serialization,
}

impl ErrorKind {
    /// Stable kebab-case name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VaultUninitialized => "vault-uninitialized",
            Self::VaultAlreadyInitialized => "vault-already-initialized",
            Self::VaultLocked => "vault-locked",
            Self::VaultRestoreFailed => "vault-restore-failed",
            Self::SessionNotFound => "session-not-found",
            Self::SessionInvalid => "session-invalid",
            Self::SessionForbidden => "session-forbidden",
            Self::AccountNotFound => "account-not-found",
            Self::AccountAlreadyExists => "account-already-exists",
            Self::RecoveryPhraseNotFound => "recovery-phrase-not-found",
            Self::RecoveryPhraseAlreadyExists => "recovery-phrase-already-exists",
            Self::InvalidMnemonic => "invalid-mnemonic",
            Self::InvalidPrivateKey => "invalid-private-key",
            Self::PrivateKeyRestoreFailed => "private-key-restore-failed",
            Self::ProtocolTransactionFailed => "protocol-transaction-failed",
            Self::NetworkRequestFailed => "network-request-failed",
            Self::InvalidArgument => "invalid-argument",
            Self::UnsupportedOperation => "unsupported-operation",
            Self::KeyDerivation => "key-derivation",
            Self::EncryptionFailed => "encryption-failed",
            Self::DecryptionFailed => "decryption-failed",
            Self::Storage => "storage",
            Self::Serialization => "serialization",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::VaultUninitialized(_) => ErrorKind::VaultUninitialized,
            Error::VaultAlreadyInitialized(_) => ErrorKind::VaultAlreadyInitialized,
            Error::VaultLocked(_) => ErrorKind::VaultLocked,
            Error::VaultRestoreFailed(_) => ErrorKind::VaultRestoreFailed,
            Error::SessionNotFound(_) => ErrorKind::SessionNotFound,
            Error::SessionInvalid(_) => ErrorKind::SessionInvalid,
            Error::SessionForbidden(_) => ErrorKind::SessionForbidden,
            Error::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Error::AccountAlreadyExists(_) => ErrorKind::AccountAlreadyExists,
            Error::RecoveryPhraseNotFound(_) => ErrorKind::RecoveryPhraseNotFound,
            Error::RecoveryPhraseAlreadyExists(_) => ErrorKind::RecoveryPhraseAlreadyExists,
            Error::InvalidMnemonic(_) => ErrorKind::InvalidMnemonic,
            Error::InvalidPrivateKey(_) => ErrorKind::InvalidPrivateKey,
            Error::PrivateKeyRestoreFailed(_) => ErrorKind::PrivateKeyRestoreFailed,
            Error::ProtocolTransactionFailed(_) => ErrorKind::ProtocolTransactionFailed,
            Error::NetworkRequestFailed(_) => ErrorKind::NetworkRequestFailed,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Error::KeyDerivation(_) => ErrorKind::KeyDerivation,
            Error::Encryption(_) => ErrorKind::EncryptionFailed,
            Error::Decryption(_) => ErrorKind::DecryptionFailed,
            Error::Storage(_) => ErrorKind::Storage,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::VaultRestoreFailed(_)
                | Error::PrivateKeyRestoreFailed(_)
                | Error::AccountAlreadyExists(_)
                | Error::RecoveryPhraseAlreadyExists(_)
                | Error::InvalidMnemonic(_)
                | Error::InvalidPrivateKey(_)
                | Error::InvalidArgument(_)
                | Error::ProtocolTransactionFailed(_)
                | Error::NetworkRequestFailed(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::VaultRestoreFailed(_) => {
                "The vault password is incorrect. Please try again.".to_string()
            }
            Error::PrivateKeyRestoreFailed(_) => {
                "The account password is incorrect. Please try again.".to_string()
            }
            Error::AccountAlreadyExists(_) => {
                "This account is already in your vault.".to_string()
            }
            Error::RecoveryPhraseAlreadyExists(_) => {
                "This recovery phrase is already in your vault.".to_string()
            }
            Error::InvalidMnemonic(_) => {
                "The recovery phrase is invalid. Please check and try again.".to_string()
            }
            Error::InvalidPrivateKey(_) => {
                "The private key is invalid. Please check and try again.".to_string()
            }
            Error::ProtocolTransactionFailed(_) => {
                "The network rejected the transaction. Please review it and try again.".to_string()
            }
            Error::NetworkRequestFailed(_) => {
                "Unable to reach the network. Please check your connection or switch endpoints."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::VaultUninitialized(_)
            | Error::VaultAlreadyInitialized(_)
            | Error::VaultLocked(_)
            | Error::VaultRestoreFailed(_) => ErrorCategory::Vault,
            Error::SessionNotFound(_) | Error::SessionInvalid(_) | Error::SessionForbidden(_) => {
                ErrorCategory::Session
            }
            Error::AccountNotFound(_) | Error::AccountAlreadyExists(_) => ErrorCategory::Account,
            Error::RecoveryPhraseNotFound(_)
            | Error::RecoveryPhraseAlreadyExists(_)
            | Error::InvalidMnemonic(_) => ErrorCategory::Seed,
            Error::InvalidPrivateKey(_)
            | Error::PrivateKeyRestoreFailed(_)
            | Error::KeyDerivation(_) => ErrorCategory::Keys,
            Error::ProtocolTransactionFailed(_) | Error::UnsupportedOperation(_) => {
                ErrorCategory::Transaction
            }
            Error::NetworkRequestFailed(_) => ErrorCategory::Network,
            Error::Storage(_) => ErrorCategory::Storage,
            Error::InvalidArgument(_)
            | Error::Encryption(_)
            | Error::Decryption(_)
            | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Vault lifecycle errors
    Vault,
    /// Session and permission errors
    Session,
    /// Account errors
    Account,
    /// Recovery phrase errors
    Seed,
    /// Key material errors
    Keys,
    /// Transaction errors
    Transaction,
    /// Network errors
    Network,
    /// Storage errors
    Storage,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Vault => write!(f, "Vault"),
            ErrorCategory::Session => write!(f, "Session"),
            ErrorCategory::Account => write!(f, "Account"),
            ErrorCategory::Seed => write!(f, "Seed"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Transaction => write!(f, "Transaction"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Storage => write!(f, "Storage"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
