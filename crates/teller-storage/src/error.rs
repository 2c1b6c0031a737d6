//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Encryption error
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Ciphertext could not be authenticated or parsed
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage error (generic)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for teller_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Encryption(msg) => teller_core::Error::Encryption(msg),
            Error::Decryption(msg) => teller_core::Error::Decryption(msg),
            Error::Serialization(e) => teller_core::Error::Serialization(e),
            other => teller_core::Error::Storage(other.to_string()),
        }
    }
}
