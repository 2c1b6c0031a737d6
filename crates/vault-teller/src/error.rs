//! Error types for the teller
//!
//! Operations report [`teller_core::Error`]; configuration loading has its
//! own error that folds into `InvalidArgument`.

pub use teller_core::{Error, Result};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config is not valid JSON for [`crate::TellerConfig`]
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Values out of range or inconsistent
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}
