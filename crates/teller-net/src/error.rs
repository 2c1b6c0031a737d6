//! Error types

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request could not be sent or the connection failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-2xx response
    #[error("HTTP status {status}: {body}")]
    Status {
        /// Status code
        status: u16,
        /// Response body, as received
        body: String,
    },

    /// Response body did not decode
    #[error("Decode error: {0}")]
    Decode(String),

    /// JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Invalid transport configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Http(err.to_string())
        }
    }
}

impl From<Error> for teller_core::Error {
    fn from(err: Error) -> Self {
        teller_core::Error::NetworkRequestFailed(err.to_string())
    }
}
