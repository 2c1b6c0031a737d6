//! Protocol parameters and constants for the vault teller
//!
//! This crate provides the protocol tags understood by the teller together
//! with per-network presets: chain identifiers, BIP-44 coin types,
//! derivation path templates, native denominations and flat fees.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod network;
pub mod protocol;

pub use network::{NetworkType, ProtocolParams};
pub use protocol::{
    SupportedProtocol, COSMOS_COIN_TYPE, ETHEREUM_COIN_TYPE, HARDENED_OFFSET, POCKET_COIN_TYPE,
};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Unknown protocol tag
    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
