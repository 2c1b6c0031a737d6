//! Network transport
//!
//! Provides the reqwest-based HTTP transport (timeout, optional SOCKS5
//! proxy, user agent) and the JSON-RPC/REST client the protocol services
//! talk to nodes with.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod rpc;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
mod transport;

pub use error::{Error, Result};
pub use rpc::RpcClient;
pub use transport::{Socks5Config, TransportConfig, DEFAULT_TIMEOUT};
