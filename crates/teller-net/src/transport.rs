//! HTTP transport configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// SOCKS5 configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socks5Config {
    /// Host address
    pub host: String,
    /// Port
    pub port: u16,
    /// Username (optional)
    #[serde(default)]
    pub username: Option<String>,
    /// Password (optional)
    #[serde(default)]
    pub password: Option<String>,
}

impl Socks5Config {
    /// Get proxy URL.
    ///
    /// `socks5h` so that name resolution happens on the proxy.
    pub fn proxy_url(&self) -> String {
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            format!("socks5h://{}:{}@{}:{}", user, pass, self.host, self.port)
        } else {
            format!("socks5h://{}:{}", self.host, self.port)
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    /// SOCKS5 proxy; direct when absent
    pub proxy: Option<Socks5Config>,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
            user_agent: concat!("vault-teller/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    /// Create HTTP client with configured transport
    pub fn create_http_client(&self) -> Result<reqwest::Client> {
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }

        let mut client_builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone());

        if let Some(ref socks5) = self.proxy {
            debug!(
                "Creating HTTP client with SOCKS5 proxy: {}:{}",
                socks5.host, socks5.port
            );
            let proxy = reqwest::Proxy::all(socks5.proxy_url())
                .map_err(|e| Error::Config(format!("Failed to create SOCKS5 proxy: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
