//! Teller configuration
//!
//! JSON, every field optional:
//!
//! ```json
//! {
//!   "session_max_age_secs": 3600,
//!   "external_session_max_age_secs": 900,
//!   "encryption": { "cipher": "chacha20-poly1305", "memory_kib": 65536, "iterations": 3, "parallelism": 4 },
//!   "transport": { "timeout_secs": 60 },
//!   "networks": [
//!     { "name": "eth-main", "protocol": "ethereum", "chainId": "1", "rpcUrl": "https://rpc.example" }
//!   ]
//! }
//! ```

use crate::error::ConfigError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use teller_net::TransportConfig;
use teller_protocols::NetworkTarget;
use teller_storage::{EncryptionAlgorithm, KdfParams, PassphraseEncryption};

// Argon2 needs at least 8 KiB per lane.
const MIN_MEMORY_KIB_PER_LANE: u32 = 8;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TellerConfig {
    /// Lifetime of sessions minted by unlocking; never expire when absent
    pub session_max_age_secs: Option<u64>,
    /// Default lifetime of externally authorized sessions
    pub external_session_max_age_secs: Option<u64>,
    /// Vault and account-secret encryption
    pub encryption: EncryptionConfig,
    /// HTTP transport for protocol services
    pub transport: TransportConfig,
    /// Named endpoints callers can pick from
    pub networks: Vec<NamedNetwork>,
}

/// Cipher and Argon2id cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// AEAD cipher
    pub cipher: EncryptionAlgorithm,
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Iterations
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        let kdf = KdfParams::default();
        Self {
            cipher: EncryptionAlgorithm::default(),
            memory_kib: kdf.memory_kib,
            iterations: kdf.iterations,
            parallelism: kdf.parallelism,
        }
    }
}

impl EncryptionConfig {
    /// Argon2id parameters
    pub fn kdf(&self) -> KdfParams {
        KdfParams {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }

    /// Encryption service with these settings
    pub fn build(&self) -> PassphraseEncryption {
        PassphraseEncryption::new(self.cipher, self.kdf())
    }
}

/// Network target with a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedNetwork {
    /// Lookup key
    pub name: String,
    /// Endpoint
    #[serde(flatten)]
    pub target: NetworkTarget,
}

impl TellerConfig {
    /// Read and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&raw)?;
        tracing::debug!("Loaded teller config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse and validate JSON
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and name uniqueness
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_max_age_secs == Some(0) || self.external_session_max_age_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "session lifetimes must be positive".to_string(),
            ));
        }
        if self.session_max_age().is_none() && self.session_max_age_secs.is_some() {
            return Err(ConfigError::Invalid(
                "session_max_age_secs is out of range".to_string(),
            ));
        }
        if self.external_session_max_age().is_none()
            && self.external_session_max_age_secs.is_some()
        {
            return Err(ConfigError::Invalid(
                "external_session_max_age_secs is out of range".to_string(),
            ));
        }

        let enc = &self.encryption;
        if enc.iterations == 0 || enc.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "encryption iterations and parallelism must be positive".to_string(),
            ));
        }
        if enc.memory_kib < MIN_MEMORY_KIB_PER_LANE.saturating_mul(enc.parallelism) {
            return Err(ConfigError::Invalid(format!(
                "encryption memory_kib must be at least {} per lane",
                MIN_MEMORY_KIB_PER_LANE
            )));
        }

        if self.transport.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "transport timeout_secs must be positive".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for network in &self.networks {
            if network.name.trim().is_empty() {
                return Err(ConfigError::Invalid("network name is empty".to_string()));
            }
            if !names.insert(network.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate network name {}",
                    network.name
                )));
            }
        }
        Ok(())
    }

    /// Lifetime for unlock sessions
    pub fn session_max_age(&self) -> Option<Duration> {
        self.session_max_age_secs.and_then(seconds)
    }

    /// Lifetime for external sessions
    pub fn external_session_max_age(&self) -> Option<Duration> {
        self.external_session_max_age_secs.and_then(seconds)
    }

    /// Network by name
    pub fn network(&self, name: &str) -> Option<&NetworkTarget> {
        self.networks
            .iter()
            .find(|n| n.name == name)
            .map(|n| &n.target)
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teller_core::SupportedProtocol;

    #[test]
    fn test_empty_object_is_default() {
        let config = TellerConfig::from_json("{}").unwrap();
        assert_eq!(config, TellerConfig::default());
        assert!(config.session_max_age().is_none());
        assert_eq!(config.encryption.kdf(), KdfParams::default());
        assert_eq!(config.encryption.cipher, EncryptionAlgorithm::ChaCha20Poly1305);
    }

    #[test]
    fn test_full_config() {
        let config = TellerConfig::from_json(
            r#"{
                "session_max_age_secs": 3600,
                "external_session_max_age_secs": 900,
                "encryption": {"cipher": "aes-256-gcm", "memory_kib": 1024, "iterations": 1, "parallelism": 1},
                "transport": {"timeout_secs": 15},
                "networks": [
                    {"name": "eth-main", "protocol": "ethereum", "chainId": "1", "rpcUrl": "https://rpc.example"},
                    {"name": "pokt", "protocol": "pocket", "chainId": "mainnet", "rpcUrl": "https://pokt.example"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.session_max_age(), Duration::try_seconds(3600));
        assert_eq!(config.external_session_max_age(), Duration::try_seconds(900));
        assert_eq!(config.encryption.cipher, EncryptionAlgorithm::AesGcm);
        assert_eq!(config.encryption.kdf(), KdfParams::light());
        assert_eq!(config.transport.timeout, std::time::Duration::from_secs(15));

        let eth = config.network("eth-main").unwrap();
        assert_eq!(eth.protocol, SupportedProtocol::Ethereum);
        assert_eq!(eth.chain_id, "1");
        assert!(config.network("missing").is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            TellerConfig::from_json(r#"{"session_max_age_secs": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TellerConfig::from_json(r#"{"encryption": {"iterations": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TellerConfig::from_json(r#"{"encryption": {"memory_kib": 16, "parallelism": 4}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TellerConfig::from_json(r#"{"session_max_age_secs": "soon"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_network_names() {
        let raw = r#"{"networks": [
            {"name": "a", "protocol": "pocket", "chainId": "mainnet", "rpcUrl": "http://x"},
            {"name": "a", "protocol": "pocket", "chainId": "testnet", "rpcUrl": "http://y"}
        ]}"#;
        assert!(matches!(
            TellerConfig::from_json(raw),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teller.json");
        std::fs::write(&path, r#"{"session_max_age_secs": 60}"#).unwrap();
        let config = TellerConfig::load(&path).unwrap();
        assert_eq!(config.session_max_age_secs, Some(60));

        assert!(matches!(
            TellerConfig::load(dir.path().join("absent.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
