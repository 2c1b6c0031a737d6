//! Per-protocol network presets

use crate::protocol::SupportedProtocol;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Testnet
    Testnet,
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Protocol configuration for one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Network type
    pub network_type: NetworkType,
    /// Chain identifier used in signed payloads
    pub chain_id: &'static str,
    /// Base denomination of the native asset
    pub native_denom: &'static str,
    /// Decimals between display units and the base denomination
    pub decimals: u8,
    /// Bech32 human-readable part, for protocols with bech32 addresses
    pub bech32_prefix: Option<&'static str>,
    /// Flat transaction fee in the base denomination (0 = dynamic)
    pub default_fee: u128,
    /// Gas limit attached to transfers when the caller supplies none
    pub default_gas_limit: u64,
}

impl ProtocolParams {
    /// Pocket mainnet parameters
    pub const fn pocket_mainnet() -> Self {
        Self {
            protocol: SupportedProtocol::Pocket,
            network_type: NetworkType::Mainnet,
            chain_id: "mainnet",
            native_denom: "upokt",
            decimals: 6,
            bech32_prefix: None,
            default_fee: 10_000,
            default_gas_limit: 0,
        }
    }

    /// Pocket testnet parameters
    pub const fn pocket_testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            chain_id: "testnet",
            ..Self::pocket_mainnet()
        }
    }

    /// Ethereum mainnet parameters
    pub const fn ethereum_mainnet() -> Self {
        Self {
            protocol: SupportedProtocol::Ethereum,
            network_type: NetworkType::Mainnet,
            chain_id: "1",
            native_denom: "wei",
            decimals: 18,
            bech32_prefix: None,
            default_fee: 0,
            default_gas_limit: 21_000,
        }
    }

    /// Ethereum testnet (Sepolia) parameters
    pub const fn ethereum_testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            chain_id: "11155111",
            ..Self::ethereum_mainnet()
        }
    }

    /// Shannon mainnet parameters
    pub const fn cosmos_mainnet() -> Self {
        Self {
            protocol: SupportedProtocol::Cosmos,
            network_type: NetworkType::Mainnet,
            chain_id: "pocket",
            native_denom: "upokt",
            decimals: 6,
            bech32_prefix: Some("pokt"),
            default_fee: 10,
            default_gas_limit: 200_000,
        }
    }

    /// Shannon beta testnet parameters
    pub const fn cosmos_testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            chain_id: "pocket-beta",
            ..Self::cosmos_mainnet()
        }
    }

    /// Get parameters by protocol and network type
    pub const fn for_network(protocol: SupportedProtocol, network_type: NetworkType) -> Self {
        match (protocol, network_type) {
            (SupportedProtocol::Pocket, NetworkType::Mainnet) => Self::pocket_mainnet(),
            (SupportedProtocol::Pocket, NetworkType::Testnet) => Self::pocket_testnet(),
            (SupportedProtocol::Ethereum, NetworkType::Mainnet) => Self::ethereum_mainnet(),
            (SupportedProtocol::Ethereum, NetworkType::Testnet) => Self::ethereum_testnet(),
            (SupportedProtocol::Cosmos, NetworkType::Mainnet) => Self::cosmos_mainnet(),
            (SupportedProtocol::Cosmos, NetworkType::Testnet) => Self::cosmos_testnet(),
        }
    }

    /// Find the preset whose chain id matches, falling back to mainnet
    pub fn for_chain_id(protocol: SupportedProtocol, chain_id: &str) -> Self {
        let testnet = Self::for_network(protocol, NetworkType::Testnet);
        if testnet.chain_id == chain_id {
            testnet
        } else {
            Self::for_network(protocol, NetworkType::Mainnet)
        }
    }
}
