//! Protocol tags and HD derivation templates

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Offset marking a hardened BIP-32 / SLIP-10 child index
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Pocket Network BIP-44 coin type
pub const POCKET_COIN_TYPE: u32 = 635;

/// Ethereum BIP-44 coin type
pub const ETHEREUM_COIN_TYPE: u32 = 60;

/// Cosmos BIP-44 coin type (used by Shannon)
pub const COSMOS_COIN_TYPE: u32 = 118;

/// Ledger families the teller holds keys for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedProtocol {
    /// Pocket Network (Morse), ed25519 keys
    Pocket,
    /// Ethereum and EVM chains, secp256k1 keys
    Ethereum,
    /// Cosmos SDK chains (Pocket Shannon), secp256k1 keys
    Cosmos,
}

impl SupportedProtocol {
    /// All protocols, in registration order
    pub const ALL: [SupportedProtocol; 3] = [Self::Pocket, Self::Ethereum, Self::Cosmos];

    /// Stable tag used in persisted records
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pocket => "pocket",
            Self::Ethereum => "ethereum",
            Self::Cosmos => "cosmos",
        }
    }

    /// BIP-44 coin type
    pub const fn coin_type(&self) -> u32 {
        match self {
            Self::Pocket => POCKET_COIN_TYPE,
            Self::Ethereum => ETHEREUM_COIN_TYPE,
            Self::Cosmos => COSMOS_COIN_TYPE,
        }
    }

    /// Whether every path segment is hardened (SLIP-10 ed25519)
    pub const fn hardened_only(&self) -> bool {
        matches!(self, Self::Pocket)
    }

    /// Derivation path of the HD child at `index`.
    ///
    /// - Pocket: `m/44'/635'/0'/0'/{index}'`
    /// - Ethereum: `m/44'/60'/0'/0/{index}`
    /// - Cosmos: `m/44'/118'/0'/0/{index}`
    pub fn derivation_path(&self, index: u32) -> String {
        if self.hardened_only() {
            format!("m/44'/{}'/0'/0'/{}'", self.coin_type(), index)
        } else {
            format!("m/44'/{}'/0'/0/{}", self.coin_type(), index)
        }
    }

    /// Path segments of the HD child at `index`, hardened offset applied.
    pub fn derivation_segments(&self, index: u32) -> [u32; 5] {
        let last = if self.hardened_only() {
            index | HARDENED_OFFSET
        } else {
            index
        };
        let change = if self.hardened_only() { HARDENED_OFFSET } else { 0 };
        [
            44 | HARDENED_OFFSET,
            self.coin_type() | HARDENED_OFFSET,
            HARDENED_OFFSET,
            change,
            last,
        ]
    }
}

impl fmt::Display for SupportedProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pocket" | "pokt" => Ok(Self::Pocket),
            "ethereum" | "eth" => Ok(Self::Ethereum),
            "cosmos" | "shannon" => Ok(Self::Cosmos),
            other => Err(Error::UnknownProtocol(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_paths() {
        assert_eq!(
            SupportedProtocol::Pocket.derivation_path(3),
            "m/44'/635'/0'/0'/3'"
        );
        assert_eq!(
            SupportedProtocol::Ethereum.derivation_path(0),
            "m/44'/60'/0'/0/0"
        );
        assert_eq!(
            SupportedProtocol::Cosmos.derivation_path(7),
            "m/44'/118'/0'/0/7"
        );
    }

    #[test]
    fn test_derivation_segments_hardening() {
        let pocket = SupportedProtocol::Pocket.derivation_segments(1);
        assert!(pocket.iter().all(|s| s & HARDENED_OFFSET != 0));
        assert_eq!(pocket[4], 1 | HARDENED_OFFSET);

        let eth = SupportedProtocol::Ethereum.derivation_segments(1);
        assert_eq!(eth[3], 0);
        assert_eq!(eth[4], 1);
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!(
            "Pocket".parse::<SupportedProtocol>().unwrap(),
            SupportedProtocol::Pocket
        );
        assert_eq!(
            "shannon".parse::<SupportedProtocol>().unwrap(),
            SupportedProtocol::Cosmos
        );
        assert!("solana".parse::<SupportedProtocol>().is_err());
    }

    #[test]
    fn test_protocol_serde_tag() {
        let json = serde_json::to_string(&SupportedProtocol::Ethereum).unwrap();
        assert_eq!(json, "\"ethereum\"");
    }
}
