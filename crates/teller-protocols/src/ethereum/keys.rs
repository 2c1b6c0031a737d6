//! Ethereum keys and addresses

use crate::encoding::strip_0x;
use crate::secp::Secp256k1Key;
use sha3::{Digest, Keccak256};
use teller_core::{Error, Result};
use zeroize::Zeroizing;

/// Keccak-256
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Ethereum signing key
pub struct EthereumKey {
    inner: Secp256k1Key,
}

impl EthereumKey {
    /// Key from raw secret bytes
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        Ok(Self {
            inner: Secp256k1Key::from_bytes(secret)?,
        })
    }

    /// 64 hex chars, `0x` optional
    pub fn parse(private_key: &str) -> Result<Self> {
        Ok(Self {
            inner: Secp256k1Key::parse(private_key)?,
        })
    }

    /// Random key
    pub fn generate() -> Self {
        Self {
            inner: Secp256k1Key::generate(),
        }
    }

    /// Raw 20-byte address
    pub fn address_bytes(&self) -> [u8; 20] {
        address_from_uncompressed(&self.inner.public_key().serialize_uncompressed())
    }

    /// EIP-55 address
    pub fn address(&self) -> String {
        to_checksum_address(&self.address_bytes())
    }

    /// `0x` + uncompressed public key without the 0x04 tag
    pub fn public_key_hex(&self) -> String {
        let uncompressed = self.inner.public_key().serialize_uncompressed();
        format!("0x{}", hex::encode(&uncompressed[1..]))
    }

    /// 64 hex chars, no prefix
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        self.inner.secret_hex()
    }

    /// Recoverable signature over a digest: `(recovery id, r || s)`
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<(u8, [u8; 64])> {
        self.inner.sign_recoverable(digest)
    }
}

/// Address from a 65-byte uncompressed public key
pub fn address_from_uncompressed(public_key: &[u8; 65]) -> [u8; 20] {
    let hash = keccak256(&public_key[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// EIP-55 mixed-case rendering
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse a `0x` address. All-lower and all-upper forms are accepted;
/// mixed case must carry a valid checksum.
pub fn parse_address(address: &str) -> Result<[u8; 20]> {
    let digits = strip_0x(address.trim());
    if digits.len() != 40 || !address.trim().starts_with("0x") {
        return Err(Error::InvalidArgument(format!("invalid address {}", address)));
    }
    let bytes = hex::decode(digits)
        .map_err(|_| Error::InvalidArgument(format!("invalid address {}", address)))?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(&out)[2..] != *digits {
        return Err(Error::InvalidArgument(format!(
            "address {} fails its checksum",
            address
        )));
    }
    Ok(out)
}
