//! Cosmos secp256k1 keys and bech32 addresses

use crate::secp::Secp256k1Key;
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use teller_core::{Error, Result};
use zeroize::Zeroizing;

/// Cosmos signing key
pub struct CosmosKey {
    inner: Secp256k1Key,
}

impl CosmosKey {
    /// Key from raw secret bytes
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        Ok(Self {
            inner: Secp256k1Key::from_bytes(secret)?,
        })
    }

    /// 64 hex chars
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

    /// 33-byte compressed public key
    pub fn public_key_bytes(&self) -> [u8; 33] {
        self.inner.public_key().serialize()
    }

    /// Compressed public key, hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Bech32 address under `prefix`
    pub fn address(&self, prefix: &str) -> Result<String> {
        address_from_public_key(prefix, &self.public_key_bytes())
    }

    /// 64 hex chars
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        self.inner.secret_hex()
    }

    /// Low-s compact signature over SHA-256 of `message`
    pub fn sign(&self, message: &[u8]) -> Result<[u8; 64]> {
        let digest: [u8; 32] = Sha256::digest(message).into();
        self.inner.sign_compact(&digest)
    }
}

/// `RIPEMD160(SHA256(compressed public key))`
pub fn account_id(public_key: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(public_key)).into()
}

/// Bech32 address of a compressed public key
pub fn address_from_public_key(prefix: &str, public_key: &[u8]) -> Result<String> {
    let hrp = Hrp::parse(prefix)
        .map_err(|e| Error::InvalidArgument(format!("invalid bech32 prefix {}: {}", prefix, e)))?;
    bech32::encode::<Bech32>(hrp, &account_id(public_key))
        .map_err(|e| Error::InvalidArgument(format!("bech32 encoding failed: {}", e)))
}

/// 20-byte account id of a bech32 address with the expected prefix
pub fn decode_address(prefix: &str, address: &str) -> Result<Vec<u8>> {
    let (hrp, data) = bech32::decode(address)
        .map_err(|e| Error::InvalidArgument(format!("invalid address {}: {}", address, e)))?;
    if hrp.to_lowercase() != prefix {
        return Err(Error::InvalidArgument(format!(
            "address {} does not use prefix {}",
            address, prefix
        )));
    }
    if data.len() != 20 {
        return Err(Error::InvalidArgument(format!(
            "address {} holds {} bytes",
            address,
            data.len()
        )));
    }
    Ok(data)
}
