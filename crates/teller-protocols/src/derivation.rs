//! Hierarchical key derivation
//!
//! - SLIP-10 for ed25519 (hardened only), HMAC-SHA512 keyed with `"ed25519 seed"`
//! - BIP-32 for secp256k1 via the `bip32` crate

use bip32::{DerivationPath, XPrv};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::str::FromStr;
use teller_core::{Error, Result};
use teller_params::HARDENED_OFFSET;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

/// Reject HD child indices that collide with the hardened range
pub fn check_hd_index(index: u32) -> Result<()> {
    if index >= HARDENED_OFFSET {
        return Err(Error::InvalidArgument(format!(
            "HD index {} must be below {}",
            index, HARDENED_OFFSET
        )));
    }
    Ok(())
}

/// SLIP-10 ed25519 extended key
pub struct Slip10Key {
    secret: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

impl Slip10Key {
    /// Master key from a seed
    pub fn master(seed: &[u8]) -> Result<Self> {
        Self::from_hmac(b"ed25519 seed", &[seed])
    }

    /// Hardened child. The hardened bit is forced on.
    pub fn derive_hardened(&self, index: u32) -> Result<Self> {
        let hardened_index = index | HARDENED_OFFSET;
        Self::from_hmac(
            &self.chain_code[..],
            &[&[0x00], &self.secret[..], &hardened_index.to_be_bytes()],
        )
    }

    /// 32-byte ed25519 secret seed
    pub fn secret(&self) -> &[u8; 32] {
        &self.secret
    }

    /// Chain code
    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    fn from_hmac(key: &[u8], parts: &[&[u8]]) -> Result<Self> {
        let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
            .map_err(|e| Error::KeyDerivation(format!("HMAC initialization failed: {}", e)))?;
        for part in parts {
            mac.update(part);
        }
        let output = mac.finalize().into_bytes();

        let mut secret = Zeroizing::new([0u8; 32]);
        let mut chain_code = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&output[..32]);
        chain_code.copy_from_slice(&output[32..]);
        Ok(Self { secret, chain_code })
    }
}

/// SLIP-10 ed25519 secret at `segments` below the master
pub fn slip10_derive(seed: &[u8], segments: &[u32]) -> Result<Zeroizing<[u8; 32]>> {
    let mut key = Slip10Key::master(seed)?;
    for &index in segments {
        key = key.derive_hardened(index)?;
    }
    Ok(Zeroizing::new(*key.secret()))
}

/// BIP-32 master secret
pub fn bip32_master(seed: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let root = XPrv::new(seed)
        .map_err(|e| Error::KeyDerivation(format!("Failed to create master key: {}", e)))?;
    Ok(Zeroizing::new(root.to_bytes()))
}

/// BIP-32 secret at `path` (e.g. `m/44'/60'/0'/0/0`)
pub fn bip32_derive(seed: &[u8], path: &str) -> Result<Zeroizing<[u8; 32]>> {
    let derivation_path = DerivationPath::from_str(path)
        .map_err(|e| Error::KeyDerivation(format!("Invalid path '{}': {}", path, e)))?;
    let child = XPrv::derive_from_path(seed, &derivation_path)
        .map_err(|e| Error::KeyDerivation(format!("Child derivation failed: {}", e)))?;
    Ok(Zeroizing::new(child.to_bytes()))
}
