//! Pocket ed25519 keys
//!
//! Private keys are stored as `secret(32) || public(32)`, 128 hex chars.
//! Addresses are the first 20 bytes of SHA-256(public key), lowercase hex.

use crate::encoding::decode_hex;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use teller_core::{Error, Result};
use zeroize::Zeroizing;

/// Hex length of a Pocket address
pub const ADDRESS_HEX_LEN: usize = 40;

/// ed25519 signing key
pub struct PocketKey {
    signing: SigningKey,
}

impl PocketKey {
    /// Key from a 32-byte secret seed
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(secret),
        }
    }

    /// Random key
    pub fn generate() -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *secret);
        Self::from_secret(&secret)
    }

    /// Parse 128-hex `secret || public` or a bare 64-hex secret
    pub fn parse(private_key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            decode_hex(private_key)
                .map_err(|e| Error::InvalidPrivateKey(format!("not hex: {}", e)))?,
        );
        let mut secret = Zeroizing::new([0u8; 32]);
        match bytes.len() {
            32 => {
                secret.copy_from_slice(&bytes);
                Ok(Self::from_secret(&secret))
            }
            64 => {
                secret.copy_from_slice(&bytes[..32]);
                let key = Self::from_secret(&secret);
                if bytes[32..] != key.public_key_bytes() {
                    return Err(Error::InvalidPrivateKey(
                        "public half does not match the secret".to_string(),
                    ));
                }
                Ok(key)
            }
            n => Err(Error::InvalidPrivateKey(format!(
                "expected 32 or 64 bytes, got {}",
                n
            ))),
        }
    }

    /// Raw public key
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// Public key, hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Address
    pub fn address(&self) -> String {
        address_from_public_key(&self.public_key_bytes())
    }

    /// Stored private key form, `secret || public`
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        let mut bytes = Zeroizing::new([0u8; 64]);
        bytes[..32].copy_from_slice(&self.signing.to_bytes());
        bytes[32..].copy_from_slice(&self.public_key_bytes());
        Zeroizing::new(hex::encode(&bytes[..]))
    }

    /// ed25519 signature
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

/// Address of a raw public key
pub fn address_from_public_key(public_key: &[u8]) -> String {
    hex::encode(&Sha256::digest(public_key)[..20])
}

/// 40 hex characters
pub fn is_valid_address(address: &str) -> bool {
    address.len() == ADDRESS_HEX_LEN && address.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    #[test]
    fn test_private_key_layout() {
        let key = PocketKey::generate();
        let private_key = key.private_key_hex();
        assert_eq!(private_key.len(), 128);
        assert!(private_key.ends_with(&key.public_key_hex()));

        let reparsed = PocketKey::parse(&private_key).unwrap();
        assert_eq!(reparsed.address(), key.address());
    }

    #[test]
    fn test_bare_secret_expands() {
        let key = PocketKey::from_secret(&[9u8; 32]);
        let bare = hex::encode([9u8; 32]);
        assert_eq!(PocketKey::parse(&bare).unwrap().private_key_hex(), key.private_key_hex());
    }

    #[test]
    fn test_mismatched_public_half_rejected() {
        let key = PocketKey::from_secret(&[1u8; 32]);
        let bogus = format!("{}{}", hex::encode([1u8; 32]), hex::encode([2u8; 32]));
        assert!(matches!(PocketKey::parse(&bogus), Err(Error::InvalidPrivateKey(_))));
        assert!(PocketKey::parse(&key.private_key_hex()).is_ok());
    }

    #[test]
    fn test_address_is_truncated_sha256() {
        let key = PocketKey::generate();
        let digest = Sha256::digest(key.public_key_bytes());
        assert_eq!(key.address(), hex::encode(&digest[..20]));
        assert_eq!(key.address().len(), ADDRESS_HEX_LEN);
        assert!(is_valid_address(&key.address()));
        assert_eq!(key.address(), key.address().to_lowercase());
    }

    #[test]
    fn test_signature_verifies() {
        let key = PocketKey::generate();
        let signature = Signature::from_bytes(&key.sign(b"payload"));
        let verifying = VerifyingKey::from_bytes(&key.public_key_bytes()).unwrap();
        assert!(verifying.verify(b"payload", &signature).is_ok());
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_address("abc"));
        assert!(!is_valid_address(&"g".repeat(40)));
    }
}
