//! secp256k1 keys shared by the Ethereum and Cosmos services

use crate::encoding::parse_secret_32;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use teller_core::{Error, Result};
use zeroize::Zeroizing;

static SECP256K1: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// secp256k1 private key
pub struct Secp256k1Key {
    secret: SecretKey,
}

impl Secp256k1Key {
    /// Key from raw bytes; zero and out-of-range scalars are rejected
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| Error::InvalidPrivateKey(format!("invalid secp256k1 key: {}", e)))?;
        Ok(Self { secret })
    }

    /// 64-hex key with optional `0x`
    pub fn parse(private_key: &str) -> Result<Self> {
        Self::from_bytes(&*parse_secret_32(private_key)?)
    }

    /// Random key
    pub fn generate() -> Self {
        loop {
            let mut bytes = Zeroizing::new([0u8; 32]);
            OsRng.fill_bytes(&mut *bytes);
            if let Ok(key) = Self::from_bytes(&bytes) {
                return key;
            }
        }
    }

    /// Public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(&SECP256K1, &self.secret)
    }

    /// 64 lowercase hex chars, no prefix
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.secret.secret_bytes()))
    }

    /// Recoverable signature over a 32-byte digest: `(recovery id, r || s)`
    pub fn sign_recoverable(&self, digest: &[u8; 32]) -> Result<(u8, [u8; 64])> {
        let message = Message::from_slice(digest)
            .map_err(|e| Error::KeyDerivation(format!("invalid digest: {}", e)))?;
        let (recovery_id, compact) = SECP256K1
            .sign_ecdsa_recoverable(&message, &self.secret)
            .serialize_compact();
        Ok((recovery_id.to_i32() as u8, compact))
    }

    /// Low-s compact signature over a 32-byte digest
    pub fn sign_compact(&self, digest: &[u8; 32]) -> Result<[u8; 64]> {
        let message = Message::from_slice(digest)
            .map_err(|e| Error::KeyDerivation(format!("invalid digest: {}", e)))?;
        let mut signature = SECP256K1.sign_ecdsa(&message, &self.secret);
        signature.normalize_s();
        Ok(signature.serialize_compact())
    }
}

/// Public key that produced a recoverable signature
pub fn recover_public_key(digest: &[u8; 32], compact: &[u8; 64], recovery_id: u8) -> Result<PublicKey> {
    let id = RecoveryId::from_i32(i32::from(recovery_id))
        .map_err(|e| Error::InvalidArgument(format!("invalid recovery id: {}", e)))?;
    let signature = RecoverableSignature::from_compact(compact, id)
        .map_err(|e| Error::InvalidArgument(format!("invalid signature: {}", e)))?;
    let message = Message::from_slice(digest)
        .map_err(|e| Error::InvalidArgument(format!("invalid digest: {}", e)))?;
    SECP256K1
        .recover_ecdsa(&message, &signature)
        .map_err(|e| Error::InvalidArgument(format!("recovery failed: {}", e)))
}

/// Verify a compact signature
pub fn verify_compact(digest: &[u8; 32], compact: &[u8; 64], public_key: &PublicKey) -> bool {
    let (Ok(message), Ok(signature)) = (
        Message::from_slice(digest),
        secp256k1::ecdsa::Signature::from_compact(compact),
    ) else {
        return false;
    };
    SECP256K1.verify_ecdsa(&message, &signature, public_key).is_ok()
}
