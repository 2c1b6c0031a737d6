//! Test doubles for the collaborator contracts
//!
//! Not cryptography. Only compiled for tests or with the `test-helpers`
//! feature.

use crate::contracts::EncryptionService;
use crate::{Error, Result};
use zeroize::Zeroizing;

/// Reversible "encryption" bound to the passphrase.
///
/// Output is `hex(passphrase) ':' hex(reversed plaintext)`. Decrypting with
/// any other passphrase fails, like a real AEAD would.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReversingEncryption;

impl EncryptionService for ReversingEncryption {
    fn encrypt(&self, passphrase: &str, plaintext: &[u8]) -> Result<String> {
        let reversed: Vec<u8> = plaintext.iter().rev().copied().collect();
        Ok(format!(
            "{}:{}",
            hex::encode(passphrase.as_bytes()),
            hex::encode(reversed)
        ))
    }

    fn decrypt(&self, passphrase: &str, ciphertext: &str) -> Result<Zeroizing<Vec<u8>>> {
        let (tag, body) = ciphertext
            .split_once(':')
            .ok_or_else(|| Error::Decryption("malformed ciphertext".to_string()))?;
        if tag != hex::encode(passphrase.as_bytes()) {
            return Err(Error::Decryption("authentication failed".to_string()));
        }
        let mut bytes = hex::decode(body).map_err(|e| Error::Decryption(e.to_string()))?;
        bytes.reverse();
        Ok(Zeroizing::new(bytes))
    }
}
