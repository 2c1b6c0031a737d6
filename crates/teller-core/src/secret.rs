//! Passphrase-gated secrets

use crate::contracts::EncryptionService;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Ciphertext of a secret sealed with a caller passphrase.
///
/// The plaintext is only reachable through [`EncryptedSecret::open`] with
/// the encryption collaborator and the right passphrase.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    /// Seal `plaintext` under `passphrase`
    pub fn seal(
        encryption: &dyn EncryptionService,
        passphrase: &str,
        plaintext: &str,
    ) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(Error::InvalidArgument(
                "passphrase must not be empty".to_string(),
            ));
        }
        encryption
            .encrypt(passphrase, plaintext.as_bytes())
            .map(Self)
    }

    /// Recover the plaintext.
    ///
    /// Any decryption failure surfaces as [`Error::Decryption`]; callers
    /// pick the user-facing kind.
    pub fn open(
        &self,
        encryption: &dyn EncryptionService,
        passphrase: &str,
    ) -> Result<Zeroizing<String>> {
        let bytes = encryption.decrypt(passphrase, &self.0)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| Error::Decryption(format!("secret is not utf-8: {}", e)))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// Raw ciphertext, for persistence
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptedSecret").field(&"..").finish()
    }
}
