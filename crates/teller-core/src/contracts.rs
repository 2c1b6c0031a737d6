//! Collaborator contracts
//!
//! The core never touches disks, keychains or ciphers directly. Hosts plug
//! in an [`EncryptionService`], a [`VaultStore`] and a [`SessionStore`];
//! `teller-storage` ships Argon2id/AEAD, in-memory and SQLite implementations.

use crate::session::Session;
use crate::vault::EncryptedVault;
use crate::Result;
use zeroize::Zeroizing;

/// Passphrase-based symmetric encryption.
///
/// `decrypt(p, encrypt(p, m)) == m` must hold exactly. Decrypting with the
/// wrong passphrase, or a tampered ciphertext, must return an error and
/// never garbage.
pub trait EncryptionService: Send + Sync {
    /// Encrypt `plaintext` under `passphrase` into an opaque text blob
    fn encrypt(&self, passphrase: &str, plaintext: &[u8]) -> Result<String>;

    /// Decrypt a blob produced by [`EncryptionService::encrypt`]
    fn decrypt(&self, passphrase: &str, ciphertext: &str) -> Result<Zeroizing<Vec<u8>>>;
}

/// Persistence for the single encrypted vault blob
pub trait VaultStore: Send + Sync {
    /// Load the persisted vault, if any
    fn get(&self) -> Result<Option<EncryptedVault>>;

    /// Persist the vault, replacing any previous blob
    fn save(&self, vault: &EncryptedVault) -> Result<()>;
}

/// Persistence for sessions
pub trait SessionStore: Send + Sync {
    /// All stored sessions, valid or not
    fn list(&self) -> Result<Vec<Session>>;

    /// Insert or replace a session by id
    fn save(&self, session: &Session) -> Result<()>;

    /// Look up a session by id
    fn get_by_id(&self, id: &str) -> Result<Option<Session>>;
}
