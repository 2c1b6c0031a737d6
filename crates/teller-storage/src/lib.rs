//! Persistence for the vault teller
//!
//! Provides the encryption service and the vault/session stores that
//! `teller-core` defines as contracts.
//!
//! ## Components
//!
//! - **Passphrase encryption**: Argon2id (64 MiB, 3 iterations, 4 lanes by
//!   default) feeding AES-256-GCM or ChaCha20-Poly1305
//! - **SQLite stores**: WAL mode, versioned migrations, single-row vault
//!   table and a sessions table
//! - **Memory stores**: process-lifetime stores for tests and embedders

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod security;

pub use database::Database;
pub use error::{Error, Result};
pub use memory::{MemorySessionStore, MemoryVaultStore};
pub use security::{
    derive_key_bytes, generate_salt, EncryptionAlgorithm, KdfParams, MasterKey,
    PassphraseEncryption,
};
