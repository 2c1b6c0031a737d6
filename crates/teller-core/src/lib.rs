//! Vault teller core
//!
//! This crate holds the entities of the multi-chain key vault (accounts,
//! recovery phrases, sessions, permissions, the vault aggregate and its
//! encrypted form) together with the collaborator contracts the
//! orchestrator is built against.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod contracts;
pub mod error;
pub mod keys;
pub mod permission;
pub mod recovery_phrase;
pub mod secret;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod vault;

pub use account::{Account, AccountKind, AccountReference, AccountSecret, MAX_NAME_LENGTH};
pub use contracts::{EncryptionService, SessionStore, VaultStore};
pub use error::{Error, ErrorCategory, ErrorKind, Result};
pub use keys::{generate_mnemonic, mnemonic_to_seed, normalize_mnemonic, validate_mnemonic};
pub use permission::{
    Permission, PermissionAction, PermissionResource, Permissions, PermissionsBuilder,
    ANY_IDENTITY,
};
pub use recovery_phrase::{RecoveryPhrase, RecoveryPhraseReference};
pub use secret::EncryptedSecret;
pub use session::Session;
pub use teller_params::{SupportedProtocol, HARDENED_OFFSET};
pub use vault::{EncryptedVault, Vault};
