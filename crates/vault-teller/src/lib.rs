//! Multi-chain vault teller
//!
//! The orchestrating facade over the encrypted vault, the session layer and
//! the per-protocol services.
//!
//! ## Architecture
//!
//! - **Vault lifecycle**: initialize, unlock (mints a local all-access
//!   session), lock, export and import
//! - **Sessions**: external authorization, permission validation,
//!   revocation
//! - **Accounts**: random, imported and HD-derived accounts, recovery
//!   phrases, private key export
//! - **Transactions**: transfers, raw transactions, personal and typed-data
//!   signing, balances, fees and network probes
//!
//! ## State Management
//!
//! A [`VaultTeller`] is constructed by the host and passed around
//! explicitly. Vault mutations are serialized behind one async mutex and
//! always hit storage before the in-memory copy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod requests;
pub mod teller;

pub use config::{EncryptionConfig, NamedNetwork, TellerConfig};
pub use error::{ConfigError, Error, Result};
pub use requests::{
    AddHdWalletAccountRequest, CreateAccountRequest, ExternalAccessRequest, ImportAccountRequest,
    ImportRecoveryPhraseRequest, RawTransactionRequest, SignPersonalDataRequest,
    SignTypedDataRequest, TransferFundsRequest, UnlockOptions,
};
pub use teller::{VaultTeller, VaultTellerBuilder};

pub use teller_core::{
    AccountKind, AccountReference, EncryptedVault, PermissionAction, PermissionResource,
    Permissions, PermissionsBuilder, RecoveryPhrase, RecoveryPhraseReference, Session,
    SupportedProtocol,
};
pub use teller_protocols::{
    FeeQuote, FeeRequest, NetworkStatus, NetworkTarget, TransactionResult, TransferRequest,
};
