//! Request types for [`crate::VaultTeller`] operations

use chrono::Duration;
use serde_json::Value;
use teller_core::{AccountReference, Permissions, SupportedProtocol};
use teller_protocols::{NetworkTarget, TransferRequest};
use zeroize::Zeroizing;

/// Unlock options
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlockOptions {
    /// Lifetime of the minted session; the configured default when absent
    pub session_max_age: Option<Duration>,
}

/// Grant for a remote origin
#[derive(Debug, Clone)]
pub struct ExternalAccessRequest {
    /// Requesting origin
    pub origin: String,
    /// Permissions granted, before the automatic self-revoke grant
    pub permissions: Permissions,
    /// Accounts exposed to the origin
    pub accounts: Vec<AccountReference>,
    /// Session lifetime; the configured external default when absent
    pub max_age: Option<Duration>,
}

/// New random account
#[derive(Clone)]
pub struct CreateAccountRequest {
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Display name
    pub name: String,
    /// Account passphrase; the private key is sealed with it when present
    pub passphrase: Option<Zeroizing<String>>,
}

impl CreateAccountRequest {
    /// Plain account
    pub fn new(protocol: SupportedProtocol, name: impl Into<String>) -> Self {
        Self {
            protocol,
            name: name.into(),
            passphrase: None,
        }
    }

    /// Seal the private key with `passphrase`
    pub fn secured_with(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(Zeroizing::new(passphrase.into()));
        self
    }
}

/// Account from an existing private key
#[derive(Clone)]
pub struct ImportAccountRequest {
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Display name
    pub name: String,
    /// Hex private key in the protocol's format
    pub private_key: Zeroizing<String>,
    /// Account passphrase
    pub passphrase: Option<Zeroizing<String>>,
    /// Overwrite an account with the same address instead of failing
    pub replace: bool,
}

/// Recovery phrase to store
#[derive(Clone)]
pub struct ImportRecoveryPhraseRequest {
    /// Display name
    pub name: String,
    /// BIP-39 words
    pub phrase: Zeroizing<String>,
    /// BIP-39 passphrase
    pub passphrase: Option<Zeroizing<String>>,
}

/// HD children to derive
#[derive(Debug, Clone)]
pub struct AddHdWalletAccountRequest {
    /// Recovery phrase the accounts derive from
    pub recovery_phrase_id: String,
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Number of new children
    pub count: u32,
}

/// Transfer from a vault account
#[derive(Clone)]
pub struct TransferFundsRequest {
    /// Endpoint to submit through
    pub network: NetworkTarget,
    /// Sender, recipient, amount and protocol extras
    pub transfer: TransferRequest,
    /// Needed when the sending account is secure
    pub account_passphrase: Option<Zeroizing<String>>,
}

/// Caller-built transaction to sign and submit
#[derive(Clone)]
pub struct RawTransactionRequest {
    /// Endpoint to submit through
    pub network: NetworkTarget,
    /// Signing account address
    pub from: String,
    /// Protocol-specific transaction JSON
    pub transaction: Value,
    /// Needed when the signing account is secure
    pub account_passphrase: Option<Zeroizing<String>>,
}

/// Personal-message signature
#[derive(Clone)]
pub struct SignPersonalDataRequest {
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Signing account address
    pub address: String,
    /// Message; `0x` hex is signed as bytes, anything else as UTF-8
    pub data: String,
    /// Needed when the signing account is secure
    pub account_passphrase: Option<Zeroizing<String>>,
}

/// EIP-712 signature
#[derive(Clone)]
pub struct SignTypedDataRequest {
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Signing account address
    pub address: String,
    /// Typed data document (`types`, `primaryType`, `domain`, `message`)
    pub typed_data: Value,
    /// Needed when the signing account is secure
    pub account_passphrase: Option<Zeroizing<String>>,
}
