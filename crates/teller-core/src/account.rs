//! Accounts and their non-secret references

use crate::contracts::EncryptionService;
use crate::secret::EncryptedSecret;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use teller_params::SupportedProtocol;
use zeroize::Zeroizing;

/// Maximum account or recovery phrase display name length
pub const MAX_NAME_LENGTH: usize = 100;

/// How an account's key came to be
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AccountKind {
    /// Freshly generated or imported from a raw private key
    Individual,
    /// Root of an HD chain, backed by a stored recovery phrase
    #[serde(rename_all = "camelCase")]
    HdSeed {
        /// Id of the recovery phrase the seed comes from
        seed_id: String,
    },
    /// Derived child of an HD seed account
    #[serde(rename_all = "camelCase")]
    HdChild {
        /// Id of the HD seed account
        parent_id: String,
        /// Address index on the protocol derivation path
        hdw_index: u32,
        /// BIP-44 account index
        hdw_account_index: u32,
    },
}

impl AccountKind {
    /// Short label for logs and listings
    pub fn label(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::HdSeed { .. } => "hd-seed",
            Self::HdChild { .. } => "hd-child",
        }
    }
}

/// Private key as held inside the vault
#[derive(Clone)]
pub enum AccountSecret {
    /// Protected only by vault encryption
    Plain(Zeroizing<String>),
    /// Additionally sealed with an account passphrase
    Encrypted(EncryptedSecret),
}

impl fmt::Debug for AccountSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain(..)"),
            Self::Encrypted(_) => f.write_str("Encrypted(..)"),
        }
    }
}

/// One keypair for one protocol
#[derive(Debug, Clone)]
pub struct Account {
    id: String,
    name: String,
    address: String,
    public_key: String,
    protocol: SupportedProtocol,
    kind: AccountKind,
    secret: AccountSecret,
}

impl Account {
    /// Create an account holding a plain private key.
    ///
    /// Protocol services call this once they have derived the key material.
    pub fn new(
        protocol: SupportedProtocol,
        name: impl Into<String>,
        address: impl Into<String>,
        public_key: impl Into<String>,
        private_key: Zeroizing<String>,
        kind: AccountKind,
    ) -> Result<Self> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            address: address.into(),
            public_key: public_key.into(),
            protocol,
            kind,
            secret: AccountSecret::Plain(private_key),
        })
    }

    pub(crate) fn from_parts(
        id: String,
        name: String,
        address: String,
        public_key: String,
        protocol: SupportedProtocol,
        kind: AccountKind,
        secret: AccountSecret,
    ) -> Self {
        Self {
            id,
            name,
            address,
            public_key,
            protocol,
            kind,
            secret,
        }
    }

    /// Account id (uuid v4)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol-specific address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Protocol-specific public key encoding
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Ledger family
    pub fn protocol(&self) -> SupportedProtocol {
        self.protocol
    }

    /// Account kind
    pub fn kind(&self) -> &AccountKind {
        &self.kind
    }

    /// Stored secret
    pub fn secret(&self) -> &AccountSecret {
        &self.secret
    }

    /// Whether the private key needs an account passphrase
    pub fn is_secure(&self) -> bool {
        matches!(self.secret, AccountSecret::Encrypted(_))
    }

    /// HD index for children, 0 for seeds
    pub fn hdw_index(&self) -> Option<u32> {
        match &self.kind {
            AccountKind::HdChild { hdw_index, .. } => Some(*hdw_index),
            AccountKind::HdSeed { .. } => Some(0),
            AccountKind::Individual => None,
        }
    }

    /// Recovery phrase id for HD seed accounts
    pub fn seed_id(&self) -> Option<&str> {
        match &self.kind {
            AccountKind::HdSeed { seed_id } => Some(seed_id),
            _ => None,
        }
    }

    /// Parent account id for HD children
    pub fn parent_id(&self) -> Option<&str> {
        match &self.kind {
            AccountKind::HdChild { parent_id, .. } => Some(parent_id),
            _ => None,
        }
    }

    /// Seal the private key with an account passphrase
    pub fn secure(
        mut self,
        encryption: &dyn EncryptionService,
        passphrase: &str,
    ) -> Result<Self> {
        if let AccountSecret::Plain(key) = &self.secret {
            let sealed = EncryptedSecret::seal(encryption, passphrase, key)?;
            self.secret = AccountSecret::Encrypted(sealed);
        }
        Ok(self)
    }

    /// Recover the private key.
    ///
    /// Secure accounts need `passphrase`; a missing or wrong passphrase is
    /// [`Error::PrivateKeyRestoreFailed`].
    pub fn private_key(
        &self,
        encryption: &dyn EncryptionService,
        passphrase: Option<&str>,
    ) -> Result<Zeroizing<String>> {
        match &self.secret {
            AccountSecret::Plain(key) => Ok(key.clone()),
            AccountSecret::Encrypted(sealed) => {
                let passphrase = passphrase.ok_or_else(|| {
                    Error::PrivateKeyRestoreFailed(format!(
                        "account {} requires its passphrase",
                        self.id
                    ))
                })?;
                sealed.open(encryption, passphrase).map_err(|_| {
                    Error::PrivateKeyRestoreFailed(format!(
                        "could not decrypt private key of account {}",
                        self.id
                    ))
                })
            }
        }
    }

    pub(crate) fn set_name(&mut self, name: String) -> Result<()> {
        self.name = validate_name(name)?;
        Ok(())
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Same key on the same ledger
    pub fn same_key_as(&self, other: &Account) -> bool {
        self.protocol == other.protocol && self.address.eq_ignore_ascii_case(&other.address)
    }

    /// Non-secret projection
    pub fn to_reference(&self) -> AccountReference {
        AccountReference {
            id: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            public_key: self.public_key.clone(),
            protocol: self.protocol,
            kind: self.kind.clone(),
            is_secure: self.is_secure(),
        }
    }
}

/// Secret-free view of an account, safe to hand to sessions and UIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReference {
    /// Account id
    pub id: String,
    /// Display name
    pub name: String,
    /// Address
    pub address: String,
    /// Public key
    pub public_key: String,
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Account kind
    #[serde(rename = "accountType")]
    pub kind: AccountKind,
    /// Whether the private key needs an account passphrase
    pub is_secure: bool,
}

pub(crate) fn validate_name(name: String) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "name exceeds {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}
