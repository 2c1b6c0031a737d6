//! Stored recovery phrases

use crate::account::validate_name;
use crate::keys::{mnemonic_to_seed, normalize_mnemonic, validate_mnemonic};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// A validated BIP-39 mnemonic plus optional seed passphrase.
///
/// Holds no derived keys; HD accounts re-derive from [`RecoveryPhrase::seed`].
#[derive(Clone)]
pub struct RecoveryPhrase {
    id: String,
    name: String,
    phrase: Zeroizing<String>,
    passphrase: Option<Zeroizing<String>>,
    created_at: DateTime<Utc>,
}

impl RecoveryPhrase {
    /// Validate and wrap a mnemonic.
    ///
    /// An empty passphrase is treated as absent.
    pub fn new(name: impl Into<String>, phrase: &str, passphrase: Option<&str>) -> Result<Self> {
        validate_mnemonic(phrase)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: validate_name(name.into())?,
            phrase: normalize_mnemonic(phrase),
            passphrase: passphrase
                .filter(|p| !p.is_empty())
                .map(|p| Zeroizing::new(p.to_string())),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn from_parts(
        id: String,
        name: String,
        phrase: Zeroizing<String>,
        passphrase: Option<Zeroizing<String>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            phrase,
            passphrase,
            created_at,
        }
    }

    /// Phrase id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized mnemonic words
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Seed passphrase
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref().map(|p| p.as_str())
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 64-byte BIP-39 seed
    pub fn seed(&self) -> Result<Zeroizing<[u8; 64]>> {
        mnemonic_to_seed(&self.phrase, self.passphrase().unwrap_or(""))
    }

    /// Same words and same passphrase
    pub fn is_same_as(&self, other: &RecoveryPhrase) -> bool {
        self.phrase == other.phrase && self.passphrase() == other.passphrase()
    }

    pub(crate) fn set_name(&mut self, name: String) -> Result<()> {
        self.name = validate_name(name)?;
        Ok(())
    }

    /// Non-secret projection
    pub fn to_reference(&self) -> RecoveryPhraseReference {
        RecoveryPhraseReference {
            id: self.id.clone(),
            name: self.name.clone(),
            word_count: self.phrase.split(' ').count(),
            has_passphrase: self.passphrase.is_some(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryPhrase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_passphrase", &self.passphrase.is_some())
            .finish_non_exhaustive()
    }
}

/// Secret-free view of a recovery phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPhraseReference {
    /// Phrase id
    pub id: String,
    /// Display name
    pub name: String,
    /// Number of mnemonic words
    pub word_count: usize,
    /// Whether a seed passphrase is attached
    pub has_passphrase: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
