//! The vault aggregate and its encrypted at-rest form

use crate::account::{Account, AccountKind, AccountSecret};
use crate::contracts::EncryptionService;
use crate::recovery_phrase::RecoveryPhrase;
use crate::secret::EncryptedSecret;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teller_params::SupportedProtocol;
use zeroize::Zeroizing;

/// Vault payload format version
const VAULT_FORMAT_VERSION: u32 = 1;

/// Vault as persisted by a [`crate::VaultStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVault {
    /// Output of the encryption collaborator
    pub ciphertext: String,
    /// First initialization
    pub created_at: DateTime<Utc>,
    /// Last persisted mutation
    pub updated_at: DateTime<Utc>,
}

/// In-memory vault: accounts and recovery phrases.
///
/// No two accounts share (address, protocol) and no two recovery phrases
/// share (words, passphrase).
#[derive(Debug, Clone, Default)]
pub struct Vault {
    accounts: Vec<Account>,
    recovery_phrases: Vec<RecoveryPhrase>,
}

impl Vault {
    /// Empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// All accounts
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// All recovery phrases
    pub fn recovery_phrases(&self) -> &[RecoveryPhrase] {
        &self.recovery_phrases
    }

    /// Account by id
    pub fn find_account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id() == id)
    }

    /// Account by address on a protocol
    pub fn find_by_address(&self, protocol: SupportedProtocol, address: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.protocol() == protocol && a.address().eq_ignore_ascii_case(address))
    }

    /// Account by id, or [`Error::AccountNotFound`]
    pub fn require_account(&self, id: &str) -> Result<&Account> {
        self.find_account(id)
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))
    }

    /// HD seed account for a recovery phrase and protocol
    pub fn hd_seed_for(&self, seed_id: &str, protocol: SupportedProtocol) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.protocol() == protocol && a.seed_id() == Some(seed_id))
    }

    /// Children of an HD seed account
    pub fn hd_children_of(&self, parent_id: &str) -> Vec<&Account> {
        self.accounts
            .iter()
            .filter(|a| a.parent_id() == Some(parent_id))
            .collect()
    }

    /// Add an account.
    ///
    /// With `replace`, an account holding the same key takes the new key
    /// material and name but keeps its id. Returns the stored account.
    pub fn add_account(&mut self, mut account: Account, replace: bool) -> Result<&Account> {
        let existing = self.accounts.iter().position(|a| a.same_key_as(&account));
        let index = match existing {
            Some(index) if replace => {
                account.set_id(self.accounts[index].id().to_string());
                self.accounts[index] = account;
                index
            }
            Some(_) => {
                return Err(Error::AccountAlreadyExists(format!(
                    "{} account {}",
                    account.protocol(),
                    account.address()
                )))
            }
            None => {
                self.accounts.push(account);
                self.accounts.len() - 1
            }
        };
        Ok(&self.accounts[index])
    }

    /// Remove an account; HD seeds take their children with them.
    ///
    /// Returns the removed accounts.
    pub fn remove_account(&mut self, id: &str) -> Result<Vec<Account>> {
        let target = self.require_account(id)?;
        let cascade = matches!(target.kind(), AccountKind::HdSeed { .. });
        let target_id = target.id().to_string();

        let (removed, kept): (Vec<Account>, Vec<Account>) =
            std::mem::take(&mut self.accounts).into_iter().partition(|a| {
                a.id() == target_id || (cascade && a.parent_id() == Some(target_id.as_str()))
            });
        self.accounts = kept;
        tracing::debug!("Removed {} account(s) rooted at {}", removed.len(), target_id);
        Ok(removed)
    }

    /// Rename an account
    pub fn update_account_name(&mut self, id: &str, name: &str) -> Result<&Account> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;
        account.set_name(name.to_string())?;
        Ok(account)
    }

    /// Recovery phrase by id
    pub fn find_recovery_phrase(&self, id: &str) -> Option<&RecoveryPhrase> {
        self.recovery_phrases.iter().find(|p| p.id() == id)
    }

    /// Recovery phrase by id, or [`Error::RecoveryPhraseNotFound`]
    pub fn require_recovery_phrase(&self, id: &str) -> Result<&RecoveryPhrase> {
        self.find_recovery_phrase(id)
            .ok_or_else(|| Error::RecoveryPhraseNotFound(id.to_string()))
    }

    /// Store a recovery phrase
    pub fn add_recovery_phrase(&mut self, phrase: RecoveryPhrase) -> Result<&RecoveryPhrase> {
        if self.recovery_phrases.iter().any(|p| p.is_same_as(&phrase)) {
            return Err(Error::RecoveryPhraseAlreadyExists(phrase.name().to_string()));
        }
        self.recovery_phrases.push(phrase);
        let last = self.recovery_phrases.len() - 1;
        Ok(&self.recovery_phrases[last])
    }

    /// Remove a recovery phrase and every HD account derived from it.
    ///
    /// Returns the removed accounts.
    pub fn remove_recovery_phrase(&mut self, id: &str) -> Result<Vec<Account>> {
        self.require_recovery_phrase(id)?;
        self.recovery_phrases.retain(|p| p.id() != id);

        let seed_ids: Vec<String> = self
            .accounts
            .iter()
            .filter(|a| a.seed_id() == Some(id))
            .map(|a| a.id().to_string())
            .collect();

        let mut removed = Vec::new();
        for seed_id in seed_ids {
            removed.extend(self.remove_account(&seed_id)?);
        }
        Ok(removed)
    }

    /// Rename a recovery phrase
    pub fn update_recovery_phrase_name(&mut self, id: &str, name: &str) -> Result<&RecoveryPhrase> {
        let phrase = self
            .recovery_phrases
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| Error::RecoveryPhraseNotFound(id.to_string()))?;
        phrase.set_name(name.to_string())?;
        Ok(phrase)
    }

    /// Encrypt into an [`EncryptedVault`].
    ///
    /// `created_at` carries over from the blob being replaced.
    pub fn seal(
        &self,
        encryption: &dyn EncryptionService,
        passphrase: &str,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<EncryptedVault> {
        let payload = VaultPayload {
            version: VAULT_FORMAT_VERSION,
            accounts: self.accounts.iter().map(AccountRecord::from).collect(),
            recovery_phrases: self
                .recovery_phrases
                .iter()
                .map(RecoveryPhraseRecord::from)
                .collect(),
        };
        let plaintext = Zeroizing::new(serde_json::to_vec(&payload)?);
        let ciphertext = encryption.encrypt(passphrase, &plaintext)?;

        let now = Utc::now();
        Ok(EncryptedVault {
            ciphertext,
            created_at: created_at.unwrap_or(now),
            updated_at: now,
        })
    }

    /// Decrypt an [`EncryptedVault`].
    ///
    /// Decryption failures stay [`Error::Decryption`]; the orchestrator
    /// decides which passphrase was wrong.
    pub fn open(
        encryption: &dyn EncryptionService,
        passphrase: &str,
        encrypted: &EncryptedVault,
    ) -> Result<Self> {
        let plaintext = encryption.decrypt(passphrase, &encrypted.ciphertext)?;
        let payload: VaultPayload = serde_json::from_slice(&plaintext)
            .map_err(|e| Error::Decryption(format!("vault payload is corrupt: {}", e)))?;

        if payload.version != VAULT_FORMAT_VERSION {
            return Err(Error::Decryption(format!(
                "unsupported vault format version {}",
                payload.version
            )));
        }

        Ok(Self {
            accounts: payload.accounts.into_iter().map(Account::from).collect(),
            recovery_phrases: payload
                .recovery_phrases
                .into_iter()
                .map(RecoveryPhrase::from)
                .collect(),
        })
    }
}

// Records below exist only between `seal` and `open`.

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultPayload {
    version: u32,
    accounts: Vec<AccountRecord>,
    recovery_phrases: Vec<RecoveryPhraseRecord>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    id: String,
    name: String,
    address: String,
    public_key: String,
    protocol: SupportedProtocol,
    account_type: AccountKind,
    private_key: SecretRecord,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "storage", content = "value", rename_all = "camelCase")]
enum SecretRecord {
    Plain(Zeroizing<String>),
    Encrypted(EncryptedSecret),
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id().to_string(),
            name: account.name().to_string(),
            address: account.address().to_string(),
            public_key: account.public_key().to_string(),
            protocol: account.protocol(),
            account_type: account.kind().clone(),
            private_key: match account.secret() {
                AccountSecret::Plain(key) => SecretRecord::Plain(key.clone()),
                AccountSecret::Encrypted(sealed) => SecretRecord::Encrypted(sealed.clone()),
            },
        }
    }
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        let secret = match record.private_key {
            SecretRecord::Plain(key) => AccountSecret::Plain(key),
            SecretRecord::Encrypted(sealed) => AccountSecret::Encrypted(sealed),
        };
        Account::from_parts(
            record.id,
            record.name,
            record.address,
            record.public_key,
            record.protocol,
            record.account_type,
            secret,
        )
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecoveryPhraseRecord {
    id: String,
    name: String,
    phrase: Zeroizing<String>,
    passphrase: Option<Zeroizing<String>>,
    created_at: DateTime<Utc>,
}

impl From<&RecoveryPhrase> for RecoveryPhraseRecord {
    fn from(phrase: &RecoveryPhrase) -> Self {
        Self {
            id: phrase.id().to_string(),
            name: phrase.name().to_string(),
            phrase: Zeroizing::new(phrase.phrase().to_string()),
            passphrase: phrase.passphrase().map(|p| Zeroizing::new(p.to_string())),
            created_at: phrase.created_at(),
        }
    }
}

impl From<RecoveryPhraseRecord> for RecoveryPhrase {
    fn from(record: RecoveryPhraseRecord) -> Self {
        RecoveryPhrase::from_parts(
            record.id,
            record.name,
            record.phrase,
            record.passphrase,
            record.created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ReversingEncryption;

    const PHRASE: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

    fn account(address: &str, kind: AccountKind) -> Account {
        Account::new(
            SupportedProtocol::Pocket,
            address,
            address,
            "pub",
            Zeroizing::new(format!("key-{}", address)),
            kind,
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_account_rejected_unless_replace() {
        let mut vault = Vault::new();
        let first_id = vault
            .add_account(account("aa", AccountKind::Individual), false)
            .unwrap()
            .id()
            .to_string();

        let err = vault
            .add_account(account("AA", AccountKind::Individual), false)
            .unwrap_err();
        assert!(matches!(err, Error::AccountAlreadyExists(_)));

        let replaced = vault
            .add_account(account("aa", AccountKind::Individual), true)
            .unwrap();
        assert_eq!(replaced.id(), first_id);
        assert_eq!(vault.accounts().len(), 1);
    }

    #[test]
    fn test_same_address_on_other_protocol_is_allowed() {
        let mut vault = Vault::new();
        vault
            .add_account(account("aa", AccountKind::Individual), false)
            .unwrap();
        let eth = Account::new(
            SupportedProtocol::Ethereum,
            "eth",
            "aa",
            "pub",
            Zeroizing::new("k".to_string()),
            AccountKind::Individual,
        )
        .unwrap();
        assert!(vault.add_account(eth, false).is_ok());
    }

    #[test]
    fn test_removing_seed_cascades_to_children() {
        let mut vault = Vault::new();
        let seed_id = vault
            .add_account(
                account("seed", AccountKind::HdSeed { seed_id: "p".to_string() }),
                false,
            )
            .unwrap()
            .id()
            .to_string();
        for (i, addr) in ["c0", "c1"].iter().enumerate() {
            let child = account(
                addr,
                AccountKind::HdChild {
                    parent_id: seed_id.clone(),
                    hdw_index: i as u32,
                    hdw_account_index: 0,
                },
            );
            vault.add_account(child, false).unwrap();
        }
        vault
            .add_account(account("solo", AccountKind::Individual), false)
            .unwrap();

        let removed = vault.remove_account(&seed_id).unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(vault.accounts().len(), 1);
        assert_eq!(vault.accounts()[0].address(), "solo");
    }

    #[test]
    fn test_remove_unknown_account() {
        let mut vault = Vault::new();
        assert!(matches!(
            vault.remove_account("missing"),
            Err(Error::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_recovery_phrase_rejected() {
        let mut vault = Vault::new();
        vault
            .add_recovery_phrase(RecoveryPhrase::new("a", PHRASE, None).unwrap())
            .unwrap();
        let err = vault
            .add_recovery_phrase(RecoveryPhrase::new("b", PHRASE, None).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::RecoveryPhraseAlreadyExists(_)));

        vault
            .add_recovery_phrase(RecoveryPhrase::new("c", PHRASE, Some("pw")).unwrap())
            .unwrap();
        assert_eq!(vault.recovery_phrases().len(), 2);
    }

    #[test]
    fn test_remove_recovery_phrase_removes_hd_accounts() {
        let mut vault = Vault::new();
        let phrase_id = vault
            .add_recovery_phrase(RecoveryPhrase::new("a", PHRASE, None).unwrap())
            .unwrap()
            .id()
            .to_string();
        let seed_id = vault
            .add_account(
                account("seed", AccountKind::HdSeed { seed_id: phrase_id.clone() }),
                false,
            )
            .unwrap()
            .id()
            .to_string();
        vault
            .add_account(
                account(
                    "c0",
                    AccountKind::HdChild {
                        parent_id: seed_id,
                        hdw_index: 0,
                        hdw_account_index: 0,
                    },
                ),
                false,
            )
            .unwrap();

        let removed = vault.remove_recovery_phrase(&phrase_id).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(vault.accounts().is_empty());
        assert!(vault.recovery_phrases().is_empty());
    }

    #[test]
    fn test_seal_open_round_trip() {
        let enc = ReversingEncryption;
        let mut vault = Vault::new();
        vault
            .add_account(account("aa", AccountKind::Individual), false)
            .unwrap();
        let secure = account("bb", AccountKind::Individual)
            .secure(&enc, "acct-pw")
            .unwrap();
        vault.add_account(secure, false).unwrap();
        vault
            .add_recovery_phrase(RecoveryPhrase::new("words", PHRASE, Some("x")).unwrap())
            .unwrap();

        let sealed = vault.seal(&enc, "vault-pw", None).unwrap();
        assert!(!sealed.ciphertext.contains("key-aa"));

        let opened = Vault::open(&enc, "vault-pw", &sealed).unwrap();
        assert_eq!(opened.accounts().len(), 2);
        assert_eq!(
            opened.accounts()[0].private_key(&enc, None).unwrap().as_str(),
            "key-aa"
        );
        assert!(opened.accounts()[1].is_secure());
        assert_eq!(opened.recovery_phrases()[0].passphrase(), Some("x"));
        assert_eq!(opened.accounts()[0].id(), vault.accounts()[0].id());
    }

    #[test]
    fn test_open_with_wrong_passphrase_fails() {
        let enc = ReversingEncryption;
        let sealed = Vault::new().seal(&enc, "right", None).unwrap();
        let err = Vault::open(&enc, "wrong", &sealed).unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_seal_preserves_created_at() {
        let enc = ReversingEncryption;
        let first = Vault::new().seal(&enc, "pw", None).unwrap();
        let second = Vault::new().seal(&enc, "pw", Some(first.created_at)).unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }
}
