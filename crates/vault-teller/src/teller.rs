//! The vault teller
//!
//! Every vault mutation runs the same guarded sequence: decrypt the
//! persisted vault, apply the change to that fresh copy, seal, save, and
//! only then mirror the result into the unlocked in-memory copy.

use crate::config::TellerConfig;
use crate::requests::{
    AddHdWalletAccountRequest, CreateAccountRequest, ExternalAccessRequest, ImportAccountRequest,
    ImportRecoveryPhraseRequest, RawTransactionRequest, SignPersonalDataRequest,
    SignTypedDataRequest, TransferFundsRequest, UnlockOptions,
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use teller_core::{
    Account, AccountReference, EncryptedVault, EncryptionService, Error, PermissionAction,
    PermissionResource, PermissionsBuilder, RecoveryPhrase, RecoveryPhraseReference, Result,
    Session, SessionStore, SupportedProtocol, Vault, VaultStore, HARDENED_OFFSET,
};
use teller_net::RpcClient;
use teller_protocols::{
    child_name, message_bytes, CreateAccountOptions, FeeQuote, FeeRequest,
    HdWalletAccountOptions, ImportAccountOptions, NetworkStatus, NetworkTarget,
    ProtocolServiceFactory, RecoveryPhraseAccountsOptions, TransactionResult,
};
use teller_storage::{MemorySessionStore, MemoryVaultStore};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Plaintext held while unlocked
struct UnlockedState {
    vault: Vault,
    passphrase: Zeroizing<String>,
}

/// Orchestrator over the vault, sessions and protocol services
pub struct VaultTeller {
    vault_store: Arc<dyn VaultStore>,
    session_store: Arc<dyn SessionStore>,
    encryption: Arc<dyn EncryptionService>,
    protocols: ProtocolServiceFactory,
    config: TellerConfig,
    write_lock: Mutex<()>,
    // Held from load to save on every stored-session update
    session_lock: parking_lot::Mutex<()>,
    state: RwLock<Option<UnlockedState>>,
}

/// Builder for [`VaultTeller`].
///
/// Unset collaborators fall back to in-memory stores, the configured
/// passphrase encryption and the default protocol services over the
/// configured transport.
#[derive(Default)]
pub struct VaultTellerBuilder {
    config: TellerConfig,
    vault_store: Option<Arc<dyn VaultStore>>,
    session_store: Option<Arc<dyn SessionStore>>,
    encryption: Option<Arc<dyn EncryptionService>>,
    protocols: Option<ProtocolServiceFactory>,
}

impl VaultTellerBuilder {
    /// Configuration
    pub fn config(mut self, config: TellerConfig) -> Self {
        self.config = config;
        self
    }

    /// Vault blob store
    pub fn vault_store(mut self, store: Arc<dyn VaultStore>) -> Self {
        self.vault_store = Some(store);
        self
    }

    /// Session store
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// One backend for both stores, e.g. a SQLite [`teller_storage::Database`]
    pub fn storage<S>(self, storage: Arc<S>) -> Self
    where
        S: VaultStore + SessionStore + 'static,
    {
        let vault_store: Arc<dyn VaultStore> = storage.clone();
        let session_store: Arc<dyn SessionStore> = storage;
        self.vault_store(vault_store).session_store(session_store)
    }

    /// Encryption service
    pub fn encryption(mut self, encryption: Arc<dyn EncryptionService>) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Protocol services
    pub fn protocols(mut self, protocols: ProtocolServiceFactory) -> Self {
        self.protocols = Some(protocols);
        self
    }

    /// Validate the config and assemble the teller
    pub fn build(self) -> Result<VaultTeller> {
        self.config.validate()?;

        let protocols = match self.protocols {
            Some(protocols) => protocols,
            None => {
                let rpc = RpcClient::new(&self.config.transport)?;
                ProtocolServiceFactory::with_defaults(Arc::new(rpc))
            }
        };
        let encryption: Arc<dyn EncryptionService> = match self.encryption {
            Some(encryption) => encryption,
            None => Arc::new(self.config.encryption.build()),
        };
        let vault_store: Arc<dyn VaultStore> = match self.vault_store {
            Some(store) => store,
            None => Arc::new(MemoryVaultStore::new()),
        };
        let session_store: Arc<dyn SessionStore> = match self.session_store {
            Some(store) => store,
            None => Arc::new(MemorySessionStore::new()),
        };

        Ok(VaultTeller {
            vault_store,
            session_store,
            encryption,
            protocols,
            config: self.config,
            write_lock: Mutex::new(()),
            session_lock: parking_lot::Mutex::new(()),
            state: RwLock::new(None),
        })
    }
}

impl VaultTeller {
    /// Teller over explicit collaborators with the default config
    pub fn new(
        vault_store: Arc<dyn VaultStore>,
        session_store: Arc<dyn SessionStore>,
        encryption: Arc<dyn EncryptionService>,
        protocols: ProtocolServiceFactory,
    ) -> Self {
        Self {
            vault_store,
            session_store,
            encryption,
            protocols,
            config: TellerConfig::default(),
            write_lock: Mutex::new(()),
            session_lock: parking_lot::Mutex::new(()),
            state: RwLock::new(None),
        }
    }

    /// Start a builder
    pub fn builder() -> VaultTellerBuilder {
        VaultTellerBuilder::default()
    }

    /// Active configuration
    pub fn config(&self) -> &TellerConfig {
        &self.config
    }

    /// Registered protocol services
    pub fn protocols(&self) -> &ProtocolServiceFactory {
        &self.protocols
    }

    // ========================================================================
    // Vault lifecycle
    // ========================================================================

    /// Whether a vault blob has been stored
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.vault_store.get()?.is_some())
    }

    /// Whether the plaintext vault is held in memory
    pub fn is_unlocked(&self) -> bool {
        self.state.read().is_some()
    }

    /// Create and store an empty vault sealed with `passphrase`
    pub async fn initialize_vault(&self, passphrase: &str) -> Result<()> {
        if passphrase.is_empty() {
            return Err(Error::InvalidArgument(
                "vault passphrase must not be empty".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        if self.vault_store.get()?.is_some() {
            return Err(Error::VaultAlreadyInitialized(
                "a vault is already stored".to_string(),
            ));
        }

        let sealed = Vault::new().seal(self.encryption.as_ref(), passphrase, None)?;
        self.vault_store.save(&sealed)?;
        info!("Vault initialized");
        Ok(())
    }

    /// Decrypt the vault and mint a local all-access session
    pub async fn unlock_vault(&self, passphrase: &str, options: UnlockOptions) -> Result<Session> {
        let _guard = self.write_lock.lock().await;
        let persisted = self.persisted_vault()?;
        let vault = Vault::open(self.encryption.as_ref(), passphrase, &persisted)
            .map_err(vault_restore_error)?;

        let max_age = options
            .session_max_age
            .or_else(|| self.config.session_max_age());
        let session = Session::local(
            PermissionsBuilder::new().allow_everything().on_any().build(),
            max_age,
        );
        self.session_store.save(&session)?;

        *self.state.write() = Some(UnlockedState {
            vault,
            passphrase: Zeroizing::new(passphrase.to_string()),
        });
        info!("Vault unlocked, local session {} minted", session.id());
        Ok(session)
    }

    /// Drop the in-memory plaintext. Sessions stay as they are.
    pub fn lock_vault(&self) {
        if self.state.write().take().is_some() {
            info!("Vault locked");
        }
    }

    /// Persisted vault blob, after proving `vault_passphrase` opens it
    pub fn export_vault(&self, session_id: &str, vault_passphrase: &str) -> Result<EncryptedVault> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Seed,
            PermissionAction::Read,
            &[],
        )?;
        let persisted = self.persisted_vault()?;
        Vault::open(self.encryption.as_ref(), vault_passphrase, &persisted)
            .map_err(vault_restore_error)?;
        debug!("Vault exported by session {}", session_id);
        Ok(persisted)
    }

    /// Replace the stored vault with `encrypted` and lock.
    ///
    /// The blob must open with `passphrase`. Without `overwrite` an existing
    /// vault is [`Error::VaultAlreadyInitialized`].
    pub async fn import_vault(
        &self,
        encrypted: &EncryptedVault,
        passphrase: &str,
        overwrite: bool,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !overwrite && self.vault_store.get()?.is_some() {
            return Err(Error::VaultAlreadyInitialized(
                "refusing to overwrite the stored vault".to_string(),
            ));
        }

        Vault::open(self.encryption.as_ref(), passphrase, encrypted)
            .map_err(vault_restore_error)?;
        self.vault_store.save(encrypted)?;
        self.state.write().take();
        info!("Vault imported, teller locked");
        Ok(())
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Mint a scoped session for a remote origin.
    ///
    /// Exposed accounts must exist in the vault. The session may always
    /// revoke itself.
    pub fn authorize_external(
        &self,
        request: ExternalAccessRequest,
        protocol: Option<SupportedProtocol>,
    ) -> Result<Session> {
        if request.origin.trim().is_empty() {
            return Err(Error::InvalidArgument("origin must not be empty".to_string()));
        }
        self.with_vault(|vault| {
            for reference in &request.accounts {
                let known = vault
                    .find_account(&reference.id)
                    .is_some_and(|a| a.address() == reference.address);
                if !known {
                    return Err(Error::AccountNotFound(reference.id.clone()));
                }
            }
            Ok(())
        })?;

        let max_age = request
            .max_age
            .or_else(|| self.config.external_session_max_age());
        let session = Session::external(
            request.permissions,
            max_age,
            request.origin,
            protocol,
            request.accounts,
        );
        self.session_store.save(&session)?;
        info!(
            "External session {} authorized for {}",
            session.id(),
            session.origin().unwrap_or_default()
        );
        Ok(session)
    }

    /// Resolve a session and check it may perform `action` on `resource`
    /// for every id in `ids`.
    ///
    /// Fails with [`Error::SessionNotFound`], then [`Error::SessionInvalid`],
    /// then [`Error::SessionForbidden`]. On success the activity timestamp
    /// is refreshed and saved.
    pub fn validate_session_for_permissions(
        &self,
        session_id: &str,
        resource: PermissionResource,
        action: PermissionAction,
        ids: &[String],
    ) -> Result<Session> {
        let _sessions = self.session_lock.lock();
        let mut session = self.load_valid_session(session_id)?;
        if !session.is_allowed(resource, action, ids) {
            return Err(Error::SessionForbidden(format!(
                "session {} may not {} {}",
                session_id, action, resource
            )));
        }
        session.touch();
        self.session_store.save(&session)?;
        Ok(session)
    }

    /// False for unknown, revoked and expired sessions
    pub fn is_session_valid(&self, session_id: &str) -> Result<bool> {
        Ok(self
            .session_store
            .get_by_id(session_id)?
            .is_some_and(|s| s.is_valid()))
    }

    /// Revoke `target_id`. Terminal.
    pub fn revoke_session(&self, session_id: &str, target_id: &str) -> Result<()> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Session,
            PermissionAction::Revoke,
            &[target_id.to_string()],
        )?;
        let _sessions = self.session_lock.lock();
        let mut target = self
            .session_store
            .get_by_id(target_id)?
            .ok_or_else(|| Error::SessionNotFound(target_id.to_string()))?;
        target.invalidate();
        self.session_store.save(&target)?;
        info!("Session {} revoked", target_id);
        Ok(())
    }

    /// All stored sessions
    pub fn list_sessions(&self, session_id: &str) -> Result<Vec<Session>> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Session,
            PermissionAction::List,
            &[],
        )?;
        self.session_store.list()
    }

    // ========================================================================
    // Accounts and recovery phrases
    // ========================================================================

    /// Accounts the session may read
    pub fn list_accounts(&self, session_id: &str) -> Result<Vec<AccountReference>> {
        let session = self.validate_session_for_permissions(
            session_id,
            PermissionResource::Account,
            PermissionAction::Read,
            &[],
        )?;
        self.with_vault(|vault| {
            Ok(vault
                .accounts()
                .iter()
                .filter(|a| {
                    session.is_allowed(
                        PermissionResource::Account,
                        PermissionAction::Read,
                        &[a.address().to_string()],
                    )
                })
                .map(Account::to_reference)
                .collect())
        })
    }

    /// Recovery phrases the session may read, without their words
    pub fn list_recovery_phrases(&self, session_id: &str) -> Result<Vec<RecoveryPhraseReference>> {
        let session = self.validate_session_for_permissions(
            session_id,
            PermissionResource::Seed,
            PermissionAction::Read,
            &[],
        )?;
        self.with_vault(|vault| {
            Ok(vault
                .recovery_phrases()
                .iter()
                .filter(|p| {
                    session.is_allowed(
                        PermissionResource::Seed,
                        PermissionAction::Read,
                        &[p.id().to_string()],
                    )
                })
                .map(RecoveryPhrase::to_reference)
                .collect())
        })
    }

    /// Generate a random account
    pub async fn create_account(
        &self,
        session_id: &str,
        request: CreateAccountRequest,
    ) -> Result<AccountReference> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Account,
            PermissionAction::Create,
            &[],
        )?;
        self.require_unlocked()?;

        let service = self.protocols.get(request.protocol)?;
        let account = service.create_account(&CreateAccountOptions { name: request.name })?;
        let account = self.secure_account(account, secret_str(&request.passphrase))?;

        let reference = self
            .mutate_vault(move |vault| vault.add_account(account, false).map(|a| a.to_reference()))
            .await?;
        info!("Created {} account {}", reference.protocol, reference.address);
        Ok(reference)
    }

    /// Import an account from its private key
    pub async fn create_account_from_private_key(
        &self,
        session_id: &str,
        request: ImportAccountRequest,
    ) -> Result<AccountReference> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Account,
            PermissionAction::Create,
            &[],
        )?;
        self.require_unlocked()?;

        let service = self.protocols.get(request.protocol)?;
        let account = service.create_account_from_private_key(&ImportAccountOptions {
            name: request.name,
            private_key: request.private_key,
        })?;
        let account = self.secure_account(account, secret_str(&request.passphrase))?;

        let replace = request.replace;
        let reference = self
            .mutate_vault(move |vault| {
                vault
                    .add_account(account, replace)
                    .map(|a| a.to_reference())
            })
            .await?;
        info!(
            "Imported {} account {}",
            reference.protocol, reference.address
        );
        Ok(reference)
    }

    /// Store a recovery phrase. No accounts are derived yet.
    pub async fn import_recovery_phrase(
        &self,
        session_id: &str,
        request: ImportRecoveryPhraseRequest,
    ) -> Result<RecoveryPhraseReference> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Seed,
            PermissionAction::Create,
            &[],
        )?;
        self.require_unlocked()?;

        let phrase = RecoveryPhrase::new(
            request.name,
            &request.phrase,
            secret_str(&request.passphrase),
        )?;
        let reference = self
            .mutate_vault(move |vault| vault.add_recovery_phrase(phrase).map(|p| p.to_reference()))
            .await?;
        info!("Imported recovery phrase {}", reference.id);
        Ok(reference)
    }

    /// Rename a recovery phrase
    pub async fn update_recovery_phrase_name(
        &self,
        session_id: &str,
        recovery_phrase_id: &str,
        name: &str,
    ) -> Result<RecoveryPhraseReference> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Seed,
            PermissionAction::Update,
            &[recovery_phrase_id.to_string()],
        )?;
        self.mutate_vault(|vault| {
            vault
                .update_recovery_phrase_name(recovery_phrase_id, name)
                .map(|p| p.to_reference())
        })
        .await
    }

    /// Remove a recovery phrase together with its HD accounts
    pub async fn remove_recovery_phrase(
        &self,
        session_id: &str,
        recovery_phrase_id: &str,
    ) -> Result<()> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Seed,
            PermissionAction::Delete,
            &[recovery_phrase_id.to_string()],
        )?;
        let removed = self
            .mutate_vault(|vault| vault.remove_recovery_phrase(recovery_phrase_id))
            .await?;
        info!(
            "Removed recovery phrase {} and {} account(s)",
            recovery_phrase_id,
            removed.len()
        );
        self.forget_accounts(&removed);
        Ok(())
    }

    /// Recovery phrase words, after proving the vault passphrase
    pub fn get_recovery_phrase(
        &self,
        session_id: &str,
        recovery_phrase_id: &str,
        vault_passphrase: &str,
    ) -> Result<RecoveryPhrase> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Seed,
            PermissionAction::Read,
            &[recovery_phrase_id.to_string()],
        )?;
        self.verify_vault_passphrase(vault_passphrase)?;
        self.with_vault(|vault| vault.require_recovery_phrase(recovery_phrase_id).cloned())
    }

    /// Derive `count` HD children of a recovery phrase.
    ///
    /// The protocol's seed account is created first if missing. Children
    /// take the smallest unused indices, so gaps left by removals are
    /// refilled before new indices are used.
    pub async fn add_hd_wallet_account(
        &self,
        session_id: &str,
        request: AddHdWalletAccountRequest,
    ) -> Result<Vec<AccountReference>> {
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Account,
            PermissionAction::Create,
            &[],
        )?;
        if request.count == 0 {
            return Err(Error::InvalidArgument(
                "count must be at least 1".to_string(),
            ));
        }
        self.require_unlocked()?;

        let protocol = request.protocol;
        let service = self.protocols.get(protocol)?;
        let created = self
            .mutate_vault(move |vault| {
                let (seed, phrase_name) = {
                    let phrase = vault.require_recovery_phrase(&request.recovery_phrase_id)?;
                    (phrase.seed()?, phrase.name().to_string())
                };

                let parent_id = match vault.hd_seed_for(&request.recovery_phrase_id, request.protocol)
                {
                    Some(existing) => existing.id().to_string(),
                    None => {
                        let accounts = service.create_accounts_from_recovery_phrase(
                            &RecoveryPhraseAccountsOptions {
                                seed_id: request.recovery_phrase_id.clone(),
                                seed: seed.clone(),
                                name: phrase_name,
                            },
                        )?;
                        vault.add_account(accounts.seed, false)?.id().to_string()
                    }
                };
                let parent_name = vault.require_account(&parent_id)?.name().to_string();

                let used: BTreeSet<u32> = vault
                    .hd_children_of(&parent_id)
                    .iter()
                    .filter_map(|a| a.hdw_index())
                    .collect();

                let mut created = Vec::new();
                for index in free_indices(&used, request.count, HARDENED_OFFSET)? {
                    let child = service.create_hd_wallet_account(&HdWalletAccountOptions {
                        parent_id: parent_id.clone(),
                        seed: seed.clone(),
                        index,
                        name: child_name(&parent_name, index),
                    })?;
                    created.push(vault.add_account(child, false)?.to_reference());
                }
                Ok(created)
            })
            .await?;

        info!("Derived {} {} HD account(s)", created.len(), protocol);
        Ok(created)
    }

    /// Remove an account. Seed accounts take their children along.
    ///
    /// Removed accounts are dropped from sessions that expose them; failures
    /// there are logged and ignored.
    pub async fn remove_account(&self, session_id: &str, account_id: &str) -> Result<()> {
        self.authorize_account(session_id, PermissionAction::Delete, account_id)?;
        let removed = self
            .mutate_vault(|vault| vault.remove_account(account_id))
            .await?;
        info!("Removed {} account(s) starting at {}", removed.len(), account_id);
        self.forget_accounts(&removed);
        Ok(())
    }

    /// Rename an account
    pub async fn update_account_name(
        &self,
        session_id: &str,
        account_id: &str,
        name: &str,
    ) -> Result<AccountReference> {
        self.authorize_account(session_id, PermissionAction::Update, account_id)?;
        self.mutate_vault(|vault| {
            vault
                .update_account_name(account_id, name)
                .map(|a| a.to_reference())
        })
        .await
    }

    /// Export a private key.
    ///
    /// Secure accounts take their account passphrase
    /// ([`Error::PrivateKeyRestoreFailed`] when wrong); the rest take the
    /// vault passphrase ([`Error::VaultRestoreFailed`] when wrong).
    pub fn get_account_private_key(
        &self,
        session_id: &str,
        account_id: &str,
        passphrase: &str,
    ) -> Result<Zeroizing<String>> {
        let account = self.authorize_account(session_id, PermissionAction::Read, account_id)?;
        if account.is_secure() {
            account.private_key(self.encryption.as_ref(), Some(passphrase))
        } else {
            self.verify_vault_passphrase(passphrase)?;
            account.private_key(self.encryption.as_ref(), None)
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Sign and submit a transfer from a vault account
    pub async fn transfer_funds(
        &self,
        session_id: &str,
        request: TransferFundsRequest,
    ) -> Result<TransactionResult> {
        let protocol = request.network.protocol;
        let account = self.authorize_signer(session_id, protocol, &request.transfer.from)?;
        let private_key =
            account.private_key(self.encryption.as_ref(), secret_str(&request.account_passphrase))?;

        let service = self.protocols.get(protocol)?;
        let result = service
            .send_transaction(&request.network, &private_key, &request.transfer)
            .await?;
        info!("{} transfer submitted: {}", protocol, result.hash);
        Ok(result)
    }

    /// Sign and submit a caller-built transaction
    pub async fn send_raw_transaction(
        &self,
        session_id: &str,
        request: RawTransactionRequest,
    ) -> Result<TransactionResult> {
        let protocol = request.network.protocol;
        let account = self.authorize_signer(session_id, protocol, &request.from)?;
        let private_key =
            account.private_key(self.encryption.as_ref(), secret_str(&request.account_passphrase))?;

        let service = self.protocols.get(protocol)?;
        let result = service
            .send_raw_transaction(&request.network, &private_key, &request.transaction)
            .await?;
        info!("{} raw transaction submitted: {}", protocol, result.hash);
        Ok(result)
    }

    /// Sign a personal message with a vault account
    pub fn sign_personal_data(
        &self,
        session_id: &str,
        request: SignPersonalDataRequest,
    ) -> Result<String> {
        let account = self.authorize_signer(session_id, request.protocol, &request.address)?;
        let private_key =
            account.private_key(self.encryption.as_ref(), secret_str(&request.account_passphrase))?;
        self.protocols
            .get(request.protocol)?
            .sign_personal_data(&private_key, &message_bytes(&request.data))
    }

    /// Sign EIP-712 typed data with a vault account
    pub fn sign_typed_data(&self, session_id: &str, request: SignTypedDataRequest) -> Result<String> {
        let account = self.authorize_signer(session_id, request.protocol, &request.address)?;
        let private_key =
            account.private_key(self.encryption.as_ref(), secret_str(&request.account_passphrase))?;
        self.protocols
            .get(request.protocol)?
            .sign_typed_data(&private_key, &request.typed_data)
    }

    // ========================================================================
    // Public chain data
    // ========================================================================

    /// Balance of the native asset, or of `token`
    pub async fn get_balance(
        &self,
        network: &NetworkTarget,
        address: &str,
        token: Option<&str>,
    ) -> Result<u128> {
        self.protocols
            .get(network.protocol)?
            .get_balance(network, address, token)
            .await
    }

    /// Fee quote
    pub async fn get_fee(&self, network: &NetworkTarget, request: &FeeRequest) -> Result<FeeQuote> {
        self.protocols
            .get(network.protocol)?
            .get_fee(network, request)
            .await
    }

    /// Probe balance, fee and send paths of `network`
    pub async fn get_network_status(&self, network: &NetworkTarget) -> Result<NetworkStatus> {
        self.protocols
            .get(network.protocol)?
            .get_network_status(network)
            .await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn persisted_vault(&self) -> Result<EncryptedVault> {
        self.vault_store
            .get()?
            .ok_or_else(|| Error::VaultUninitialized("no vault has been initialized".to_string()))
    }

    fn require_unlocked(&self) -> Result<()> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(vault_locked())
        }
    }

    fn with_vault<T>(&self, read: impl FnOnce(&Vault) -> Result<T>) -> Result<T> {
        let state = self.state.read();
        let state = state.as_ref().ok_or_else(vault_locked)?;
        read(&state.vault)
    }

    fn verify_vault_passphrase(&self, passphrase: &str) -> Result<()> {
        let persisted = self.persisted_vault()?;
        Vault::open(self.encryption.as_ref(), passphrase, &persisted)
            .map(|_| ())
            .map_err(vault_restore_error)
    }

    /// Single-writer read-modify-write of the persisted vault
    async fn mutate_vault<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Vault) -> Result<T>,
    {
        let _guard = self.write_lock.lock().await;
        let passphrase = match self.state.read().as_ref() {
            Some(state) => state.passphrase.clone(),
            None => return Err(vault_locked()),
        };

        let persisted = self.persisted_vault()?;
        let mut vault = Vault::open(self.encryption.as_ref(), &passphrase, &persisted)
            .map_err(vault_restore_error)?;
        let output = mutate(&mut vault)?;

        let sealed = vault.seal(
            self.encryption.as_ref(),
            &passphrase,
            Some(persisted.created_at),
        )?;
        self.vault_store.save(&sealed)?;

        if let Some(state) = self.state.write().as_mut() {
            state.vault = vault;
        }
        Ok(output)
    }

    fn load_valid_session(&self, session_id: &str) -> Result<Session> {
        let session = self
            .session_store
            .get_by_id(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        if !session.is_valid() {
            return Err(Error::SessionInvalid(session_id.to_string()));
        }
        Ok(session)
    }

    // Account ACLs are keyed by address; the session is checked before the
    // vault is consulted.
    fn authorize_account(
        &self,
        session_id: &str,
        action: PermissionAction,
        account_id: &str,
    ) -> Result<Account> {
        self.load_valid_session(session_id)?;
        let account = self.with_vault(|vault| vault.require_account(account_id).cloned())?;
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Account,
            action,
            &[account.address().to_string()],
        )?;
        Ok(account)
    }

    fn authorize_signer(
        &self,
        session_id: &str,
        protocol: SupportedProtocol,
        address: &str,
    ) -> Result<Account> {
        self.load_valid_session(session_id)?;
        let account = self.with_vault(|vault| {
            vault
                .find_by_address(protocol, address)
                .cloned()
                .ok_or_else(|| Error::AccountNotFound(format!("{} account {}", protocol, address)))
        })?;
        self.validate_session_for_permissions(
            session_id,
            PermissionResource::Transaction,
            PermissionAction::Send,
            &[account.address().to_string()],
        )?;
        Ok(account)
    }

    fn secure_account(&self, account: Account, passphrase: Option<&str>) -> Result<Account> {
        match passphrase {
            Some("") => Err(Error::InvalidArgument(
                "account passphrase must not be empty".to_string(),
            )),
            Some(passphrase) => account.secure(self.encryption.as_ref(), passphrase),
            None => Ok(account),
        }
    }

    fn forget_accounts(&self, removed: &[Account]) {
        if removed.is_empty() {
            return;
        }
        let _sessions = self.session_lock.lock();
        let sessions = match self.session_store.list() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Could not list sessions after account removal: {}", e);
                return;
            }
        };

        for mut session in sessions {
            let mut changed = false;
            for account in removed {
                changed |= session.remove_account(account.id());
            }
            if changed {
                if let Err(e) = self.session_store.save(&session) {
                    warn!(
                        "Could not drop removed accounts from session {}: {}",
                        session.id(),
                        e
                    );
                }
            }
        }
    }
}

fn vault_locked() -> Error {
    Error::VaultLocked("unlock the vault first".to_string())
}

fn vault_restore_error(err: Error) -> Error {
    match err {
        Error::Decryption(detail) => {
            debug!("Vault decryption failed: {}", detail);
            Error::VaultRestoreFailed("wrong passphrase or corrupt vault".to_string())
        }
        other => other,
    }
}

fn secret_str(secret: &Option<Zeroizing<String>>) -> Option<&str> {
    secret.as_ref().map(|s| s.as_str())
}

/// The `count` smallest indices below `end` not in `used`
fn free_indices(used: &BTreeSet<u32>, count: u32, end: u32) -> Result<Vec<u32>> {
    let available = end as usize - used.range(..end).count();
    if count as usize > available {
        return Err(Error::InvalidArgument(format!(
            "only {} HD indices below {} remain, {} requested",
            available, end, count
        )));
    }
    Ok((0..end)
        .filter(|index| !used.contains(index))
        .take(count as usize)
        .collect())
}
