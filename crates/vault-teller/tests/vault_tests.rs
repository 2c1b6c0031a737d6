//! Vault lifecycle and account tests

use sha2::{Digest, Sha256};
use std::sync::Arc;
use teller_core::testing::ReversingEncryption;
use teller_core::{Error, PermissionAction, PermissionResource};
use teller_net::{RpcClient, TransportConfig};
use teller_protocols::ProtocolServiceFactory;
use teller_storage::{Database, MemorySessionStore, MemoryVaultStore, PassphraseEncryption};
use vault_teller::{
    CreateAccountRequest, ImportAccountRequest, SupportedProtocol, TellerConfig, UnlockOptions,
    VaultTeller,
};
use zeroize::Zeroizing;

const PASSPHRASE: &str = "Sup3rSecret!";

// Private key 1; address 0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf
const ETH_KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

fn factory() -> ProtocolServiceFactory {
    let rpc = RpcClient::new(&TransportConfig::default()).unwrap();
    ProtocolServiceFactory::with_defaults(Arc::new(rpc))
}

fn teller() -> VaultTeller {
    VaultTeller::new(
        Arc::new(MemoryVaultStore::new()),
        Arc::new(MemorySessionStore::new()),
        Arc::new(ReversingEncryption),
        factory(),
    )
}

async fn unlocked_teller() -> (VaultTeller, String) {
    let teller = teller();
    teller.initialize_vault(PASSPHRASE).await.unwrap();
    let session = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    (teller, session.id().to_string())
}

fn import_request(private_key: &str, replace: bool) -> ImportAccountRequest {
    ImportAccountRequest {
        protocol: SupportedProtocol::Ethereum,
        name: "Imported".to_string(),
        private_key: Zeroizing::new(private_key.to_string()),
        passphrase: None,
        replace,
    }
}

#[tokio::test]
async fn test_initialize_then_unlock_with_other_passphrase_fails() {
    let teller = teller();
    teller.initialize_vault(PASSPHRASE).await.unwrap();

    let err = teller
        .unlock_vault("not-the-passphrase", UnlockOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VaultRestoreFailed(_)));
    assert!(!teller.is_unlocked());
}

#[tokio::test]
async fn test_unlock_mints_all_access_session() {
    let teller = teller();
    assert!(!teller.is_initialized().unwrap());
    teller.initialize_vault(PASSPHRASE).await.unwrap();
    assert!(teller.is_initialized().unwrap());

    let session = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    assert!(session.is_valid());
    assert!(session.max_age().is_none());
    assert!(teller.is_unlocked());

    let resources = [
        PermissionResource::Account,
        PermissionResource::Transaction,
        PermissionResource::Session,
        PermissionResource::Seed,
    ];
    let actions = [
        PermissionAction::Create,
        PermissionAction::Read,
        PermissionAction::Update,
        PermissionAction::Delete,
        PermissionAction::Send,
        PermissionAction::Revoke,
        PermissionAction::List,
    ];
    for resource in resources {
        for action in actions {
            assert!(session.is_allowed(resource, action, &["anything".to_string()]));
        }
    }
    assert!(teller.is_session_valid(session.id()).unwrap());
}

#[tokio::test]
async fn test_initialize_twice_and_empty_passphrase() {
    let teller = teller();
    assert!(matches!(
        teller.initialize_vault("").await,
        Err(Error::InvalidArgument(_))
    ));
    teller.initialize_vault(PASSPHRASE).await.unwrap();
    assert!(matches!(
        teller.initialize_vault(PASSPHRASE).await,
        Err(Error::VaultAlreadyInitialized(_))
    ));
}

#[tokio::test]
async fn test_unlock_uninitialized_vault() {
    let teller = teller();
    let err = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VaultUninitialized(_)));
}

#[tokio::test]
async fn test_lock_keeps_sessions_but_blocks_vault_access() {
    let (teller, session) = unlocked_teller().await;
    teller.lock_vault();
    assert!(!teller.is_unlocked());
    assert!(teller.is_session_valid(&session).unwrap());

    assert!(matches!(
        teller.list_accounts(&session),
        Err(Error::VaultLocked(_))
    ));
    assert!(matches!(
        teller
            .create_account(&session, CreateAccountRequest::new(SupportedProtocol::Pocket, "a"))
            .await,
        Err(Error::VaultLocked(_))
    ));

    let relocked = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    assert!(teller.list_accounts(relocked.id()).unwrap().is_empty());
}

#[tokio::test]
async fn test_create_then_remove_leaves_account_count_unchanged() {
    let (teller, session) = unlocked_teller().await;
    teller
        .create_account(&session, CreateAccountRequest::new(SupportedProtocol::Ethereum, "Keep"))
        .await
        .unwrap();
    let before = teller.list_accounts(&session).unwrap().len();

    let created = teller
        .create_account(&session, CreateAccountRequest::new(SupportedProtocol::Cosmos, "Temp"))
        .await
        .unwrap();
    assert_eq!(teller.list_accounts(&session).unwrap().len(), before + 1);

    teller.remove_account(&session, &created.id).await.unwrap();
    assert_eq!(teller.list_accounts(&session).unwrap().len(), before);

    assert!(matches!(
        teller.remove_account(&session, &created.id).await,
        Err(Error::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_private_key_import() {
    let (teller, session) = unlocked_teller().await;
    let first = teller
        .create_account_from_private_key(&session, import_request(ETH_KEY_ONE, false))
        .await
        .unwrap();
    assert_eq!(first.address, "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

    let err = teller
        .create_account_from_private_key(&session, import_request(ETH_KEY_ONE, false))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AccountAlreadyExists(_)));

    let mut renamed = import_request(ETH_KEY_ONE, true);
    renamed.name = "Replaced".to_string();
    let replaced = teller
        .create_account_from_private_key(&session, renamed)
        .await
        .unwrap();
    assert_eq!(replaced.id, first.id);
    assert_eq!(replaced.name, "Replaced");
    assert_eq!(teller.list_accounts(&session).unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_private_key_rejected() {
    let (teller, session) = unlocked_teller().await;
    let err = teller
        .create_account_from_private_key(&session, import_request("zz", false))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPrivateKey(_)));
    assert!(teller.list_accounts(&session).unwrap().is_empty());
}

#[tokio::test]
async fn test_pocket_private_key_end_to_end() {
    let teller = VaultTeller::new(
        Arc::new(MemoryVaultStore::new()),
        Arc::new(MemorySessionStore::new()),
        Arc::new(PassphraseEncryption::light()),
        factory(),
    );
    teller.initialize_vault(PASSPHRASE).await.unwrap();
    let session = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();

    let account = teller
        .create_account(
            session.id(),
            CreateAccountRequest::new(SupportedProtocol::Pocket, "Pocket"),
        )
        .await
        .unwrap();

    let private_key = teller
        .get_account_private_key(session.id(), &account.id, PASSPHRASE)
        .unwrap();
    assert_eq!(private_key.len(), 128);
    assert!(private_key.chars().all(|c| c.is_ascii_hexdigit()));

    let public_key = hex::decode(&private_key[64..]).unwrap();
    assert_eq!(hex::encode(&public_key), account.public_key);
    let expected = hex::encode(&Sha256::digest(&public_key)[..20]);
    assert_eq!(account.address.len(), 40);
    assert_eq!(account.address, expected);
}

#[tokio::test]
async fn test_private_key_passphrase_errors_are_distinct() {
    let (teller, session) = unlocked_teller().await;

    let plain = teller
        .create_account(&session, CreateAccountRequest::new(SupportedProtocol::Ethereum, "Plain"))
        .await
        .unwrap();
    let err = teller
        .get_account_private_key(&session, &plain.id, "wrong")
        .unwrap_err();
    assert!(matches!(err, Error::VaultRestoreFailed(_)));

    let secure = teller
        .create_account(
            &session,
            CreateAccountRequest::new(SupportedProtocol::Ethereum, "Secure").secured_with("acct-pw"),
        )
        .await
        .unwrap();
    assert!(secure.is_secure);

    let err = teller
        .get_account_private_key(&session, &secure.id, PASSPHRASE)
        .unwrap_err();
    assert!(matches!(err, Error::PrivateKeyRestoreFailed(_)));

    let key = teller
        .get_account_private_key(&session, &secure.id, "acct-pw")
        .unwrap();
    assert_eq!(key.len(), 64);
}

#[tokio::test]
async fn test_update_account_name_persists() {
    let (teller, session) = unlocked_teller().await;
    let account = teller
        .create_account(&session, CreateAccountRequest::new(SupportedProtocol::Pocket, "Old"))
        .await
        .unwrap();

    let renamed = teller
        .update_account_name(&session, &account.id, "New")
        .await
        .unwrap();
    assert_eq!(renamed.name, "New");

    teller.lock_vault();
    let session = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    let accounts = teller.list_accounts(session.id()).unwrap();
    assert_eq!(accounts[0].name, "New");
}

#[tokio::test]
async fn test_export_and_import_vault() {
    let (source, session) = unlocked_teller().await;
    source
        .create_account(&session, CreateAccountRequest::new(SupportedProtocol::Cosmos, "Carry"))
        .await
        .unwrap();

    assert!(matches!(
        source.export_vault(&session, "wrong"),
        Err(Error::VaultRestoreFailed(_))
    ));
    let exported = source.export_vault(&session, PASSPHRASE).unwrap();

    let target = teller();
    assert!(matches!(
        target.import_vault(&exported, "wrong", false).await,
        Err(Error::VaultRestoreFailed(_))
    ));
    assert!(!target.is_initialized().unwrap());

    target.import_vault(&exported, PASSPHRASE, false).await.unwrap();
    assert!(!target.is_unlocked());
    let session = target
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    let accounts = target.list_accounts(session.id()).unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "Carry");

    assert!(matches!(
        target.import_vault(&exported, PASSPHRASE, false).await,
        Err(Error::VaultAlreadyInitialized(_))
    ));
    target.import_vault(&exported, PASSPHRASE, true).await.unwrap();
    assert!(!target.is_unlocked());
}

#[tokio::test]
async fn test_sqlite_backed_teller_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teller.db");
    let config = TellerConfig::from_json(
        r#"{"encryption": {"memory_kib": 1024, "iterations": 1, "parallelism": 1}}"#,
    )
    .unwrap();

    let address = {
        let db = Arc::new(Database::open(&path).unwrap());
        let teller = VaultTeller::builder()
            .config(config.clone())
            .storage(db)
            .protocols(factory())
            .build()
            .unwrap();
        teller.initialize_vault(PASSPHRASE).await.unwrap();
        let session = teller
            .unlock_vault(PASSPHRASE, UnlockOptions::default())
            .await
            .unwrap();
        teller
            .create_account(
                session.id(),
                CreateAccountRequest::new(SupportedProtocol::Ethereum, "Durable"),
            )
            .await
            .unwrap()
            .address
    };

    let db = Arc::new(Database::open(&path).unwrap());
    let teller = VaultTeller::builder()
        .config(config)
        .storage(db)
        .protocols(factory())
        .build()
        .unwrap();
    assert!(teller.is_initialized().unwrap());
    let session = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    let accounts = teller.list_accounts(session.id()).unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].address, address);
    assert_eq!(teller.list_sessions(session.id()).unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_creates_are_all_persisted() {
    let (teller, session) = unlocked_teller().await;
    let teller = Arc::new(teller);

    let mut handles = Vec::new();
    for i in 0..8 {
        let teller = teller.clone();
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            teller
                .create_account(
                    &session,
                    CreateAccountRequest::new(SupportedProtocol::Ethereum, format!("acct {}", i)),
                )
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    teller.lock_vault();
    let session = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    assert_eq!(teller.list_accounts(session.id()).unwrap().len(), 8);
}
