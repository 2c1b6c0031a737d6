//! Recovery phrases and HD accounts through the teller

use std::sync::Arc;
use teller_core::testing::ReversingEncryption;
use teller_core::Error;
use teller_net::{RpcClient, TransportConfig};
use teller_protocols::ProtocolServiceFactory;
use teller_storage::{MemorySessionStore, MemoryVaultStore};
use vault_teller::{
    AccountKind, AccountReference, AddHdWalletAccountRequest, ImportRecoveryPhraseRequest,
    SupportedProtocol, UnlockOptions, VaultTeller,
};
use zeroize::Zeroizing;

const PASSPHRASE: &str = "vault-pass";
const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

async fn unlocked() -> (VaultTeller, String) {
    let rpc = RpcClient::new(&TransportConfig::default()).unwrap();
    let teller = VaultTeller::new(
        Arc::new(MemoryVaultStore::new()),
        Arc::new(MemorySessionStore::new()),
        Arc::new(ReversingEncryption),
        ProtocolServiceFactory::with_defaults(Arc::new(rpc)),
    );
    teller.initialize_vault(PASSPHRASE).await.unwrap();
    let session = teller
        .unlock_vault(PASSPHRASE, UnlockOptions::default())
        .await
        .unwrap();
    (teller, session.id().to_string())
}

fn phrase_request(name: &str, phrase: &str, passphrase: Option<&str>) -> ImportRecoveryPhraseRequest {
    ImportRecoveryPhraseRequest {
        name: name.to_string(),
        phrase: Zeroizing::new(phrase.to_string()),
        passphrase: passphrase.map(|p| Zeroizing::new(p.to_string())),
    }
}

fn hd_request(phrase_id: &str, protocol: SupportedProtocol, count: u32) -> AddHdWalletAccountRequest {
    AddHdWalletAccountRequest {
        recovery_phrase_id: phrase_id.to_string(),
        protocol,
        count,
    }
}

fn index_of(account: &AccountReference) -> u32 {
    match account.kind {
        AccountKind::HdChild { hdw_index, .. } => hdw_index,
        ref other => panic!("not an HD child: {:?}", other),
    }
}

#[tokio::test]
async fn test_import_recovery_phrase_stores_reference_only() {
    let (teller, session) = unlocked().await;
    let reference = teller
        .import_recovery_phrase(&session, phrase_request("Main", ABANDON, None))
        .await
        .unwrap();
    assert_eq!(reference.name, "Main");
    assert_eq!(reference.word_count, 12);
    assert!(!reference.has_passphrase);

    assert!(teller.list_accounts(&session).unwrap().is_empty());
    let listed = teller.list_recovery_phrases(&session).unwrap();
    assert_eq!(listed, vec![reference.clone()]);

    let phrase = teller
        .get_recovery_phrase(&session, &reference.id, PASSPHRASE)
        .unwrap();
    assert_eq!(phrase.phrase(), ABANDON);
    assert!(matches!(
        teller.get_recovery_phrase(&session, &reference.id, "wrong"),
        Err(Error::VaultRestoreFailed(_))
    ));
}

#[tokio::test]
async fn test_duplicate_and_invalid_phrases() {
    let (teller, session) = unlocked().await;
    teller
        .import_recovery_phrase(&session, phrase_request("Main", ABANDON, None))
        .await
        .unwrap();

    assert!(matches!(
        teller
            .import_recovery_phrase(&session, phrase_request("Again", ABANDON, None))
            .await,
        Err(Error::RecoveryPhraseAlreadyExists(_))
    ));

    // Same words, different passphrase: a different wallet
    teller
        .import_recovery_phrase(&session, phrase_request("Hidden", ABANDON, Some("extra")))
        .await
        .unwrap();

    let bad_checksum = ABANDON.replace("about", "abandon");
    assert!(matches!(
        teller
            .import_recovery_phrase(&session, phrase_request("Bad", &bad_checksum, None))
            .await,
        Err(Error::InvalidMnemonic(_))
    ));
    assert_eq!(teller.list_recovery_phrases(&session).unwrap().len(), 2);
}

#[tokio::test]
async fn test_hd_accounts_match_known_vector() {
    let (teller, session) = unlocked().await;
    let phrase = teller
        .import_recovery_phrase(&session, phrase_request("Main", ABANDON, None))
        .await
        .unwrap();

    let children = teller
        .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Ethereum, 1))
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert_eq!(children[0].name, "Main 1");
    assert_eq!(index_of(&children[0]), 0);

    let accounts = teller.list_accounts(&session).unwrap();
    assert_eq!(accounts.len(), 2);
    let seed = accounts
        .iter()
        .find(|a| matches!(a.kind, AccountKind::HdSeed { .. }))
        .unwrap();
    match &seed.kind {
        AccountKind::HdSeed { seed_id } => assert_eq!(seed_id, &phrase.id),
        other => panic!("unexpected kind {:?}", other),
    }
    match &children[0].kind {
        AccountKind::HdChild { parent_id, .. } => assert_eq!(parent_id, &seed.id),
        other => panic!("unexpected kind {:?}", other),
    }
}

#[tokio::test]
async fn test_hd_derivation_is_deterministic_across_vaults() {
    let mut addresses = Vec::new();
    for _ in 0..2 {
        let (teller, session) = unlocked().await;
        let phrase = teller
            .import_recovery_phrase(&session, phrase_request("Main", ABANDON, Some("TREZOR")))
            .await
            .unwrap();
        let mut derived = Vec::new();
        for protocol in SupportedProtocol::ALL {
            let children = teller
                .add_hd_wallet_account(&session, hd_request(&phrase.id, protocol, 2))
                .await
                .unwrap();
            derived.extend(children.into_iter().map(|c| (c.address, c.public_key)));
        }
        addresses.push(derived);
    }
    assert_eq!(addresses[0].len(), 6);
    assert_eq!(addresses[0], addresses[1]);
}

#[tokio::test]
async fn test_add_hd_wallet_account_fills_gaps() {
    let (teller, session) = unlocked().await;
    let phrase = teller
        .import_recovery_phrase(&session, phrase_request("Main", ABANDON, None))
        .await
        .unwrap();

    let first = teller
        .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Pocket, 3))
        .await
        .unwrap();
    let indices: Vec<u32> = first.iter().map(index_of).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    // Children left at {0, 2}
    teller.remove_account(&session, &first[1].id).await.unwrap();

    let refill = teller
        .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Pocket, 1))
        .await
        .unwrap();
    assert_eq!(refill.len(), 1);
    assert_eq!(index_of(&refill[0]), 1);
    assert_eq!(refill[0].address, first[1].address);
    assert_eq!(refill[0].name, "Main 2");

    let next = teller
        .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Pocket, 1))
        .await
        .unwrap();
    assert_eq!(index_of(&next[0]), 3);

    // One seed account per protocol
    let seeds = teller
        .list_accounts(&session)
        .unwrap()
        .into_iter()
        .filter(|a| matches!(a.kind, AccountKind::HdSeed { .. }))
        .count();
    assert_eq!(seeds, 1);
}

#[tokio::test]
async fn test_add_hd_wallet_account_rejects_bad_requests() {
    let (teller, session) = unlocked().await;
    let phrase = teller
        .import_recovery_phrase(&session, phrase_request("Main", ABANDON, None))
        .await
        .unwrap();

    assert!(matches!(
        teller
            .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Cosmos, 0))
            .await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        teller
            .add_hd_wallet_account(&session, hd_request("missing", SupportedProtocol::Cosmos, 1))
            .await,
        Err(Error::RecoveryPhraseNotFound(_))
    ));
    assert!(teller.list_accounts(&session).unwrap().is_empty());
}

#[tokio::test]
async fn test_removing_seed_account_removes_children() {
    let (teller, session) = unlocked().await;
    let phrase = teller
        .import_recovery_phrase(&session, phrase_request("Main", ABANDON, None))
        .await
        .unwrap();
    teller
        .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Ethereum, 2))
        .await
        .unwrap();
    teller
        .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Cosmos, 1))
        .await
        .unwrap();
    assert_eq!(teller.list_accounts(&session).unwrap().len(), 5);

    let eth_seed = teller
        .list_accounts(&session)
        .unwrap()
        .into_iter()
        .find(|a| {
            a.protocol == SupportedProtocol::Ethereum && matches!(a.kind, AccountKind::HdSeed { .. })
        })
        .unwrap();
    teller.remove_account(&session, &eth_seed.id).await.unwrap();

    let remaining = teller.list_accounts(&session).unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining
        .iter()
        .all(|a| a.protocol == SupportedProtocol::Cosmos));
}

#[tokio::test]
async fn test_remove_recovery_phrase_cascades() {
    let (teller, session) = unlocked().await;
    let phrase = teller
        .import_recovery_phrase(&session, phrase_request("Main", ABANDON, None))
        .await
        .unwrap();
    teller
        .add_hd_wallet_account(&session, hd_request(&phrase.id, SupportedProtocol::Pocket, 2))
        .await
        .unwrap();

    let renamed = teller
        .update_recovery_phrase_name(&session, &phrase.id, "Renamed")
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");

    teller
        .remove_recovery_phrase(&session, &phrase.id)
        .await
        .unwrap();
    assert!(teller.list_recovery_phrases(&session).unwrap().is_empty());
    assert!(teller.list_accounts(&session).unwrap().is_empty());

    assert!(matches!(
        teller.remove_recovery_phrase(&session, &phrase.id).await,
        Err(Error::RecoveryPhraseNotFound(_))
    ));
}
