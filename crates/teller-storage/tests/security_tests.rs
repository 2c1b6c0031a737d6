//! Security tests for passphrase encryption
//!
//! Tests cover:
//! - Argon2id KDF determinism and salt sensitivity
//! - Round trips under both AEAD algorithms
//! - Wrong passphrase and tampered blobs
//! - The EncryptionService string contract

use proptest::prelude::*;
use teller_core::EncryptionService;
use teller_storage::security::{
    derive_key_bytes, generate_salt, EncryptionAlgorithm, KdfParams, MasterKey,
    PassphraseEncryption,
};
use teller_storage::Error;

// =============================================================================
// KDF
// =============================================================================

#[test]
fn test_kdf_determinism() {
    let passphrase = "MySecurePassphrase!@#$%^";
    let salt = [
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10,
    ];

    let key1 = derive_key_bytes(passphrase, &salt, KdfParams::light()).unwrap();
    let key2 = derive_key_bytes(passphrase, &salt, KdfParams::light()).unwrap();

    assert_eq!(*key1, *key2);
    assert!(key1.iter().any(|&b| b != 0));
}

#[test]
fn test_kdf_different_salt_produces_different_key() {
    let salt1 = generate_salt();
    let salt2 = generate_salt();
    assert_ne!(salt1, salt2);

    let key1 = derive_key_bytes("SamePassphrase", &salt1, KdfParams::light()).unwrap();
    let key2 = derive_key_bytes("SamePassphrase", &salt2, KdfParams::light()).unwrap();
    assert_ne!(*key1, *key2);
}

#[test]
fn test_kdf_different_passphrase_produces_different_key() {
    let salt = generate_salt();
    let key1 = derive_key_bytes("one", &salt, KdfParams::light()).unwrap();
    let key2 = derive_key_bytes("two", &salt, KdfParams::light()).unwrap();
    assert_ne!(*key1, *key2);
}

// =============================================================================
// Master key
// =============================================================================

#[test]
fn test_master_key_roundtrip_both_algorithms() {
    let salt = generate_salt();
    let nonce = [7u8; 12];

    for algorithm in [EncryptionAlgorithm::AesGcm, EncryptionAlgorithm::ChaCha20Poly1305] {
        let key = MasterKey::derive("pw", &salt, KdfParams::light(), algorithm).unwrap();
        let ciphertext = key.encrypt(&nonce, b"vault contents").unwrap();
        assert_ne!(&ciphertext[..], b"vault contents");

        let plaintext = key.decrypt(&nonce, &ciphertext).unwrap();
        assert_eq!(&plaintext[..], b"vault contents");
    }
}

#[test]
fn test_master_key_wrong_nonce_fails() {
    let salt = generate_salt();
    let key = MasterKey::derive(
        "pw",
        &salt,
        KdfParams::light(),
        EncryptionAlgorithm::ChaCha20Poly1305,
    )
    .unwrap();
    let ciphertext = key.encrypt(&[1u8; 12], b"data").unwrap();
    assert!(matches!(
        key.decrypt(&[2u8; 12], &ciphertext),
        Err(Error::Decryption(_))
    ));
}

// =============================================================================
// Blob sealing
// =============================================================================

#[test]
fn test_aes_blob_roundtrip() {
    let enc = PassphraseEncryption::new(EncryptionAlgorithm::AesGcm, KdfParams::light());
    let blob = enc.seal("correct horse", b"{\"accounts\":[]}").unwrap();
    let opened = enc.open("correct horse", &blob).unwrap();
    assert_eq!(&opened[..], b"{\"accounts\":[]}");
}

#[test]
fn test_blob_opens_with_other_configured_algorithm() {
    let sealer = PassphraseEncryption::new(EncryptionAlgorithm::AesGcm, KdfParams::light());
    let opener = PassphraseEncryption::light();
    let blob = sealer.seal("pw", b"portable").unwrap();
    assert_eq!(&opener.open("pw", &blob).unwrap()[..], b"portable");
}

#[test]
fn test_wrong_passphrase_fails() {
    let enc = PassphraseEncryption::light();
    let blob = enc.seal("right", b"secret").unwrap();
    assert!(matches!(enc.open("wrong", &blob), Err(Error::Decryption(_))));
}

#[test]
fn test_tampered_blob_fails() {
    let enc = PassphraseEncryption::light();
    let mut blob = enc.seal("pw", b"secret").unwrap();
    let last = blob.len() - 1;
    blob[last] ^= 0x01;
    assert!(matches!(enc.open("pw", &blob), Err(Error::Decryption(_))));
}

#[test]
fn test_truncated_blob_fails() {
    let enc = PassphraseEncryption::light();
    let blob = enc.seal("pw", b"secret").unwrap();
    assert!(matches!(enc.open("pw", &blob[..20]), Err(Error::Decryption(_))));
}

#[test]
fn test_fresh_salt_and_nonce_per_seal() {
    let enc = PassphraseEncryption::light();
    let a = enc.seal("pw", b"same").unwrap();
    let b = enc.seal("pw", b"same").unwrap();
    assert_ne!(a, b);
}

// =============================================================================
// EncryptionService contract
// =============================================================================

#[test]
fn test_service_string_roundtrip() {
    let enc = PassphraseEncryption::light();
    let ciphertext = enc.encrypt("pw", b"hello").unwrap();
    assert!(!ciphertext.contains("hello"));
    assert_eq!(&enc.decrypt("pw", &ciphertext).unwrap()[..], b"hello");
}

#[test]
fn test_service_maps_failures_to_decryption() {
    let enc = PassphraseEncryption::light();
    let ciphertext = enc.encrypt("pw", b"hello").unwrap();

    assert!(matches!(
        enc.decrypt("nope", &ciphertext),
        Err(teller_core::Error::Decryption(_))
    ));
    assert!(matches!(
        enc.decrypt("pw", "not base64!!"),
        Err(teller_core::Error::Decryption(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: any plaintext survives seal/open under its passphrase
    #[test]
    fn prop_seal_open_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        passphrase in "[ -~]{1,24}"
    ) {
        let enc = PassphraseEncryption::light();
        let blob = enc.seal(&passphrase, &plaintext).unwrap();
        let opened = enc.open(&passphrase, &blob).unwrap();
        prop_assert_eq!(&opened[..], &plaintext[..]);
    }
}
