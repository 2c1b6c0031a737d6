//! BIP-39 mnemonic handling
//!
//! Recovery phrases are English BIP-39 mnemonics. Seeds are derived with the
//! standard PBKDF2 stretch and an optional passphrase ("25th word").

use crate::{Error, Result};
use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::Zeroizing;

/// Word counts accepted by [`generate_mnemonic`]
pub const SUPPORTED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Generate a fresh English mnemonic with `word_count` words
pub fn generate_mnemonic(word_count: usize) -> Result<Zeroizing<String>> {
    if !SUPPORTED_WORD_COUNTS.contains(&word_count) {
        return Err(Error::InvalidArgument(format!(
            "unsupported mnemonic length: {} words",
            word_count
        )));
    }

    // 12 words = 128 bits, each additional 3 words = 32 bits
    let entropy_size = word_count / 3 * 4;
    let mut entropy = Zeroizing::new(vec![0u8; entropy_size]);
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Normalize whitespace and case so equal phrases compare equal
pub fn normalize_mnemonic(phrase: &str) -> Zeroizing<String> {
    Zeroizing::new(
        phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Validate wordlist membership and checksum
pub fn validate_mnemonic(phrase: &str) -> Result<()> {
    parse_mnemonic(phrase).map(|_| ())
}

/// BIP-39 seed for a phrase and optional passphrase
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Zeroizing<[u8; 64]>> {
    let mnemonic = parse_mnemonic(phrase)?;
    Ok(Zeroizing::new(mnemonic.to_seed_normalized(passphrase)))
}

fn parse_mnemonic(phrase: &str) -> Result<Mnemonic> {
    let normalized = normalize_mnemonic(phrase);
    if normalized.is_empty() {
        return Err(Error::InvalidMnemonic("empty recovery phrase".to_string()));
    }
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))
}
