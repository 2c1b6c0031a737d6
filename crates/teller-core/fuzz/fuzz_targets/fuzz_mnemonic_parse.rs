//! Fuzz test for recovery phrase validation
//!
//! Arbitrary text must be rejected with an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use teller_core::{validate_mnemonic, RecoveryPhrase};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_mnemonic(s);
        let _ = RecoveryPhrase::new("fuzz", s, Some(s));
    }
});
