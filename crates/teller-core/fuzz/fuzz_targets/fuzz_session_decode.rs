//! Fuzz test for persisted session records
//!
//! Session stores hand back whatever JSON they hold; decoding and checking
//! a hostile record must not panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use teller_core::{PermissionAction, PermissionResource, Session};

fuzz_target!(|data: &[u8]| {
    if let Ok(session) = serde_json::from_slice::<Session>(data) {
        let _ = session.is_valid();
        let _ = session.is_allowed(
            PermissionResource::Account,
            PermissionAction::Read,
            &["fuzz".to_string()],
        );
    }
});
