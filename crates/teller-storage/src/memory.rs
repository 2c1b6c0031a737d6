//! In-memory stores.
//!
//! Contents live only for the lifetime of the process.

use parking_lot::RwLock;
use std::collections::HashMap;
use teller_core::{EncryptedVault, Result, Session, SessionStore, VaultStore};

/// Vault blob held in memory
#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    vault: RwLock<Option<EncryptedVault>>,
}

impl MemoryVaultStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStore for MemoryVaultStore {
    fn get(&self) -> Result<Option<EncryptedVault>> {
        Ok(self.vault.read().clone())
    }

    fn save(&self, vault: &EncryptedVault) -> Result<()> {
        *self.vault.write() = Some(vault.clone());
        Ok(())
    }
}

/// Sessions held in memory, listed in insertion order
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<(Vec<String>, HashMap<String, Session>)>,
}

impl MemorySessionStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn list(&self) -> Result<Vec<Session>> {
        let guard = self.sessions.read();
        let (order, by_id) = &*guard;
        Ok(order.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut guard = self.sessions.write();
        let (order, by_id) = &mut *guard;
        if by_id
            .insert(session.id().to_string(), session.clone())
            .is_none()
        {
            order.push(session.id().to_string());
        }
        Ok(())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().1.get(id).cloned())
    }
}
