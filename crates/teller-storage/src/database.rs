//! SQLite-backed vault and session stores

use crate::{migrations, Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use teller_core::{EncryptedVault, Session, SessionStore, VaultStore};

/// Database connection wrapper.
///
/// The vault blob is already ciphertext; session rows hold only
/// secret-free projections, so the file itself is not encrypted.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_migrations(&conn)?;

        tracing::debug!("Opened teller database at {}", path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<i32> {
        migrations::get_schema_version(&self.conn.lock())
    }

    fn load_vault(&self) -> Result<Option<EncryptedVault>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT ciphertext, created_at, updated_at FROM vault WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(ciphertext, created_at, updated_at)| {
            Ok(EncryptedVault {
                ciphertext,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
            })
        })
        .transpose()
    }

    fn store_vault(&self, vault: &EncryptedVault) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO vault (id, ciphertext, created_at, updated_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                ciphertext = excluded.ciphertext,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            params![
                vault.ciphertext,
                vault.created_at.to_rfc3339(),
                vault.updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn load_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT payload FROM sessions ORDER BY created_at, id")?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Error::from))
            .collect()
    }

    fn store_session(&self, session: &Session) -> Result<()> {
        let payload = serde_json::to_string(session)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO sessions (id, payload, created_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id(),
                payload,
                session.created_at().to_rfc3339(),
                session.last_activity_at().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn load_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM sessions WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(Error::from))
            .transpose()
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("Invalid timestamp {:?}: {}", value, e)))
}

impl VaultStore for Database {
    fn get(&self) -> teller_core::Result<Option<EncryptedVault>> {
        Ok(self.load_vault()?)
    }

    fn save(&self, vault: &EncryptedVault) -> teller_core::Result<()> {
        Ok(self.store_vault(vault)?)
    }
}

impl SessionStore for Database {
    fn list(&self) -> teller_core::Result<Vec<Session>> {
        Ok(self.load_sessions()?)
    }

    fn save(&self, session: &Session) -> teller_core::Result<()> {
        Ok(self.store_session(session)?)
    }

    fn get_by_id(&self, id: &str) -> teller_core::Result<Option<Session>> {
        Ok(self.load_session(id)?)
    }
}
