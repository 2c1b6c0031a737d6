//! Database schema migrations

use crate::{Error, Result};
use rusqlite::Connection;

/// Latest schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Run all migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::debug!(
        "Running migrations: current_version={}, target_version={}",
        current_version,
        SCHEMA_VERSION
    );

    if current_version > SCHEMA_VERSION {
        return Err(Error::Migration(format!(
            "database schema {} is newer than supported {}",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Current schema version, 0 for a fresh database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    match result {
        Ok(v) => Ok(v),
        Err(_) => Ok(0),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tracing::debug!("Schema version set to {}", version);
    Ok(())
}

/// v1: single-row encrypted vault
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS vault (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            ciphertext TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| Error::Migration(format!("v1: {}", e)))?;

    set_schema_version(conn, 1)
}

/// v2: sessions
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_activity_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at);
        "#,
    )
    .map_err(|e| Error::Migration(format!("v2: {}", e)))?;

    set_schema_version(conn, 2)
}
