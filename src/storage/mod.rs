// src/storage/mod.rs
//! Durable storage layer backed by SQLite.
//!
//! A single database file holds the `users` and `certificates` tables. Both
//! public certificate identifiers carry UNIQUE constraints, so a collision
//! at write time surfaces as a constraint violation (mapped to
//! `ServiceError::Conflict`) instead of silently overwriting a record.
//!
//! `rusqlite` is synchronous; the connection is shared behind a mutex and
//! every store call is a single short statement, so handlers call the
//! stores directly.

pub mod certificate_store;
pub mod user_store;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::ServiceResult;

/// Shared handle to the open database connection.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Database schema, applied idempotently at startup.
const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        university TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS certificates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        certificate_code TEXT NOT NULL UNIQUE,
        hash TEXT NOT NULL UNIQUE,
        recipient_name TEXT NOT NULL,
        email TEXT NOT NULL,
        course TEXT NOT NULL,
        matric_no TEXT NOT NULL,
        issue_date TEXT NOT NULL,
        expiry_date TEXT,
        status TEXT NOT NULL,
        template TEXT NOT NULL,
        signatory_left TEXT,
        signatory_right TEXT,
        user_id TEXT NOT NULL REFERENCES users(id),
        issued_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_certificates_user ON certificates(user_id);
"#;

/// Opens (or creates) the database at the given path and applies the
/// schema. WAL mode keeps concurrent verification reads cheap while an
/// issuance write is in flight.
pub fn open(path: impl AsRef<Path>) -> ServiceResult<SharedConnection> {
    let conn = Connection::open(path.as_ref())?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(SCHEMA_SQL)?;
    log::info!("database opened at {}", path.as_ref().display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// Opens an in-memory database with the schema applied (used by tests).
pub fn open_in_memory() -> ServiceResult<SharedConnection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(Arc::new(Mutex::new(conn)))
}
