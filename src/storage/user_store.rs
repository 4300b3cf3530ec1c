// src/storage/user_store.rs
//! Issuer account storage.
//!
//! Backs login (lookup by email), verification payload enrichment (issuer
//! display name and university) and the profile endpoints. Emails are
//! unique at the storage layer.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rusqlite::{params, OptionalExtension, Row};

use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{ProfileUpdate, User};
use crate::storage::SharedConnection;

/// Store for issuer accounts.
#[derive(Clone)]
pub struct UserStore {
    conn: SharedConnection,
}

impl UserStore {
    pub fn new(conn: SharedConnection) -> Self {
        UserStore { conn }
    }

    /// Creates a new issuer account. The password must already be hashed.
    ///
    /// # Errors
    /// `Conflict` if the email is already registered.
    pub fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        university: Option<&str>,
    ) -> ServiceResult<User> {
        let mut id_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut id_bytes);
        let id = hex::encode(id_bytes);
        let created_at = Utc::now();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, university, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, name, email, password_hash, university, created_at.to_rfc3339()],
        )?;

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            university: university.map(str::to_string),
            created_at,
        })
    }

    /// Looks up an account by login email.
    pub fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, email, password_hash, university, created_at
             FROM users WHERE email = ?1",
            params![email],
            row_to_user,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Looks up an account by id.
    pub fn find_by_id(&self, id: &str) -> ServiceResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, email, password_hash, university, created_at
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Updates an issuer's profile fields.
    ///
    /// # Errors
    /// - `Conflict` if the new email belongs to another account
    /// - `NotFound` if the account does not exist
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> ServiceResult<User> {
        let conn = self.conn.lock().unwrap();

        let taken: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1 AND id != ?2",
                params![update.email, id],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(ServiceError::Conflict("Email already in use".into()));
        }

        let changed = conn.execute(
            "UPDATE users SET name = ?1, email = ?2, university = ?3 WHERE id = ?4",
            params![update.name, update.email, update.university, id],
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("user {}", id)));
        }

        conn.query_row(
            "SELECT id, name, email, password_hash, university, created_at
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .map_err(Into::into)
    }
}

/// Maps a `users` row onto the model.
fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        university: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

/// Parses an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;

    fn store() -> UserStore {
        UserStore::new(storage::open_in_memory().unwrap())
    }

    #[test]
    fn create_and_find_by_email() {
        let store = store();
        let user = store
            .create("Admin User", "admin@unijos.edu", "hash", Some("University of Jos"))
            .unwrap();
        assert_eq!(user.id.len(), 32);

        let found = store.find_by_email("admin@unijos.edu").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.university.as_deref(), Some("University of Jos"));
    }

    #[test]
    fn duplicate_email_conflicts() {
        let store = store();
        store.create("A", "admin@unijos.edu", "h", None).unwrap();
        let err = store.create("B", "admin@unijos.edu", "h", None).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn update_profile_rejects_taken_email() {
        let store = store();
        store.create("A", "a@unijos.edu", "h", None).unwrap();
        let b = store.create("B", "b@unijos.edu", "h", None).unwrap();

        let err = store
            .update_profile(
                &b.id,
                &ProfileUpdate {
                    name: "B".into(),
                    email: "a@unijos.edu".into(),
                    university: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn update_profile_changes_fields() {
        let store = store();
        let user = store.create("A", "a@unijos.edu", "h", None).unwrap();
        let updated = store
            .update_profile(
                &user.id,
                &ProfileUpdate {
                    name: "Dr. A".into(),
                    email: "a@unijos.edu".into(),
                    university: Some("University of Jos".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Dr. A");
        assert_eq!(updated.university.as_deref(), Some("University of Jos"));
    }
}
