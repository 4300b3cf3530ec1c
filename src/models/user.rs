// src/models/user.rs
//! Issuer account data model.
//!
//! An issuer is a university staff account that authenticates against the
//! API and owns the certificates it creates. Ownership drives the listing
//! and revocation scoping; the issuer's display name and university appear
//! in public verification payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A staff account that can issue certificates.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    /// Opaque identifier assigned by the store at creation
    pub id: String,

    /// Display name, shown as the issuer in verification results
    pub name: String,

    /// Login email, unique across all accounts
    pub email: String,

    /// PBKDF2-HMAC-SHA256 password hash, encoded as `salt$iterations$hash`
    /// (all hex except the iteration count). Never serialized to clients.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Institution the account issues on behalf of
    pub university: Option<String>,

    /// Record-creation timestamp, immutable
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when updating an issuer profile.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub university: Option<String>,
}
