// src/error.rs
//! Error taxonomy for the SmartCert service.
//!
//! Business-rule failures are modelled explicitly so handlers can map them
//! to the right HTTP status without inspecting strings:
//! - `Validation` — bad client input, never retried
//! - `Conflict` — identifier collision at write time, retried once by the
//!   issuance service before escalating
//! - `NotFound` — lookup miss on an issuer-scoped operation
//! - `Unauthorized` — missing or invalid session
//! - `Storage` — the persistence layer failed for non-business reasons
//! - `Internal` — invariant breakage (e.g. a second identifier collision)

use thiserror::Error;

/// Result alias used throughout the services and storage layers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// All failure modes the core services can report.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed required input; reported to the caller as a
    /// 400-class error.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A unique constraint (verification hash or certificate code) was hit
    /// at write time.
    #[error("identifier conflict: {0}")]
    Conflict(String),

    /// The requested record does not exist (or belongs to another issuer).
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not authenticated or the session token is invalid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The underlying database rejected the operation for reasons unrelated
    /// to business rules.
    #[error("storage error: {0}")]
    Storage(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for ServiceError {
    /// Maps SQLite errors onto the taxonomy. Unique-constraint violations
    /// become `Conflict` so the issuance service can apply its single
    /// retry; everything else is an opaque `Storage` failure.
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ServiceError::Conflict(err.to_string())
            }
            _ => ServiceError::Storage(err.to_string()),
        }
    }
}
