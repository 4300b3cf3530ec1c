// src/models/certificate.rs
//! Certificate data model.
//!
//! The central entity of the system. A certificate carries two public
//! identifiers minted at issuance time:
//! - `certificate_code`: an 8-character alphanumeric code for human sharing
//! - `hash`: a 64-character SHA-256 hex digest that acts as an opaque
//!   bearer token for third-party verification
//!
//! Both carry uniqueness constraints at the storage layer. The hash is
//! immutable once assigned; `status` is the only field the system ever
//! mutates after creation (revocation).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a certificate.
///
/// Certificates are created directly in `Issued`. The only exposed
/// transition is `Issued -> Revoked`; `Pending` and `Verified` exist in the
/// data model for records migrated from other systems. Only `Issued`
/// certificates pass verification.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertificateStatus {
    Pending,
    Issued,
    Verified,
    Revoked,
}

impl CertificateStatus {
    /// Canonical storage/wire spelling of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Pending => "PENDING",
            CertificateStatus::Issued => "ISSUED",
            CertificateStatus::Verified => "VERIFIED",
            CertificateStatus::Revoked => "REVOKED",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(CertificateStatus::Pending),
            "ISSUED" => Ok(CertificateStatus::Issued),
            "VERIFIED" => Ok(CertificateStatus::Verified),
            "REVOKED" => Ok(CertificateStatus::Revoked),
            other => Err(format!("unknown certificate status: {}", other)),
        }
    }
}

/// A persisted certificate record.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Certificate {
    /// Opaque primary key assigned by the store, immutable
    pub id: i64,

    /// Short human-shareable identifier, 8 chars over `[A-Z0-9]`
    pub certificate_code: String,

    /// SHA-256 digest binding the record to its content, lowercase hex.
    /// The sole lookup key for third-party verification.
    pub hash: String,

    /// Name of the certificate recipient
    pub recipient_name: String,

    /// Recipient contact email
    pub email: String,

    /// Course or programme the certificate attests
    pub course: String,

    /// Recipient's matriculation number
    pub matric_no: String,

    /// Date the certificate becomes valid
    pub issue_date: DateTime<Utc>,

    /// Date after which the certificate no longer verifies; `None` means
    /// it never expires
    pub expiry_date: Option<DateTime<Utc>>,

    /// Lifecycle status; only `Issued` passes verification
    pub status: CertificateStatus,

    /// Presentation template name (not part of the trust decision)
    pub template: String,

    /// Left signatory line on the rendered certificate
    pub signatory_left: Option<String>,

    /// Right signatory line on the rendered certificate
    pub signatory_right: Option<String>,

    /// Issuer account that created the record
    pub user_id: String,

    /// Timestamp the issuance service minted the record
    pub issued_at: DateTime<Utc>,

    /// Record-creation timestamp, immutable
    pub created_at: DateTime<Utc>,
}

/// Fields the store needs to insert a new certificate. The identifiers and
/// timestamps are already minted by the issuance service; the store only
/// assigns the primary key.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub certificate_code: String,
    pub hash: String,
    pub recipient_name: String,
    pub email: String,
    pub course: String,
    pub matric_no: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: CertificateStatus,
    pub template: String,
    pub signatory_left: Option<String>,
    pub signatory_right: Option<String>,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
}
