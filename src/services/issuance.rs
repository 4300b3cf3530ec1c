// src/services/issuance.rs
//! Certificate issuance service.
//!
//! Orchestrates creation of new certificate records on behalf of an
//! authenticated issuer: validates input, mints the public identifiers,
//! and writes the record through the store. A uniqueness conflict at write
//! time is retried exactly once with freshly generated identifiers (the
//! hash's timestamp salt makes regeneration effective); a second conflict
//! signals a broken random source and is escalated as an internal error.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::models::certificate::{Certificate, CertificateStatus, NewCertificate};
use crate::storage::certificate_store::CertificateStore;
use crate::utils::ident::{generate_certificate_code, generate_verification_hash, HashInput};

/// Default presentation template when the request names none.
const DEFAULT_TEMPLATE: &str = "classic";

/// Validated-at-the-edge issuance input. Dates arrive as strings and are
/// parsed here so the transport layer stays shape-only.
#[derive(Debug, Clone)]
pub struct IssueInput {
    pub recipient_name: String,
    pub email: String,
    pub course: String,
    pub matric_no: String,
    pub issue_date: String,
    pub expiry_date: Option<String>,
    pub template: Option<String>,
    pub signatory_left: Option<String>,
    pub signatory_right: Option<String>,
}

/// Source of short certificate codes.
type CodeSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Source of verification hashes.
type HashSource = Arc<dyn Fn(&HashInput<'_>) -> String + Send + Sync>;

/// Service for issuing and revoking certificates.
///
/// The identifier sources default to [`crate::utils::ident`] and are held
/// as fields so tests can force collisions deterministically.
#[derive(Clone)]
pub struct IssuanceService {
    store: CertificateStore,
    code_source: CodeSource,
    hash_source: HashSource,
}

impl IssuanceService {
    pub fn new(store: CertificateStore) -> Self {
        IssuanceService {
            store,
            code_source: Arc::new(generate_certificate_code),
            hash_source: Arc::new(|input| generate_verification_hash(input)),
        }
    }

    /// Builds a service with injected identifier sources.
    #[cfg(test)]
    fn with_identifier_sources(
        store: CertificateStore,
        code_source: CodeSource,
        hash_source: HashSource,
    ) -> Self {
        IssuanceService {
            store,
            code_source,
            hash_source,
        }
    }

    /// Issues a new certificate for the given issuer.
    ///
    /// # Errors
    /// - `Validation` if a required field is missing/empty or a date is
    ///   malformed
    /// - `Internal` if identifier generation collides twice in a row
    /// - `Storage` if the database fails
    pub fn issue(&self, user_id: &str, input: &IssueInput) -> ServiceResult<Certificate> {
        for (field, value) in [
            ("recipientName", &input.recipient_name),
            ("email", &input.email),
            ("course", &input.course),
            ("matricNo", &input.matric_no),
            ("issueDate", &input.issue_date),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::Validation(format!(
                    "missing required field: {}",
                    field
                )));
            }
        }

        let issue_date = parse_date("issueDate", &input.issue_date)?;
        let expiry_date = match input.expiry_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(parse_date("expiryDate", raw)?),
            None => None,
        };

        let mut attempts = 0;
        loop {
            let new = NewCertificate {
                certificate_code: (self.code_source)(),
                hash: (self.hash_source)(&HashInput {
                    recipient_name: &input.recipient_name,
                    email: &input.email,
                    course: &input.course,
                    matric_no: &input.matric_no,
                    issue_date: &input.issue_date,
                    user_id,
                }),
                recipient_name: input.recipient_name.clone(),
                email: input.email.clone(),
                course: input.course.clone(),
                matric_no: input.matric_no.clone(),
                issue_date,
                expiry_date,
                status: CertificateStatus::Issued,
                template: input
                    .template
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
                signatory_left: input.signatory_left.clone(),
                signatory_right: input.signatory_right.clone(),
                user_id: user_id.to_string(),
                issued_at: Utc::now(),
            };

            match self.store.create(&new) {
                Ok(certificate) => {
                    log::info!(
                        "issued certificate {} for {}",
                        certificate.certificate_code,
                        certificate.recipient_name
                    );
                    return Ok(certificate);
                }
                Err(ServiceError::Conflict(reason)) if attempts == 0 => {
                    // Regenerating refreshes the hash's timestamp salt, so
                    // one retry resolves any realistic collision.
                    log::warn!("identifier collision on issue, retrying: {}", reason);
                    attempts += 1;
                }
                Err(ServiceError::Conflict(reason)) => {
                    return Err(ServiceError::Internal(format!(
                        "repeated identifier collision: {}",
                        reason
                    )));
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Revokes one of the issuer's own certificates.
    ///
    /// Only `ISSUED` certificates can be revoked; another issuer's
    /// certificate id behaves like a nonexistent one.
    pub fn revoke(&self, user_id: &str, certificate_id: i64) -> ServiceResult<Certificate> {
        let certificate = self
            .store
            .find_by_id(certificate_id)?
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("certificate {}", certificate_id)))?;

        if certificate.status != CertificateStatus::Issued {
            return Err(ServiceError::Validation(format!(
                "certificate is {} and cannot be revoked",
                certificate.status
            )));
        }

        self.store
            .set_status(certificate_id, user_id, CertificateStatus::Revoked)
    }
}

/// Parses a date field, accepting RFC 3339 timestamps or plain
/// `YYYY-MM-DD` calendar dates (interpreted as midnight UTC).
fn parse_date(field: &str, raw: &str) -> ServiceResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDate>()
        .map(|date| Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()))
        .map_err(|_| ServiceError::Validation(format!("invalid date in {}: {}", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{self, user_store::UserStore};

    fn stores() -> (CertificateStore, String) {
        let conn = storage::open_in_memory().unwrap();
        let user = UserStore::new(conn.clone())
            .create("Admin User", "admin@unijos.edu", "h", None)
            .unwrap();
        (CertificateStore::new(conn), user.id)
    }

    fn service() -> (IssuanceService, String) {
        let (store, user_id) = stores();
        (IssuanceService::new(store), user_id)
    }

    fn sample_input() -> IssueInput {
        IssueInput {
            recipient_name: "Aisha Bello".into(),
            email: "csc045@unijos.edu".into(),
            course: "Computer Science".into(),
            matric_no: "CSC/2017/045".into(),
            issue_date: "2024-06-01".into(),
            expiry_date: None,
            template: None,
            signatory_left: None,
            signatory_right: None,
        }
    }

    #[test]
    fn issue_mints_well_formed_identifiers() {
        let (service, user_id) = service();
        let cert = service.issue(&user_id, &sample_input()).unwrap();

        assert_eq!(cert.certificate_code.len(), 8);
        assert!(cert
            .certificate_code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        assert_eq!(cert.hash.len(), 64);
        assert_eq!(cert.status, CertificateStatus::Issued);
        assert_eq!(cert.template, "classic");
        assert_eq!(cert.issue_date.format("%Y-%m-%d").to_string(), "2024-06-01");
    }

    #[test]
    fn identical_inputs_yield_distinct_hashes() {
        let (service, user_id) = service();
        let first = service.issue(&user_id, &sample_input()).unwrap();
        let second = service.issue(&user_id, &sample_input()).unwrap();
        assert_ne!(first.hash, second.hash);
        assert_ne!(first.certificate_code, second.certificate_code);
    }

    #[test]
    fn missing_required_field_fails_validation() {
        let (service, user_id) = service();
        let mut input = sample_input();
        input.course = "  ".into();
        assert!(matches!(
            service.issue(&user_id, &input),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn malformed_date_fails_validation() {
        let (service, user_id) = service();
        let mut input = sample_input();
        input.issue_date = "June 1st 2024".into();
        assert!(matches!(
            service.issue(&user_id, &input),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn expiry_date_is_recorded() {
        let (service, user_id) = service();
        let mut input = sample_input();
        input.expiry_date = Some("2030-01-01".into());
        let cert = service.issue(&user_id, &input).unwrap();
        assert!(cert.expiry_date.is_some());
    }

    #[test]
    fn hash_collision_is_retried_with_fresh_identifiers() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (store, user_id) = stores();
        // Seed a certificate whose identifiers the first attempt will reuse.
        let seeded = IssuanceService::new(store.clone())
            .issue(&user_id, &sample_input())
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let hash_source: HashSource = {
            let calls = calls.clone();
            let colliding = seeded.hash.clone();
            Arc::new(move |input| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    colliding.clone()
                } else {
                    generate_verification_hash(input)
                }
            })
        };
        let service = IssuanceService::with_identifier_sources(
            store,
            Arc::new(generate_certificate_code),
            hash_source,
        );

        let cert = service.issue(&user_id, &sample_input()).unwrap();
        assert_ne!(cert.hash, seeded.hash);
        // One colliding write, one successful retry.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn repeated_collision_escalates_to_internal_error() {
        let (store, user_id) = stores();
        let seeded = IssuanceService::new(store.clone())
            .issue(&user_id, &sample_input())
            .unwrap();

        let colliding = seeded.hash.clone();
        let service = IssuanceService::with_identifier_sources(
            store,
            Arc::new(generate_certificate_code),
            Arc::new(move |_| colliding.clone()),
        );

        assert!(matches!(
            service.issue(&user_id, &sample_input()),
            Err(ServiceError::Internal(_))
        ));
    }

    #[test]
    fn revoke_transitions_issued_to_revoked() {
        let (service, user_id) = service();
        let cert = service.issue(&user_id, &sample_input()).unwrap();

        let revoked = service.revoke(&user_id, cert.id).unwrap();
        assert_eq!(revoked.status, CertificateStatus::Revoked);

        // A second revocation is rejected: the certificate is no longer
        // ISSUED.
        assert!(matches!(
            service.revoke(&user_id, cert.id),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn revoke_hides_other_issuers_certificates() {
        let (service, user_id) = service();
        let cert = service.issue(&user_id, &sample_input()).unwrap();
        assert!(matches!(
            service.revoke("someone-else", cert.id),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn parse_date_accepts_rfc3339_and_calendar_dates() {
        assert!(parse_date("issueDate", "2024-06-01").is_ok());
        assert!(parse_date("issueDate", "2024-06-01T12:30:00Z").is_ok());
        assert!(parse_date("issueDate", "tomorrow").is_err());
    }
}
