// src/storage/certificate_store.rs
//! Certificate record storage.
//!
//! Three lookup paths: internal id, short certificate code, and
//! verification hash. The hash and code columns carry UNIQUE constraints,
//! so `create` is effectively a compare-and-swap — a blind insert that the
//! database rejects on collision, surfaced to the issuance service as
//! `ServiceError::Conflict` for its single retry.
//!
//! Writes are durable before `create` returns; reads are single atomic
//! statements, so no in-process locking beyond the shared connection mutex
//! is needed.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, ToSql};

use crate::error::{ServiceError, ServiceResult};
use crate::models::certificate::{Certificate, CertificateStatus, NewCertificate};
use crate::storage::user_store::parse_timestamp;
use crate::storage::SharedConnection;

/// Columns selected for every certificate read, in `row_to_certificate`
/// order.
const CERT_COLUMNS: &str = "id, certificate_code, hash, recipient_name, email, course, \
     matric_no, issue_date, expiry_date, status, template, signatory_left, \
     signatory_right, user_id, issued_at, created_at";

/// Optional conjunctive filter for issuer-scoped listings.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Exact status match
    pub status: Option<CertificateStatus>,
    /// Case-insensitive substring over recipient name, email, course and
    /// matriculation number
    pub search: Option<String>,
}

/// Pagination request, 1-based page numbering.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest { page: 1, limit: 10 }
    }
}

/// Issuer fields joined into a verification lookup.
#[derive(Debug, Clone)]
pub struct IssuerInfo {
    pub name: String,
    pub university: Option<String>,
}

/// Per-status certificate counts for one issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub issued: u64,
    pub verified: u64,
    pub revoked: u64,
    pub total: u64,
}

/// Store for certificate records.
#[derive(Clone)]
pub struct CertificateStore {
    conn: SharedConnection,
}

impl CertificateStore {
    pub fn new(conn: SharedConnection) -> Self {
        CertificateStore { conn }
    }

    /// Inserts a new certificate record.
    ///
    /// # Errors
    /// `Conflict` if the verification hash or certificate code collides
    /// with an existing record; the row is not written in that case.
    pub fn create(&self, new: &NewCertificate) -> ServiceResult<Certificate> {
        let created_at = Utc::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO certificates (certificate_code, hash, recipient_name, email, \
             course, matric_no, issue_date, expiry_date, status, template, \
             signatory_left, signatory_right, user_id, issued_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                new.certificate_code,
                new.hash,
                new.recipient_name,
                new.email,
                new.course,
                new.matric_no,
                new.issue_date.to_rfc3339(),
                new.expiry_date.map(|d| d.to_rfc3339()),
                new.status.as_str(),
                new.template,
                new.signatory_left,
                new.signatory_right,
                new.user_id,
                new.issued_at.to_rfc3339(),
                created_at.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Certificate {
            id,
            certificate_code: new.certificate_code.clone(),
            hash: new.hash.clone(),
            recipient_name: new.recipient_name.clone(),
            email: new.email.clone(),
            course: new.course.clone(),
            matric_no: new.matric_no.clone(),
            issue_date: new.issue_date,
            expiry_date: new.expiry_date,
            status: new.status,
            template: new.template.clone(),
            signatory_left: new.signatory_left.clone(),
            signatory_right: new.signatory_right.clone(),
            user_id: new.user_id.clone(),
            issued_at: new.issued_at,
            created_at,
        })
    }

    /// Looks up a certificate by internal id.
    pub fn find_by_id(&self, id: i64) -> ServiceResult<Option<Certificate>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM certificates WHERE id = ?1", CERT_COLUMNS),
            params![id],
            row_to_certificate,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Looks up a certificate by verification hash.
    pub fn find_by_hash(&self, hash: &str) -> ServiceResult<Option<Certificate>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM certificates WHERE hash = ?1", CERT_COLUMNS),
            params![hash],
            row_to_certificate,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Looks up a certificate by short certificate code.
    pub fn find_by_code(&self, code: &str) -> ServiceResult<Option<Certificate>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM certificates WHERE certificate_code = ?1",
                CERT_COLUMNS
            ),
            params![code],
            row_to_certificate,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Resolves a verification candidate to a certificate and its issuer.
    ///
    /// Tries the verification hash first, then falls back to the short
    /// certificate code, so either identifier typed into the public
    /// verification form resolves.
    pub fn find_for_verification(
        &self,
        candidate: &str,
    ) -> ServiceResult<Option<(Certificate, IssuerInfo)>> {
        let conn = self.conn.lock().unwrap();
        let prefixed_columns = CERT_COLUMNS
            .split(", ")
            .map(|col| format!("c.{}", col))
            .collect::<Vec<_>>()
            .join(", ");

        for key in ["hash", "certificate_code"] {
            let sql = format!(
                "SELECT {}, u.name, u.university
                 FROM certificates c JOIN users u ON u.id = c.user_id
                 WHERE c.{} = ?1",
                prefixed_columns, key
            );
            let hit = conn
                .query_row(&sql, params![candidate], |row| {
                    let cert = row_to_certificate(row)?;
                    let issuer = IssuerInfo {
                        name: row.get(16)?,
                        university: row.get(17)?,
                    };
                    Ok((cert, issuer))
                })
                .optional()?;
            if hit.is_some() {
                return Ok(hit);
            }
        }
        Ok(None)
    }

    /// Lists one issuer's certificates, newest first, with an optional
    /// status/search filter and pagination. Returns the page of records
    /// and the total count matching the filter.
    pub fn list_by_issuer(
        &self,
        user_id: &str,
        filter: &ListFilter,
        page: PageRequest,
    ) -> ServiceResult<(Vec<Certificate>, u64)> {
        let mut where_sql = String::from("user_id = ?1");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(status) = filter.status {
            params.push(Box::new(status.as_str().to_string()));
            where_sql.push_str(&format!(" AND status = ?{}", params.len()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(Box::new(format!("%{}%", search)));
            let n = params.len();
            where_sql.push_str(&format!(
                " AND (recipient_name LIKE ?{n} OR email LIKE ?{n} \
                 OR course LIKE ?{n} OR matric_no LIKE ?{n})",
            ));
        }

        let conn = self.conn.lock().unwrap();
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let total: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM certificates WHERE {}", where_sql),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;

        // Widen before multiplying: both values come from the query string
        // and u32 arithmetic would overflow on a hostile page number.
        let limit = page.limit.max(1) as u64;
        let offset = (page.page.max(1) as u64 - 1) * limit;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM certificates WHERE {} \
             ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
            CERT_COLUMNS, where_sql, limit, offset
        ))?;
        let certificates = stmt
            .query_map(param_refs.as_slice(), row_to_certificate)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((certificates, total))
    }

    /// Per-status counts for one issuer's certificates.
    pub fn count_by_status(&self, user_id: &str) -> ServiceResult<StatusCounts> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM certificates WHERE user_id = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, count) = row?;
            match status.parse::<CertificateStatus>() {
                Ok(CertificateStatus::Pending) => counts.pending = count,
                Ok(CertificateStatus::Issued) => counts.issued = count,
                Ok(CertificateStatus::Verified) => counts.verified = count,
                Ok(CertificateStatus::Revoked) => counts.revoked = count,
                Err(e) => return Err(ServiceError::Storage(e)),
            }
            counts.total += count;
        }
        Ok(counts)
    }

    /// Updates the status of one of the issuer's own certificates.
    ///
    /// The `user_id` predicate makes this owner-scoped: another issuer's
    /// certificate id behaves exactly like a nonexistent one.
    pub fn set_status(
        &self,
        id: i64,
        user_id: &str,
        status: CertificateStatus,
    ) -> ServiceResult<Certificate> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE certificates SET status = ?1 WHERE id = ?2 AND user_id = ?3",
            params![status.as_str(), id, user_id],
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("certificate {}", id)));
        }

        conn.query_row(
            &format!("SELECT {} FROM certificates WHERE id = ?1", CERT_COLUMNS),
            params![id],
            row_to_certificate,
        )
        .map_err(Into::into)
    }
}

/// Maps a `certificates` row onto the model.
fn row_to_certificate(row: &Row<'_>) -> rusqlite::Result<Certificate> {
    let status_raw: String = row.get(9)?;
    let status = status_raw.parse::<CertificateStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;

    Ok(Certificate {
        id: row.get(0)?,
        certificate_code: row.get(1)?,
        hash: row.get(2)?,
        recipient_name: row.get(3)?,
        email: row.get(4)?,
        course: row.get(5)?,
        matric_no: row.get(6)?,
        issue_date: parse_timestamp(row, 7)?,
        expiry_date: parse_optional_timestamp(row, 8)?,
        status,
        template: row.get(10)?,
        signatory_left: row.get(11)?,
        signatory_right: row.get(12)?,
        user_id: row.get(13)?,
        issued_at: parse_timestamp(row, 14)?,
        created_at: parse_timestamp(row, 15)?,
    })
}

/// Parses a nullable RFC 3339 timestamp column.
fn parse_optional_timestamp(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
    }
}
