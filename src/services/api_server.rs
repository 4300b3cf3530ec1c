// src/services/api_server.rs
//! REST API for the SmartCert service.
//!
//! Built with Axum. Endpoints:
//! - Issuer login (JWT session)
//! - Certificate issuance, listing/search, stats, and revocation
//!   (issuer-scoped, bearer-token authenticated)
//! - Public certificate verification (anonymous)
//! - Issuer profile read/update
//!
//! Wire field names are camelCase, matching the dashboard client. Business
//! verdicts from verification are reported with HTTP 200 and an `isValid`
//! flag; only transport-level problems (missing field, server fault) use
//! error statuses.

use crate::auth::password::verify_password;
use crate::auth::session::{authenticate, mint_token, SessionClaims};
use crate::error::ServiceError;
use crate::models::certificate::{Certificate, CertificateStatus};
use crate::models::user::{ProfileUpdate, User};
use crate::services::issuance::{IssuanceService, IssueInput};
use crate::services::verification::{VerificationService, Verdict, VerifiedCertificate};
use crate::storage::certificate_store::{CertificateStore, ListFilter, PageRequest};
use crate::storage::user_store::UserStore;
use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

// API request and response structures

/// Generic failure envelope.
#[derive(Serialize, Deserialize)]
struct ApiMessage {
    success: bool,
    message: String,
}

/// Request payload for issuer login
#[derive(Serialize, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Response for a successful login
#[derive(Serialize, Deserialize)]
struct LoginResponse {
    success: bool,
    token: String,
    user: UserResponse,
}

/// Issuer account fields exposed to clients
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: String,
    name: String,
    email: String,
    university: Option<String>,
    created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            university: user.university,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Request payload for issuing a certificate
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueCertificateRequest {
    #[serde(default)]
    recipient_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    course: String,
    #[serde(default)]
    matric_no: String,
    #[serde(default)]
    issue_date: String,
    expiry_date: Option<String>,
    template: Option<String>,
    signatory_left: Option<String>,
    signatory_right: Option<String>,
}

/// Certificate fields echoed back after issuance
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedCertificateResponse {
    id: i64,
    certificate_id: String,
    hash: String,
    recipient_name: String,
    email: String,
    course: String,
    matric_no: String,
    issue_date: String,
    expiry_date: Option<String>,
    status: CertificateStatus,
}

/// Response envelope for certificate issuance
#[derive(Serialize, Deserialize)]
struct IssueCertificateResponse {
    success: bool,
    data: IssuedCertificateResponse,
}

/// Query parameters for the listing endpoint
#[derive(Deserialize)]
struct ListCertificatesQuery {
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
    search: Option<String>,
}

/// One certificate row in a listing
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertificateResponse {
    id: i64,
    certificate_id: String,
    recipient_name: String,
    email: String,
    course: String,
    matric_no: String,
    issue_date: String,
    expiry_date: Option<String>,
    status: CertificateStatus,
    template: String,
    signatory_left: Option<String>,
    signatory_right: Option<String>,
    hash: String,
    created_at: String,
}

impl From<Certificate> for CertificateResponse {
    fn from(cert: Certificate) -> Self {
        CertificateResponse {
            id: cert.id,
            certificate_id: cert.certificate_code,
            recipient_name: cert.recipient_name,
            email: cert.email,
            course: cert.course,
            matric_no: cert.matric_no,
            issue_date: cert.issue_date.to_rfc3339(),
            expiry_date: cert.expiry_date.map(|d| d.to_rfc3339()),
            status: cert.status,
            template: cert.template,
            signatory_left: cert.signatory_left,
            signatory_right: cert.signatory_right,
            hash: cert.hash,
            created_at: cert.created_at.to_rfc3339(),
        }
    }
}

/// Pagination block attached to listings
#[derive(Serialize, Deserialize)]
struct Pagination {
    page: u32,
    limit: u32,
    total: u64,
    pages: u64,
}

/// Response payload for the listing endpoint
#[derive(Serialize, Deserialize)]
struct ListCertificatesData {
    certificates: Vec<CertificateResponse>,
    pagination: Pagination,
}

/// Response envelope for the listing endpoint
#[derive(Serialize, Deserialize)]
struct ListCertificatesResponse {
    success: bool,
    data: ListCertificatesData,
}

/// Response envelope for the stats endpoint
#[derive(Serialize, Deserialize)]
struct CertificateStatsResponse {
    success: bool,
    data: StatsData,
}

/// Per-status counts for the dashboard
#[derive(Serialize, Deserialize)]
struct StatsData {
    pending: u64,
    issued: u64,
    verified: u64,
    revoked: u64,
    total: u64,
}

/// Response envelope for revocation
#[derive(Serialize, Deserialize)]
struct RevokeCertificateResponse {
    success: bool,
    data: CertificateResponse,
}

/// Request payload for public verification. The field is named
/// `certificateId` for historical reasons but accepts either the long
/// verification hash or the short certificate code.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyCertificateRequest {
    certificate_id: Option<String>,
}

/// Response for public verification
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyCertificateResponse {
    success: bool,
    is_valid: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_data: Option<VerifiedCertificate>,
}

/// Response envelope for profile reads/updates
#[derive(Serialize, Deserialize)]
struct ProfileResponse {
    success: bool,
    data: UserResponse,
}

/// Request payload for profile updates
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    university: Option<String>,
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Service for issuing and revoking certificates
    issuance: Arc<IssuanceService>,

    /// Service for public verification queries
    verification: Arc<VerificationService>,

    /// Certificate record store (listing and stats read paths)
    certificates: Arc<CertificateStore>,

    /// Issuer account store
    users: Arc<UserStore>,

    /// Secret for signing and validating session tokens
    jwt_secret: String,
}

impl ApiServer {
    /// Creates a new instance of the API server
    pub fn new(
        issuance: IssuanceService,
        verification: VerificationService,
        certificates: CertificateStore,
        users: UserStore,
        jwt_secret: String,
    ) -> Self {
        ApiServer {
            issuance: Arc::new(issuance),
            verification: Arc::new(verification),
            certificates: Arc::new(certificates),
            users: Arc::new(users),
            jwt_secret,
        }
    }

    /// Builds the application router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/auth/login", post(Self::login_handler))
            .route(
                "/api/certificates",
                post(Self::issue_certificate_handler).get(Self::list_certificates_handler),
            )
            .route(
                "/api/certificates/stats",
                get(Self::certificate_stats_handler),
            )
            .route(
                "/api/certificates/:id/revoke",
                post(Self::revoke_certificate_handler),
            )
            .route("/api/verification", post(Self::verify_certificate_handler))
            .route(
                "/api/user/profile",
                get(Self::get_profile_handler).put(Self::update_profile_handler),
            )
            // The dashboard client is served from a different origin.
            .layer(tower_http::cors::CorsLayer::permissive())
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("API server listening on {}", addr);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Runs the session check shared by all issuer-scoped handlers.
    fn require_session(
        state: &ApiServer,
        headers: &HeaderMap,
    ) -> Result<SessionClaims, Response> {
        authenticate(headers, &state.jwt_secret).map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiMessage {
                    success: false,
                    message: "Unauthorized".into(),
                }),
            )
                .into_response()
        })
    }

    /// Maps a service error onto an HTTP response. Storage and internal
    /// failures are logged and reported generically so storage details
    /// never leak to clients.
    fn error_response(err: ServiceError) -> Response {
        let (status, message) = match &err {
            ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServiceError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServiceError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                log::error!("request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (
            status,
            Json(ApiMessage {
                success: false,
                message,
            }),
        )
            .into_response()
    }

    // =====================
    // Authentication
    // =====================

    /// Authenticates an issuer and returns a session token
    ///
    /// # Endpoint
    /// POST /api/auth/login
    ///
    /// # Responses
    /// - 200 OK: Returns token and issuer profile
    /// - 401 Unauthorized: Unknown email or wrong password
    async fn login_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<LoginRequest>,
    ) -> Response {
        let rejected = || {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiMessage {
                    success: false,
                    message: "Invalid email or password".into(),
                }),
            )
                .into_response()
        };

        let user = match state.users.find_by_email(&payload.email) {
            Ok(Some(user)) => user,
            Ok(None) => return rejected(),
            Err(e) => return Self::error_response(e),
        };

        match verify_password(&payload.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return rejected(),
            Err(e) => return Self::error_response(e),
        }

        match mint_token(&user, &state.jwt_secret) {
            Ok(token) => (
                StatusCode::OK,
                Json(LoginResponse {
                    success: true,
                    token,
                    user: user.into(),
                }),
            )
                .into_response(),
            Err(e) => Self::error_response(e),
        }
    }

    // =====================
    // Certificate Handlers
    // =====================

    /// Issues a new certificate for the authenticated issuer
    ///
    /// # Endpoint
    /// POST /api/certificates
    ///
    /// # Responses
    /// - 200 OK: Returns the new certificate's public identifiers
    /// - 400 Bad Request: Missing or malformed required field
    /// - 401 Unauthorized: Missing or invalid session
    async fn issue_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Json(payload): Json<IssueCertificateRequest>,
    ) -> Response {
        let session = match Self::require_session(&state, &headers) {
            Ok(session) => session,
            Err(response) => return response,
        };

        let input = IssueInput {
            recipient_name: payload.recipient_name,
            email: payload.email,
            course: payload.course,
            matric_no: payload.matric_no,
            issue_date: payload.issue_date,
            expiry_date: payload.expiry_date,
            template: payload.template,
            signatory_left: payload.signatory_left,
            signatory_right: payload.signatory_right,
        };

        match state.issuance.issue(&session.sub, &input) {
            Ok(cert) => (
                StatusCode::OK,
                Json(IssueCertificateResponse {
                    success: true,
                    data: IssuedCertificateResponse {
                        id: cert.id,
                        certificate_id: cert.certificate_code,
                        hash: cert.hash,
                        recipient_name: cert.recipient_name,
                        email: cert.email,
                        course: cert.course,
                        matric_no: cert.matric_no,
                        issue_date: cert.issue_date.to_rfc3339(),
                        expiry_date: cert.expiry_date.map(|d| d.to_rfc3339()),
                        status: cert.status,
                    },
                }),
            )
                .into_response(),
            Err(e) => Self::error_response(e),
        }
    }

    /// Lists the authenticated issuer's certificates
    ///
    /// # Endpoint
    /// GET /api/certificates?page&limit&status&search
    ///
    /// # Responses
    /// - 200 OK: Returns a page of certificates plus pagination totals
    /// - 401 Unauthorized: Missing or invalid session
    async fn list_certificates_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Query(query): Query<ListCertificatesQuery>,
    ) -> Response {
        let session = match Self::require_session(&state, &headers) {
            Ok(session) => session,
            Err(response) => return response,
        };

        let page = PageRequest {
            page: query.page.unwrap_or(1).max(1),
            limit: query.limit.unwrap_or(10).clamp(1, 100),
        };
        let filter = ListFilter {
            // An unrecognized status value is ignored rather than rejected.
            status: query
                .status
                .as_deref()
                .and_then(|s| s.parse::<CertificateStatus>().ok()),
            search: query.search.filter(|s| !s.is_empty()),
        };

        match state
            .certificates
            .list_by_issuer(&session.sub, &filter, page)
        {
            Ok((certificates, total)) => {
                let pages = total.div_ceil(page.limit as u64);
                (
                    StatusCode::OK,
                    Json(ListCertificatesResponse {
                        success: true,
                        data: ListCertificatesData {
                            certificates: certificates
                                .into_iter()
                                .map(CertificateResponse::from)
                                .collect(),
                            pagination: Pagination {
                                page: page.page,
                                limit: page.limit,
                                total,
                                pages,
                            },
                        },
                    }),
                )
                    .into_response()
            }
            Err(e) => Self::error_response(e),
        }
    }

    /// Per-status certificate counts for the issuer's dashboard
    ///
    /// # Endpoint
    /// GET /api/certificates/stats
    async fn certificate_stats_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
    ) -> Response {
        let session = match Self::require_session(&state, &headers) {
            Ok(session) => session,
            Err(response) => return response,
        };

        match state.certificates.count_by_status(&session.sub) {
            Ok(counts) => (
                StatusCode::OK,
                Json(CertificateStatsResponse {
                    success: true,
                    data: StatsData {
                        pending: counts.pending,
                        issued: counts.issued,
                        verified: counts.verified,
                        revoked: counts.revoked,
                        total: counts.total,
                    },
                }),
            )
                .into_response(),
            Err(e) => Self::error_response(e),
        }
    }

    /// Revokes one of the issuer's certificates
    ///
    /// # Endpoint
    /// POST /api/certificates/:id/revoke
    ///
    /// # Responses
    /// - 200 OK: Returns the updated certificate
    /// - 400 Bad Request: Certificate is not currently ISSUED
    /// - 404 Not Found: Unknown id, or owned by another issuer
    async fn revoke_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Response {
        let session = match Self::require_session(&state, &headers) {
            Ok(session) => session,
            Err(response) => return response,
        };

        match state.issuance.revoke(&session.sub, id) {
            Ok(cert) => (
                StatusCode::OK,
                Json(RevokeCertificateResponse {
                    success: true,
                    data: cert.into(),
                }),
            )
                .into_response(),
            Err(e) => Self::error_response(e),
        }
    }

    // =====================
    // Public Verification
    // =====================

    /// Verifies a certificate by hash or short code
    ///
    /// # Endpoint
    /// POST /api/verification
    ///
    /// No authentication: verification is a public trust operation. All
    /// business verdicts return 200 with `isValid` and a message; only a
    /// missing `certificateId` field is a 400.
    async fn verify_certificate_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyCertificateRequest>,
    ) -> Response {
        let candidate = match payload.certificate_id.filter(|c| !c.trim().is_empty()) {
            Some(candidate) => candidate,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiMessage {
                        success: false,
                        message: "Certificate ID is required".into(),
                    }),
                )
                    .into_response()
            }
        };

        match state.verification.verify(candidate.trim()) {
            Ok(verdict) => {
                let message = verdict.message().to_string();
                let (is_valid, certificate_data) = match verdict {
                    Verdict::Valid(data) => (true, Some(*data)),
                    _ => (false, None),
                };
                (
                    StatusCode::OK,
                    Json(VerifyCertificateResponse {
                        success: is_valid,
                        is_valid,
                        message,
                        certificate_data,
                    }),
                )
                    .into_response()
            }
            Err(e) => Self::error_response(e),
        }
    }

    // =====================
    // Issuer Profile
    // =====================

    /// Returns the authenticated issuer's profile
    ///
    /// # Endpoint
    /// GET /api/user/profile
    async fn get_profile_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
    ) -> Response {
        let session = match Self::require_session(&state, &headers) {
            Ok(session) => session,
            Err(response) => return response,
        };

        match state.users.find_by_id(&session.sub) {
            Ok(Some(user)) => (
                StatusCode::OK,
                Json(ProfileResponse {
                    success: true,
                    data: user.into(),
                }),
            )
                .into_response(),
            Ok(None) => Self::error_response(ServiceError::NotFound("user".into())),
            Err(e) => Self::error_response(e),
        }
    }

    /// Updates the authenticated issuer's profile
    ///
    /// # Endpoint
    /// PUT /api/user/profile
    ///
    /// # Responses
    /// - 200 OK: Returns the updated profile
    /// - 400 Bad Request: Missing name/email, or email already in use
    async fn update_profile_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Json(payload): Json<UpdateProfileRequest>,
    ) -> Response {
        let session = match Self::require_session(&state, &headers) {
            Ok(session) => session,
            Err(response) => return response,
        };

        if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
            return Self::error_response(ServiceError::Validation(
                "Name and email are required".into(),
            ));
        }

        let update = ProfileUpdate {
            name: payload.name,
            email: payload.email,
            university: payload.university,
        };

        match state.users.update_profile(&session.sub, &update) {
            Ok(user) => (
                StatusCode::OK,
                Json(ProfileResponse {
                    success: true,
                    data: user.into(),
                }),
            )
                .into_response(),
            Err(e) => Self::error_response(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::storage;

    fn server_with_user() -> (ApiServer, User) {
        let conn = storage::open_in_memory().unwrap();
        let users = UserStore::new(conn.clone());
        let user = users
            .create(
                "Admin User",
                "admin@unijos.edu",
                &hash_password("admin123"),
                Some("University of Jos"),
            )
            .unwrap();
        let certificates = CertificateStore::new(conn);
        let server = ApiServer::new(
            IssuanceService::new(certificates.clone()),
            VerificationService::new(certificates.clone()),
            certificates,
            users,
            "test-secret".into(),
        );
        (server, user)
    }

    #[test]
    fn error_response_maps_taxonomy_to_status() {
        for (err, status) in [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServiceError::Storage("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ] {
            assert_eq!(ApiServer::error_response(err).status(), status);
        }
    }

    #[test]
    fn require_session_accepts_minted_token() {
        let (server, user) = server_with_user();
        let token = mint_token(&user, "test-secret").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        let claims = ApiServer::require_session(&server, &headers).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[test]
    fn require_session_rejects_missing_header() {
        let (server, _) = server_with_user();
        let response = ApiServer::require_session(&server, &HeaderMap::new()).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn router_builds() {
        let (server, _) = server_with_user();
        let _router = server.router();
    }
}
