// src/auth/session.rs
//! Session tokens for authenticated issuers.
//!
//! Issuance, listing, revocation and profile operations are issuer-scoped;
//! verification is public and never touches this module. Sessions are
//! stateless JWTs (HS256) carrying the issuer id, handed out by the login
//! endpoint and presented as a `Bearer` token on subsequent requests.
//! Session context is explicit: handlers call [`authenticate`] and pass the
//! resulting claims down, there is no ambient session singleton.

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::models::user::User;

/// Session lifetime in hours.
const SESSION_HOURS: i64 = 24;

/// JWT claims carried by an issuer session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionClaims {
    /// Issuer account id
    pub sub: String,
    /// Issuer display name (for logging, not authorization)
    pub name: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Issued-at, seconds since epoch
    pub iat: i64,
}

/// Mints a session token for a freshly authenticated issuer.
pub fn mint_token(user: &User, secret: &str) -> ServiceResult<String> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user.id.clone(),
        name: user.name.clone(),
        exp: (now + Duration::hours(SESSION_HOURS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::Internal(format!("token encoding failed: {}", e)))
}

/// Validates a raw token string and returns its claims.
pub fn validate_token(token: &str, secret: &str) -> ServiceResult<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| ServiceError::Unauthorized(format!("invalid session token: {}", e)))
}

/// Extracts and validates the `Authorization: Bearer` token from request
/// headers. This is the session check every issuer-scoped handler runs
/// before doing any work.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> ServiceResult<SessionClaims> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServiceError::Unauthorized("expected bearer token".into()))?;

    validate_token(token, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "issuer-1".into(),
            name: "Admin User".into(),
            email: "admin@unijos.edu".into(),
            password_hash: String::new(),
            university: Some("University of Jos".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn minted_token_validates() {
        let token = mint_token(&test_user(), "test-secret").unwrap();
        let claims = validate_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "issuer-1");
        assert_eq!(claims.name, "Admin User");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint_token(&test_user(), "test-secret").unwrap();
        assert!(validate_token(&token, "other-secret").is_err());
    }

    #[test]
    fn bearer_header_authenticates() {
        let token = mint_token(&test_user(), "test-secret").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        let claims = authenticate(&headers, "test-secret").unwrap();
        assert_eq!(claims.sub, "issuer-1");
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let headers = HeaderMap::new();
        assert!(matches!(
            authenticate(&headers, "test-secret"),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
