// src/auth/password.rs
//! Password hashing for issuer accounts.
//!
//! Uses PBKDF2-HMAC-SHA256 with a per-account random salt. Hashes are
//! stored as `salt$iterations$derived`, salt and derived key hex-encoded,
//! so the parameters travel with the record and can be raised later
//! without rehashing existing accounts.

use rand::RngCore;
use ring::pbkdf2;
use std::num::NonZeroU32;

use crate::error::{ServiceError, ServiceResult};

/// Derived key length in bytes.
const CREDENTIAL_LEN: usize = 32;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// PBKDF2 iteration count for newly hashed passwords.
const ITERATIONS: u32 = 100_000;

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut derived = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        NonZeroU32::new(ITERATIONS).unwrap(),
        &salt,
        password.as_bytes(),
        &mut derived,
    );

    format!("{}${}${}", hex::encode(salt), ITERATIONS, hex::encode(derived))
}

/// Verifies a password against a stored `salt$iterations$derived` hash.
///
/// Returns `Ok(true)` on a match, `Ok(false)` on a mismatch, and an error
/// only when the stored hash itself is malformed.
pub fn verify_password(password: &str, stored: &str) -> ServiceResult<bool> {
    let mut parts = stored.splitn(3, '$');
    let (salt_hex, iter_str, derived_hex) = match (parts.next(), parts.next(), parts.next()) {
        (Some(s), Some(i), Some(d)) => (s, i, d),
        _ => {
            return Err(ServiceError::Internal(
                "malformed stored password hash".into(),
            ))
        }
    };

    let salt = hex::decode(salt_hex)
        .map_err(|e| ServiceError::Internal(format!("bad salt encoding: {}", e)))?;
    let derived = hex::decode(derived_hex)
        .map_err(|e| ServiceError::Internal(format!("bad hash encoding: {}", e)))?;
    let iterations = iter_str
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| ServiceError::Internal("bad iteration count".into()))?;

    Ok(pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &derived,
    )
    .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let stored = hash_password("admin123");
        assert!(verify_password("admin123", &stored).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let stored = hash_password("admin123");
        assert!(!verify_password("admin124", &stored).unwrap());
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        assert_ne!(hash_password("admin123"), hash_password("admin123"));
    }

    #[test]
    fn malformed_stored_hash_is_an_internal_error() {
        assert!(verify_password("x", "not-a-hash").is_err());
    }
}
