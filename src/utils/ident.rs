// src/utils/ident.rs
//! Certificate identifier generation.
//!
//! Two identifiers are minted per certificate at issuance time:
//! - a short 8-character code over `[A-Z0-9]` for human sharing
//! - a 256-bit SHA-256 verification hash binding the certificate content
//!
//! Neither function performs uniqueness checks; collisions are detected by
//! the store's unique constraints and handled by the issuance service's
//! single retry.

use chrono::Utc;
use rand::Rng;
use ring::digest;

/// Alphabet for short certificate codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a short certificate code.
const CODE_LENGTH: usize = 8;

/// Content tuple fed into the verification hash.
#[derive(Debug, Clone)]
pub struct HashInput<'a> {
    pub recipient_name: &'a str,
    pub email: &'a str,
    pub course: &'a str,
    pub matric_no: &'a str,
    pub issue_date: &'a str,
    pub user_id: &'a str,
}

/// Generates a short, human-shareable certificate code.
///
/// Draws 8 symbols uniformly at random from the 36-symbol alphabet
/// `[A-Z0-9]`. Collision probability is negligible at low volume but
/// non-zero; the store's unique constraint is the backstop.
pub fn generate_certificate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generates the verification hash for a certificate.
///
/// Concatenates the content tuple with a nanosecond timestamp and computes
/// a SHA-256 digest, rendered as a 64-character lowercase hex string. The
/// timestamp component guarantees that identical content issued twice
/// yields different hashes, which also makes the issuance service's
/// conflict retry effective: regenerating refreshes the salt.
///
/// The hash is one-way and acts as an opaque bearer token — knowing it
/// proves the issuer minted this exact record, nothing more.
pub fn generate_verification_hash(input: &HashInput<'_>) -> String {
    let hash_input = format!(
        "{}-{}-{}-{}-{}-{}-{}",
        input.recipient_name,
        input.email,
        input.course,
        input.matric_no,
        input.issue_date,
        input.user_id,
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
    );
    let digest = digest::digest(&digest::SHA256, hash_input.as_bytes());
    hex::encode(digest.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> HashInput<'static> {
        HashInput {
            recipient_name: "Aisha Bello",
            email: "csc045@unijos.edu",
            course: "Computer Science",
            matric_no: "CSC/2017/045",
            issue_date: "2024-06-01",
            user_id: "issuer-1",
        }
    }

    #[test]
    fn code_is_eight_chars_over_alphabet() {
        for _ in 0..100 {
            let code = generate_certificate_code();
            assert_eq!(code.len(), 8);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn hash_is_64_lowercase_hex_chars() {
        let hash = generate_verification_hash(&sample_input());
        assert_eq!(hash.len(), 64);
        assert!(hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn identical_content_hashes_differently() {
        // The nanosecond salt must separate back-to-back issuances of the
        // same content.
        let input = sample_input();
        let first = generate_verification_hash(&input);
        let second = generate_verification_hash(&input);
        assert_ne!(first, second);
    }
}
