// src/main.rs

//! # SmartCert - Main Entry Point
//!
//! Certificate issuance and verification service for university staff.
//! Initializes the SQLite-backed stores, the issuance and verification
//! services, and starts the API server.
//!
//! ## Environment Variables
//! - `SMARTCERT_DB`: Path to the SQLite database file (default: smartcert.db)
//! - `SMARTCERT_JWT_SECRET`: Secret for signing session tokens (required)
//! - `SMARTCERT_ADDR`: Socket address to bind (default: 127.0.0.1:3000)
//! - `ADMIN_EMAIL` / `ADMIN_PASSWORD`: (Optional) seed an initial issuer
//!   account on first start; `ADMIN_NAME` and `ADMIN_UNIVERSITY` refine it

use crate::auth::password::hash_password;
use crate::services::api_server::ApiServer;
use crate::services::issuance::IssuanceService;
use crate::services::verification::VerificationService;
use crate::storage::certificate_store::CertificateStore;
use crate::storage::user_store::UserStore;
use anyhow::Context;
use dotenv::dotenv;
use std::net::SocketAddr;

// Module declarations (organized by functional domain)
mod auth; // Sessions and password hashing
mod error; // Error taxonomy
mod models; // Data structures
mod services; // Business logic and API
mod storage; // SQLite storage layer
mod utils; // Identifier generation

/// Seeds the initial issuer account when the seed variables are set and the
/// email is not yet registered.
fn seed_admin(users: &UserStore) -> anyhow::Result<()> {
    let (email, password) = match (
        std::env::var("ADMIN_EMAIL").ok(),
        std::env::var("ADMIN_PASSWORD").ok(),
    ) {
        (Some(email), Some(password)) => (email, password),
        _ => return Ok(()),
    };

    if users.find_by_email(&email)?.is_some() {
        return Ok(());
    }

    let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin User".to_string());
    let university = std::env::var("ADMIN_UNIVERSITY").ok();
    users.create(&name, &email, &hash_password(&password), university.as_deref())?;
    log::info!("seeded issuer account {}", email);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let db_path = std::env::var("SMARTCERT_DB").unwrap_or_else(|_| "smartcert.db".to_string());
    let jwt_secret =
        std::env::var("SMARTCERT_JWT_SECRET").context("SMARTCERT_JWT_SECRET must be set")?;
    let addr: SocketAddr = std::env::var("SMARTCERT_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .context("SMARTCERT_ADDR must be a valid socket address")?;

    // Open the database and wire the stores
    let conn = storage::open(&db_path)?;
    let certificates = CertificateStore::new(conn.clone());
    let users = UserStore::new(conn);

    seed_admin(&users)?;

    // Initialize core services
    let issuance = IssuanceService::new(certificates.clone());
    let verification = VerificationService::new(certificates.clone());

    // Initialize API server with all dependencies
    let api_server = ApiServer::new(issuance, verification, certificates, users, jwt_secret);

    log::info!("SmartCert API starting at http://{}", addr);
    api_server.run(addr).await
}
