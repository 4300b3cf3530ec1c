// src/services/mod.rs
//! Business logic and API surface.

pub mod api_server;
pub mod issuance;
pub mod verification;
