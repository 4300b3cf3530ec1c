// src/auth/mod.rs
//! Issuer authentication: password hashing and session tokens.

pub mod password;
pub mod session;
