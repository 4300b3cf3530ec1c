// src/models/mod.rs
//! Data structures shared across the service and storage layers.

pub mod certificate;
pub mod user;
