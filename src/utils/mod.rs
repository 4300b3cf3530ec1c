// src/utils/mod.rs
//! Helper utilities.

pub mod ident;
