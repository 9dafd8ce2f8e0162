//! Domain layer for the Privacy Desk backend.
//!
//! This crate contains:
//! - Domain models (data subject requests, their history, privacy policies)
//! - The mapper projecting requests into transport DTOs
//! - Request lifecycle rules

pub mod models;
pub mod services;
