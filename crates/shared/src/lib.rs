//! Shared utilities and common types for the Privacy Desk backend.
//!
//! This crate provides small helpers used across the other crates:
//! - Offset pagination math
//! - Field validators for request payloads

pub mod pagination;
pub mod validation;
