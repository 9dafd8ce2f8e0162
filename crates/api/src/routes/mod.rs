//! HTTP route handlers.

pub mod admin_data_subject_requests;
pub mod data_subject_requests;
pub mod health;
pub mod privacy_policy;
