//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod data_subject_request;
pub mod privacy_policy;

pub use data_subject_request::*;
pub use privacy_policy::*;
