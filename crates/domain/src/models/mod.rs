//! Domain models for Privacy Desk.

pub mod data_subject_request;
pub mod privacy_policy;

pub use data_subject_request::*;
pub use privacy_policy::*;
