//! Repository implementations for database operations.

pub mod data_subject_request;
pub mod privacy_policy;

pub use data_subject_request::{
    CreateDataSubjectRequestInput, DataSubjectRequestFilter, DataSubjectRequestRepository,
    TransitionInput,
};
pub use privacy_policy::{CreatePrivacyPolicyInput, PrivacyPolicyRepository};
