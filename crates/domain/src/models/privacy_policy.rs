//! Privacy policy domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::validation::validate_not_blank;

/// A published version of the privacy policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivacyPolicy {
    pub id: i64,
    pub version: String,
    pub effective_date: DateTime<Utc>,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

/// Transport representation of a privacy policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyPolicyDto {
    pub version: String,
    pub effective_date: DateTime<Utc>,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

impl From<&PrivacyPolicy> for PrivacyPolicyDto {
    fn from(policy: &PrivacyPolicy) -> Self {
        Self {
            version: policy.version.clone(),
            effective_date: policy.effective_date,
            content_html: policy.content_html.clone(),
            created_at: policy.created_at,
        }
    }
}

/// Body of `POST /api/v1/admin/privacy-policies`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrivacyPolicyRequest {
    #[validate(regex(
        path = *POLICY_VERSION_REGEX,
        message = "Version must be 1-32 characters of letters, digits, '.', '-' or '_'"
    ))]
    pub version: String,
    /// Defaults to the time of publication.
    #[serde(default)]
    pub effective_date: Option<DateTime<Utc>>,
    #[validate(length(max = 200_000, message = "Policy content too long"))]
    #[validate(custom(function = "validate_not_blank"))]
    pub content_html: String,
}

lazy_static::lazy_static! {
    pub static ref POLICY_VERSION_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9._-]{1,32}$").unwrap();
}
