//! Privacy policy entity.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::PrivacyPolicy;

/// Row of `privacy_policies`.
#[derive(Debug, Clone, FromRow)]
pub struct PrivacyPolicyEntity {
    pub id: i64,
    pub version: String,
    pub effective_date: DateTime<Utc>,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

impl From<PrivacyPolicyEntity> for PrivacyPolicy {
    fn from(entity: PrivacyPolicyEntity) -> Self {
        Self {
            id: entity.id,
            version: entity.version,
            effective_date: entity.effective_date,
            content_html: entity.content_html,
            created_at: entity.created_at,
        }
    }
}
