//! Privacy policy repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use domain::models::PrivacyPolicy;

use crate::entities::PrivacyPolicyEntity;

/// Input for publishing a privacy policy version.
#[derive(Debug, Clone)]
pub struct CreatePrivacyPolicyInput {
    pub version: String,
    pub effective_date: DateTime<Utc>,
    pub content_html: String,
}

/// Repository for privacy policy versions.
#[derive(Clone)]
pub struct PrivacyPolicyRepository {
    pool: PgPool,
}

impl PrivacyPolicyRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The policy currently in effect: the latest one whose effective date has passed.
    pub async fn current(&self) -> Result<Option<PrivacyPolicy>, sqlx::Error> {
        let entity = sqlx::query_as::<_, PrivacyPolicyEntity>(
            r#"
            SELECT * FROM privacy_policies
            WHERE effective_date <= NOW()
            ORDER BY effective_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// All versions, newest effective date first.
    pub async fn list(&self) -> Result<Vec<PrivacyPolicy>, sqlx::Error> {
        let entities = sqlx::query_as::<_, PrivacyPolicyEntity>(
            "SELECT * FROM privacy_policies ORDER BY effective_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Publish a new version. Fails with a unique violation if the version exists.
    pub async fn create(&self, input: CreatePrivacyPolicyInput) -> Result<PrivacyPolicy, sqlx::Error> {
        let entity = sqlx::query_as::<_, PrivacyPolicyEntity>(
            r#"
            INSERT INTO privacy_policies (version, effective_date, content_html)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&input.version)
        .bind(input.effective_date)
        .bind(&input.content_html)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity.into())
    }
}
