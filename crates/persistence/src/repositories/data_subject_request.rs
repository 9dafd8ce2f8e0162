//! Data subject request repository for database operations.
//!
//! Every write that changes a request appends its history entry in the same
//! transaction. History rows are only ever inserted.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use domain::models::{
    DataSubjectRequest, DataSubjectRequestHistory, DataSubjectRequestSummary, RequestStatus,
    RequestType,
};
use domain::services::NewHistoryEntry;
use shared::pagination::PageRequest;

use crate::entities::{
    DataSubjectRequestEntity, DataSubjectRequestHistoryEntity, RequestStatusDb, RequestTypeDb,
};
use crate::metrics::QueryTimer;

/// Input for creating a new data subject request.
#[derive(Debug, Clone)]
pub struct CreateDataSubjectRequestInput {
    pub user_id: i64,
    pub request_type: RequestType,
    pub description: String,
    pub ip_address: String,
    pub submitted_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
}

/// Input for moving a request to a new status.
#[derive(Debug, Clone)]
pub struct TransitionInput {
    /// Status the request must still be in for the update to apply.
    pub expected_status: RequestStatus,
    pub new_status: RequestStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub export_file_path: Option<String>,
    pub export_expires_at: Option<DateTime<Utc>>,
    pub deletion_summary: Option<String>,
    pub retention_summary: Option<String>,
}

/// Filters for the admin listing.
#[derive(Debug, Clone, Default)]
pub struct DataSubjectRequestFilter {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub user_id: Option<i64>,
    pub assigned_to_admin_id: Option<i64>,
    pub overdue_only: bool,
}

/// Repository for data subject request database operations.
#[derive(Clone)]
pub struct DataSubjectRequestRepository {
    pool: PgPool,
}

impl DataSubjectRequestRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a request and record its `Created` history entry.
    pub async fn create(
        &self,
        input: CreateDataSubjectRequestInput,
        entry: NewHistoryEntry,
    ) -> Result<DataSubjectRequest, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, DataSubjectRequestEntity>(
            r#"
            INSERT INTO data_subject_requests (
                user_id, request_type, status, description,
                submitted_at, deadline_at, ip_address
            )
            VALUES ($1, $2, 'pending', $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(input.user_id)
        .bind(RequestTypeDb::from(input.request_type))
        .bind(&input.description)
        .bind(input.submitted_at)
        .bind(input.deadline_at)
        .bind(&input.ip_address)
        .fetch_one(&mut *tx)
        .await?;

        let history = insert_history(&mut tx, entity.id, &entry).await?;

        tx.commit().await?;

        Ok(entity.with_history(vec![history]))
    }

    /// Find a request by ID, with its history loaded.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<DataSubjectRequest>, sqlx::Error> {
        let timer = QueryTimer::new("dsr_find_by_id");
        let entity = sqlx::query_as::<_, DataSubjectRequestEntity>(
            "SELECT * FROM data_subject_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();

        self.attach_history(entity).await
    }

    /// Find a request by ID owned by the given user, with its history loaded.
    pub async fn find_by_id_for_user(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<DataSubjectRequest>, sqlx::Error> {
        let entity = sqlx::query_as::<_, DataSubjectRequestEntity>(
            "SELECT * FROM data_subject_requests WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        self.attach_history(entity).await
    }

    /// List a user's requests, newest first. History is not loaded.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<DataSubjectRequest>, sqlx::Error> {
        let entities = sqlx::query_as::<_, DataSubjectRequestEntity>(
            r#"
            SELECT * FROM data_subject_requests
            WHERE user_id = $1
            ORDER BY submitted_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// List requests with filtering and pagination. History is not loaded.
    pub async fn list(
        &self,
        filter: &DataSubjectRequestFilter,
        page: PageRequest,
    ) -> Result<(Vec<DataSubjectRequest>, i64), sqlx::Error> {
        let timer = QueryTimer::new("dsr_list");

        // Build dynamic WHERE clause
        let mut conditions = vec!["TRUE".to_string()];
        let mut param_count = 0;

        if filter.status.is_some() {
            param_count += 1;
            conditions.push(format!("status = ${}", param_count));
        }
        if filter.request_type.is_some() {
            param_count += 1;
            conditions.push(format!("request_type = ${}", param_count));
        }
        if filter.user_id.is_some() {
            param_count += 1;
            conditions.push(format!("user_id = ${}", param_count));
        }
        if filter.assigned_to_admin_id.is_some() {
            param_count += 1;
            conditions.push(format!("assigned_to_admin_id = ${}", param_count));
        }
        if filter.overdue_only {
            conditions.push(
                "status IN ('pending', 'in_progress') AND deadline_at < NOW()".to_string(),
            );
        }

        let where_clause = conditions.join(" AND ");

        // Count query
        let count_sql = format!(
            "SELECT COUNT(*) FROM data_subject_requests WHERE {}",
            where_clause
        );
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);

        if let Some(status) = filter.status {
            count_query = count_query.bind(RequestStatusDb::from(status));
        }
        if let Some(request_type) = filter.request_type {
            count_query = count_query.bind(RequestTypeDb::from(request_type));
        }
        if let Some(user_id) = filter.user_id {
            count_query = count_query.bind(user_id);
        }
        if let Some(admin_id) = filter.assigned_to_admin_id {
            count_query = count_query.bind(admin_id);
        }

        let total = count_query.fetch_one(&self.pool).await?;

        // List query
        let list_sql = format!(
            r#"
            SELECT * FROM data_subject_requests
            WHERE {}
            ORDER BY submitted_at DESC, id DESC
            LIMIT ${} OFFSET ${}
            "#,
            where_clause,
            param_count + 1,
            param_count + 2
        );

        let mut list_query = sqlx::query_as::<_, DataSubjectRequestEntity>(&list_sql);

        if let Some(status) = filter.status {
            list_query = list_query.bind(RequestStatusDb::from(status));
        }
        if let Some(request_type) = filter.request_type {
            list_query = list_query.bind(RequestTypeDb::from(request_type));
        }
        if let Some(user_id) = filter.user_id {
            list_query = list_query.bind(user_id);
        }
        if let Some(admin_id) = filter.assigned_to_admin_id {
            list_query = list_query.bind(admin_id);
        }

        let entities = list_query
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        timer.record();

        Ok((entities.into_iter().map(Into::into).collect(), total))
    }

    /// Load the history of a request in chronological order.
    pub async fn load_history(
        &self,
        request_id: i64,
    ) -> Result<Vec<DataSubjectRequestHistory>, sqlx::Error> {
        let entities = self.fetch_history(request_id).await?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Move a request to a new status and record the change.
    ///
    /// Returns `None` when the request does not exist or is no longer in
    /// `expected_status`.
    pub async fn transition(
        &self,
        id: i64,
        input: TransitionInput,
        entry: NewHistoryEntry,
    ) -> Result<Option<DataSubjectRequest>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, DataSubjectRequestEntity>(
            r#"
            UPDATE data_subject_requests
            SET
                status = $1,
                completed_at = COALESCE($2, completed_at),
                export_file_path = COALESCE($3, export_file_path),
                export_expires_at = COALESCE($4, export_expires_at),
                deletion_summary = COALESCE($5, deletion_summary),
                retention_summary = COALESCE($6, retention_summary)
            WHERE id = $7 AND status = $8
            RETURNING *
            "#,
        )
        .bind(RequestStatusDb::from(input.new_status))
        .bind(input.completed_at)
        .bind(&input.export_file_path)
        .bind(input.export_expires_at)
        .bind(&input.deletion_summary)
        .bind(&input.retention_summary)
        .bind(id)
        .bind(RequestStatusDb::from(input.expected_status))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entity) = entity else {
            return Ok(None);
        };

        insert_history(&mut tx, id, &entry).await?;
        tx.commit().await?;

        Ok(Some(self.with_loaded_history(entity).await?))
    }

    /// Record that the requester's identity was verified.
    ///
    /// Returns `None` when the request does not exist, is closed, or was
    /// already verified.
    pub async fn mark_identity_verified(
        &self,
        id: i64,
        method: &str,
        entry: NewHistoryEntry,
    ) -> Result<Option<DataSubjectRequest>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, DataSubjectRequestEntity>(
            r#"
            UPDATE data_subject_requests
            SET identity_verified = TRUE, verification_method = $1, verified_at = NOW()
            WHERE id = $2
              AND status IN ('pending', 'in_progress')
              AND identity_verified = FALSE
            RETURNING *
            "#,
        )
        .bind(method)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entity) = entity else {
            return Ok(None);
        };

        insert_history(&mut tx, id, &entry).await?;
        tx.commit().await?;

        Ok(Some(self.with_loaded_history(entity).await?))
    }

    /// Assign a request to an administrator.
    pub async fn assign(
        &self,
        id: i64,
        admin_id: i64,
        entry: NewHistoryEntry,
    ) -> Result<Option<DataSubjectRequest>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, DataSubjectRequestEntity>(
            r#"
            UPDATE data_subject_requests
            SET assigned_to_admin_id = $1
            WHERE id = $2 AND status IN ('pending', 'in_progress')
            RETURNING *
            "#,
        )
        .bind(admin_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entity) = entity else {
            return Ok(None);
        };

        insert_history(&mut tx, id, &entry).await?;
        tx.commit().await?;

        Ok(Some(self.with_loaded_history(entity).await?))
    }

    /// Replace the administrator notes on a request.
    pub async fn set_admin_notes(
        &self,
        id: i64,
        note: &str,
        entry: NewHistoryEntry,
    ) -> Result<Option<DataSubjectRequest>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, DataSubjectRequestEntity>(
            r#"
            UPDATE data_subject_requests
            SET admin_notes = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(note)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entity) = entity else {
            return Ok(None);
        };

        insert_history(&mut tx, id, &entry).await?;
        tx.commit().await?;

        Ok(Some(self.with_loaded_history(entity).await?))
    }

    /// Get counts for the compliance dashboard.
    pub async fn counts(&self) -> Result<DataSubjectRequestSummary, sqlx::Error> {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'in_progress') as in_progress,
                COUNT(*) FILTER (WHERE status = 'completed') as completed,
                COUNT(*) FILTER (WHERE status = 'rejected') as rejected,
                COUNT(*) FILTER (WHERE status = 'cancelled') as cancelled,
                COUNT(*) FILTER (WHERE status IN ('pending', 'in_progress') AND deadline_at < NOW()) as overdue
            FROM data_subject_requests
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DataSubjectRequestSummary {
            total: row.0,
            pending: row.1,
            in_progress: row.2,
            completed: row.3,
            rejected: row.4,
            cancelled: row.5,
            overdue: row.6,
        })
    }

    async fn fetch_history(
        &self,
        request_id: i64,
    ) -> Result<Vec<DataSubjectRequestHistoryEntity>, sqlx::Error> {
        sqlx::query_as::<_, DataSubjectRequestHistoryEntity>(
            r#"
            SELECT * FROM data_subject_request_history
            WHERE request_id = $1
            ORDER BY performed_at ASC, id ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn with_loaded_history(
        &self,
        entity: DataSubjectRequestEntity,
    ) -> Result<DataSubjectRequest, sqlx::Error> {
        let history = self.fetch_history(entity.id).await?;
        Ok(entity.with_history(history))
    }

    async fn attach_history(
        &self,
        entity: Option<DataSubjectRequestEntity>,
    ) -> Result<Option<DataSubjectRequest>, sqlx::Error> {
        match entity {
            Some(entity) => Ok(Some(self.with_loaded_history(entity).await?)),
            None => Ok(None),
        }
    }
}

/// Append one history entry inside an open transaction.
async fn insert_history(
    conn: &mut PgConnection,
    request_id: i64,
    entry: &NewHistoryEntry,
) -> Result<DataSubjectRequestHistoryEntity, sqlx::Error> {
    debug!(
        request_id = request_id,
        action = %entry.action,
        performed_by = %entry.performed_by,
        "Appending data subject request history"
    );

    sqlx::query_as::<_, DataSubjectRequestHistoryEntity>(
        r#"
        INSERT INTO data_subject_request_history (
            request_id, action, old_status, new_status, details,
            performed_by, performed_by_role, ip_address
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(request_id)
    .bind(&entry.action)
    .bind(entry.old_status.map(RequestStatusDb::from))
    .bind(entry.new_status.map(RequestStatusDb::from))
    .bind(&entry.details)
    .bind(&entry.performed_by)
    .bind(&entry.performed_by_role)
    .bind(&entry.ip_address)
    .fetch_one(&mut *conn)
    .await
}
