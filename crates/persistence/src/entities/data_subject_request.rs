//! Data subject request entities.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{DataSubjectRequest, DataSubjectRequestHistory, RequestStatus, RequestType};

/// Database enum for data subject request types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "data_subject_request_type", rename_all = "snake_case")]
pub enum RequestTypeDb {
    Access,
    Export,
    Deletion,
    Rectification,
    Restriction,
    Objection,
}

impl std::fmt::Display for RequestTypeDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Export => write!(f, "export"),
            Self::Deletion => write!(f, "deletion"),
            Self::Rectification => write!(f, "rectification"),
            Self::Restriction => write!(f, "restriction"),
            Self::Objection => write!(f, "objection"),
        }
    }
}

impl From<RequestType> for RequestTypeDb {
    fn from(t: RequestType) -> Self {
        match t {
            RequestType::Access => Self::Access,
            RequestType::Export => Self::Export,
            RequestType::Deletion => Self::Deletion,
            RequestType::Rectification => Self::Rectification,
            RequestType::Restriction => Self::Restriction,
            RequestType::Objection => Self::Objection,
        }
    }
}

impl From<RequestTypeDb> for RequestType {
    fn from(t: RequestTypeDb) -> Self {
        match t {
            RequestTypeDb::Access => Self::Access,
            RequestTypeDb::Export => Self::Export,
            RequestTypeDb::Deletion => Self::Deletion,
            RequestTypeDb::Rectification => Self::Rectification,
            RequestTypeDb::Restriction => Self::Restriction,
            RequestTypeDb::Objection => Self::Objection,
        }
    }
}

/// Database enum for data subject request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "data_subject_request_status", rename_all = "snake_case")]
pub enum RequestStatusDb {
    Pending,
    InProgress,
    Completed,
    Rejected,
    Cancelled,
}

impl std::fmt::Display for RequestStatusDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<RequestStatus> for RequestStatusDb {
    fn from(s: RequestStatus) -> Self {
        match s {
            RequestStatus::Pending => Self::Pending,
            RequestStatus::InProgress => Self::InProgress,
            RequestStatus::Completed => Self::Completed,
            RequestStatus::Rejected => Self::Rejected,
            RequestStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<RequestStatusDb> for RequestStatus {
    fn from(s: RequestStatusDb) -> Self {
        match s {
            RequestStatusDb::Pending => Self::Pending,
            RequestStatusDb::InProgress => Self::InProgress,
            RequestStatusDb::Completed => Self::Completed,
            RequestStatusDb::Rejected => Self::Rejected,
            RequestStatusDb::Cancelled => Self::Cancelled,
        }
    }
}

/// Row of `data_subject_requests`.
#[derive(Debug, Clone, FromRow)]
pub struct DataSubjectRequestEntity {
    pub id: i64,
    pub user_id: i64,
    pub request_type: RequestTypeDb,
    pub status: RequestStatusDb,
    pub description: String,
    pub submitted_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ip_address: String,
    pub assigned_to_admin_id: Option<i64>,
    pub admin_notes: Option<String>,
    pub export_file_path: Option<String>,
    pub export_expires_at: Option<DateTime<Utc>>,
    pub deletion_summary: Option<String>,
    pub retention_summary: Option<String>,
    pub identity_verified: bool,
    pub verification_method: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl DataSubjectRequestEntity {
    /// Converts the row into the domain aggregate with its history loaded.
    pub fn with_history(self, history: Vec<DataSubjectRequestHistoryEntity>) -> DataSubjectRequest {
        let mut request = DataSubjectRequest::from(self);
        request.history = Some(history.into_iter().map(Into::into).collect());
        request
    }
}

impl From<DataSubjectRequestEntity> for DataSubjectRequest {
    /// Converts the row alone; the history is left unloaded.
    fn from(entity: DataSubjectRequestEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            request_type: entity.request_type.into(),
            status: entity.status.into(),
            description: entity.description,
            submitted_at: entity.submitted_at,
            deadline_at: entity.deadline_at,
            completed_at: entity.completed_at,
            ip_address: entity.ip_address,
            assigned_to_admin_id: entity.assigned_to_admin_id,
            admin_notes: entity.admin_notes,
            export_file_path: entity.export_file_path,
            export_expires_at: entity.export_expires_at,
            deletion_summary: entity.deletion_summary,
            retention_summary: entity.retention_summary,
            identity_verified: entity.identity_verified,
            verification_method: entity.verification_method,
            verified_at: entity.verified_at,
            history: None,
        }
    }
}

/// Row of `data_subject_request_history`.
#[derive(Debug, Clone, FromRow)]
pub struct DataSubjectRequestHistoryEntity {
    pub id: i64,
    pub request_id: i64,
    pub action: String,
    pub old_status: Option<RequestStatusDb>,
    pub new_status: Option<RequestStatusDb>,
    pub details: String,
    pub performed_by: String,
    pub performed_by_role: String,
    pub performed_at: DateTime<Utc>,
    pub ip_address: String,
}

impl From<DataSubjectRequestHistoryEntity> for DataSubjectRequestHistory {
    fn from(entity: DataSubjectRequestHistoryEntity) -> Self {
        Self {
            id: entity.id,
            request_id: entity.request_id,
            action: entity.action,
            old_status: entity.old_status.map(Into::into),
            new_status: entity.new_status.map(Into::into),
            details: entity.details,
            performed_by: entity.performed_by,
            performed_by_role: entity.performed_by_role,
            performed_at: entity.performed_at,
            ip_address: entity.ip_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> DataSubjectRequestEntity {
        let now = Utc::now();
        DataSubjectRequestEntity {
            id: 1,
            user_id: 42,
            request_type: RequestTypeDb::Export,
            status: RequestStatusDb::InProgress,
            description: "Export my data".to_string(),
            submitted_at: now,
            deadline_at: now + chrono::Duration::days(30),
            completed_at: None,
            ip_address: "192.0.2.1".to_string(),
            assigned_to_admin_id: Some(3),
            admin_notes: None,
            export_file_path: None,
            export_expires_at: None,
            deletion_summary: None,
            retention_summary: None,
            identity_verified: false,
            verification_method: None,
            verified_at: None,
        }
    }

    fn history_entity(id: i64) -> DataSubjectRequestHistoryEntity {
        DataSubjectRequestHistoryEntity {
            id,
            request_id: 1,
            action: "Created".to_string(),
            old_status: None,
            new_status: Some(RequestStatusDb::Pending),
            details: "Request submitted".to_string(),
            performed_by: "42".to_string(),
            performed_by_role: "User".to_string(),
            performed_at: Utc::now(),
            ip_address: "192.0.2.1".to_string(),
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RequestStatusDb::Pending.to_string(), "pending");
        assert_eq!(RequestStatusDb::InProgress.to_string(), "in_progress");
        assert_eq!(RequestStatusDb::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_type_display() {
        assert_eq!(RequestTypeDb::Export.to_string(), "export");
        assert_eq!(RequestTypeDb::Rectification.to_string(), "rectification");
    }

    #[test]
    fn test_enum_conversion_roundtrip() {
        for request_type in RequestType::ALL {
            assert_eq!(RequestType::from(RequestTypeDb::from(request_type)), request_type);
        }
        let status = RequestStatus::InProgress;
        assert_eq!(RequestStatus::from(RequestStatusDb::from(status)), status);
    }

    #[test]
    fn test_row_conversion_leaves_history_unloaded() {
        let request = DataSubjectRequest::from(entity());
        assert_eq!(request.id, 1);
        assert_eq!(request.request_type, RequestType::Export);
        assert_eq!(request.status, RequestStatus::InProgress);
        assert_eq!(request.assigned_to_admin_id, Some(3));
        assert!(request.history.is_none());
    }

    #[test]
    fn test_with_history_keeps_order() {
        let request = entity().with_history(vec![history_entity(5), history_entity(9)]);
        let history = request.history.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, 5);
        assert_eq!(history[1].id, 9);
        assert_eq!(history[0].new_status, Some(RequestStatus::Pending));
    }

    #[test]
    fn test_with_empty_history_is_loaded() {
        let request = entity().with_history(Vec::new());
        assert_eq!(request.history, Some(Vec::new()));
    }
}
