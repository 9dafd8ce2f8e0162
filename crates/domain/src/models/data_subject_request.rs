//! Data subject request domain models.
//!
//! A data subject request (DSR) is a GDPR-style request raised by a user
//! (access, export, deletion, ...). Each request owns an append-only history
//! of the actions recorded against it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::pagination::PaginationInfo;
use shared::validation::{validate_export_path, validate_not_blank};

/// Default compliance deadline, in days after submission.
pub const DEFAULT_DEADLINE_DAYS: i64 = 30;

/// Type of data subject request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    /// Right of access to personal data.
    Access,
    /// Right to data portability (machine-readable export).
    Export,
    /// Right to erasure.
    Deletion,
    /// Right to rectification.
    Rectification,
    /// Right to restriction of processing.
    Restriction,
    /// Right to object to processing.
    Objection,
}

impl RequestType {
    /// All request types, in display order.
    pub const ALL: [RequestType; 6] = [
        Self::Access,
        Self::Export,
        Self::Deletion,
        Self::Rectification,
        Self::Restriction,
        Self::Objection,
    ];
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "Access"),
            Self::Export => write!(f, "Export"),
            Self::Deletion => write!(f, "Deletion"),
            Self::Rectification => write!(f, "Rectification"),
            Self::Restriction => write!(f, "Restriction"),
            Self::Objection => write!(f, "Objection"),
        }
    }
}

/// Lifecycle status of a data subject request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Submitted, awaiting processing.
    Pending,
    /// Being processed by an operator.
    InProgress,
    /// Fulfilled.
    Completed,
    /// Refused by an operator.
    Rejected,
    /// Withdrawn by the requester or an operator.
    Cancelled,
}

impl RequestStatus {
    /// Whether no further action can be taken on a request in this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Completed => write!(f, "Completed"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Action an operator (or the requester) can take on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestAction {
    StartProcessing,
    Complete,
    Reject,
    Cancel,
}

impl std::fmt::Display for RequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartProcessing => write!(f, "start processing"),
            Self::Complete => write!(f, "complete"),
            Self::Reject => write!(f, "reject"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// Labels recorded in `DataSubjectRequestHistory::action`.
pub mod history_action {
    pub const CREATED: &str = "Created";
    pub const STATUS_CHANGED: &str = "StatusChanged";
    pub const IDENTITY_VERIFIED: &str = "IdentityVerified";
    pub const ASSIGNED: &str = "Assigned";
    pub const NOTE_ADDED: &str = "NoteAdded";
}

/// A data subject request together with its (optionally loaded) history.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSubjectRequest {
    pub id: i64,
    pub user_id: i64,
    pub request_type: RequestType,
    pub status: RequestStatus,
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
    /// Chronologically ordered history. `None` when it was not loaded.
    pub history: Option<Vec<DataSubjectRequestHistory>>,
}

impl DataSubjectRequest {
    /// Whether the request is still open past its compliance deadline.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.deadline_at < now
    }
}

/// Compliance deadline for a request submitted at `submitted_at`.
pub fn deadline_after(submitted_at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    submitted_at + Duration::days(days)
}

/// One immutable audit entry recorded against a request.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSubjectRequestHistory {
    pub id: i64,
    pub request_id: i64,
    pub action: String,
    pub old_status: Option<RequestStatus>,
    pub new_status: Option<RequestStatus>,
    pub details: String,
    pub performed_by: String,
    pub performed_by_role: String,
    pub performed_at: DateTime<Utc>,
    pub ip_address: String,
}

/// Transport representation of a data subject request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSubjectRequestDto {
    pub id: i64,
    pub user_id: i64,
    pub request_type: RequestType,
    pub status: RequestStatus,
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
    /// Always present; empty when the source had no history loaded.
    pub history: Vec<DataSubjectRequestHistoryDto>,
}

/// Transport representation of a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSubjectRequestHistoryDto {
    pub id: i64,
    pub request_id: i64,
    pub action: String,
    pub old_status: Option<RequestStatus>,
    pub new_status: Option<RequestStatus>,
    pub details: String,
    pub performed_by: String,
    pub performed_by_role: String,
    pub performed_at: DateTime<Utc>,
    pub ip_address: String,
}

/// Paginated admin listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDataSubjectRequestsResponse {
    pub requests: Vec<DataSubjectRequestDto>,
    pub pagination: PaginationInfo,
}

/// Query parameters for the admin listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDataSubjectRequestsQuery {
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub request_type: Option<RequestType>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub assigned_to_admin_id: Option<i64>,
    /// Only open requests past their deadline.
    #[serde(default)]
    pub overdue: Option<bool>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Status counts for the compliance dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSubjectRequestSummary {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub rejected: i64,
    pub cancelled: i64,
    pub overdue: i64,
}

/// Body of `POST /api/v1/data-requests`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDataSubjectRequestRequest {
    pub request_type: RequestType,
    #[validate(length(max = 2000, message = "Description too long"))]
    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,
}

/// Body of `POST /api/v1/admin/data-requests/:id/process`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDataSubjectRequestRequest {
    pub action: RequestAction,
    /// Free text recorded in the history entry. Required when rejecting.
    #[validate(length(max = 1000, message = "Details too long"))]
    #[serde(default)]
    pub details: Option<String>,
    #[validate(custom(function = "validate_export_path"))]
    #[validate(length(max = 500, message = "Export path too long"))]
    #[serde(default)]
    pub export_file_path: Option<String>,
    #[validate(length(max = 4000, message = "Deletion summary too long"))]
    #[serde(default)]
    pub deletion_summary: Option<String>,
    #[validate(length(max = 4000, message = "Retention summary too long"))]
    #[serde(default)]
    pub retention_summary: Option<String>,
}

/// Body of `POST /api/v1/admin/data-requests/:id/verify`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyIdentityRequest {
    #[validate(length(min = 1, max = 100, message = "Verification method must be 1-100 characters"))]
    pub method: String,
}

/// Body of `POST /api/v1/admin/data-requests/:id/assign`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignDataSubjectRequestRequest {
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub admin_id: i64,
}

/// Body of `POST /api/v1/admin/data-requests/:id/notes`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddAdminNoteRequest {
    #[validate(length(max = 4000, message = "Note too long"))]
    #[validate(custom(function = "validate_not_blank"))]
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_request(status: RequestStatus, deadline_at: DateTime<Utc>) -> DataSubjectRequest {
        let submitted_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        DataSubjectRequest {
            id: 1,
            user_id: 42,
            request_type: RequestType::Access,
            status,
            description: "Please send me my data".to_string(),
            submitted_at,
            deadline_at,
            completed_at: None,
            ip_address: "203.0.113.7".to_string(),
            assigned_to_admin_id: None,
            admin_notes: None,
            export_file_path: None,
            export_expires_at: None,
            deletion_summary: None,
            retention_summary: None,
            identity_verified: false,
            verification_method: None,
            verified_at: None,
            history: None,
        }
    }

    #[test]
    fn test_request_type_serialization() {
        let json = serde_json::to_string(&RequestType::Export).unwrap();
        assert_eq!(json, "\"Export\"");
        let back: RequestType = serde_json::from_str("\"Deletion\"").unwrap();
        assert_eq!(back, RequestType::Deletion);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"InProgress\"");
    }

    #[test]
    fn test_display_matches_wire_format() {
        for request_type in RequestType::ALL {
            let json = serde_json::to_string(&request_type).unwrap();
            assert_eq!(json, format!("\"{}\"", request_type));
        }
        assert_eq!(RequestStatus::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::InProgress.is_terminal());
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_default_deadline() {
        let submitted = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let deadline = deadline_after(submitted, DEFAULT_DEADLINE_DAYS);
        assert_eq!(deadline, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_is_overdue() {
        let deadline = Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap();
        let after = deadline + Duration::seconds(1);
        let before = deadline - Duration::days(1);

        assert!(sample_request(RequestStatus::Pending, deadline).is_overdue(after));
        assert!(sample_request(RequestStatus::InProgress, deadline).is_overdue(after));
        assert!(!sample_request(RequestStatus::Pending, deadline).is_overdue(before));
        assert!(!sample_request(RequestStatus::Completed, deadline).is_overdue(after));
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateDataSubjectRequestRequest {
            request_type: RequestType::Export,
            description: "Export everything".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_blank_description() {
        let request = CreateDataSubjectRequestRequest {
            request_type: RequestType::Export,
            description: "   ".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_deserialization() {
        let request: CreateDataSubjectRequestRequest = serde_json::from_str(
            r#"{"requestType":"Deletion","description":"Delete my account"}"#,
        )
        .unwrap();
        assert_eq!(request.request_type, RequestType::Deletion);
    }

    #[test]
    fn test_process_request_rejects_escaping_export_path() {
        let request = ProcessDataSubjectRequestRequest {
            action: RequestAction::Complete,
            details: None,
            export_file_path: Some("../../etc/shadow".to_string()),
            deletion_summary: None,
            retention_summary: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_verify_request_requires_method() {
        let request = VerifyIdentityRequest {
            method: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_assign_request_requires_positive_admin_id() {
        let request: AssignDataSubjectRequestRequest =
            serde_json::from_str(r#"{"adminId":0}"#).unwrap();
        assert!(request.validate().is_err());

        let request: AssignDataSubjectRequestRequest =
            serde_json::from_str(r#"{"adminId":7}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_list_query_deserialization() {
        let query: ListDataSubjectRequestsQuery =
            serde_json::from_str(r#"{"status":"Pending","perPage":10}"#).unwrap();
        assert_eq!(query.status, Some(RequestStatus::Pending));
        assert_eq!(query.per_page, Some(10));
        assert!(query.request_type.is_none());
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&RequestAction::StartProcessing).unwrap();
        assert_eq!(json, "\"StartProcessing\"");
    }
}
