//! Projection of data subject requests into transport DTOs.
//!
//! The mapper is a pure structural copy: no validation, no derived fields,
//! no side effects. It reads its input through shared references and never
//! holds on to it.

use crate::models::{
    DataSubjectRequest, DataSubjectRequestDto, DataSubjectRequestHistory,
    DataSubjectRequestHistoryDto,
};

/// Maps data subject requests and their history into DTOs.
pub struct DataSubjectRequestMapper;

impl DataSubjectRequestMapper {
    /// Maps one request, including its history in source order.
    ///
    /// A request whose history was never loaded maps to an empty history.
    pub fn to_dto(request: &DataSubjectRequest) -> DataSubjectRequestDto {
        let history = match &request.history {
            Some(entries) => entries.iter().map(Self::history_to_dto).collect(),
            None => Vec::new(),
        };

        DataSubjectRequestDto {
            id: request.id,
            user_id: request.user_id,
            request_type: request.request_type,
            status: request.status,
            description: request.description.clone(),
            submitted_at: request.submitted_at,
            deadline_at: request.deadline_at,
            completed_at: request.completed_at,
            ip_address: request.ip_address.clone(),
            assigned_to_admin_id: request.assigned_to_admin_id,
            admin_notes: request.admin_notes.clone(),
            export_file_path: request.export_file_path.clone(),
            export_expires_at: request.export_expires_at,
            deletion_summary: request.deletion_summary.clone(),
            retention_summary: request.retention_summary.clone(),
            identity_verified: request.identity_verified,
            verification_method: request.verification_method.clone(),
            verified_at: request.verified_at,
            history,
        }
    }

    /// Maps one history entry.
    pub fn history_to_dto(entry: &DataSubjectRequestHistory) -> DataSubjectRequestHistoryDto {
        DataSubjectRequestHistoryDto {
            id: entry.id,
            request_id: entry.request_id,
            action: entry.action.clone(),
            old_status: entry.old_status,
            new_status: entry.new_status,
            details: entry.details.clone(),
            performed_by: entry.performed_by.clone(),
            performed_by_role: entry.performed_by_role.clone(),
            performed_at: entry.performed_at,
            ip_address: entry.ip_address.clone(),
        }
    }

    /// Maps a sequence of requests, preserving order.
    pub fn to_dto_list<'a, I>(requests: I) -> Vec<DataSubjectRequestDto>
    where
        I: IntoIterator<Item = &'a DataSubjectRequest>,
    {
        requests.into_iter().map(Self::to_dto).collect()
    }
}

impl From<&DataSubjectRequest> for DataSubjectRequestDto {
    fn from(request: &DataSubjectRequest) -> Self {
        DataSubjectRequestMapper::to_dto(request)
    }
}

impl From<&DataSubjectRequestHistory> for DataSubjectRequestHistoryDto {
    fn from(entry: &DataSubjectRequestHistory) -> Self {
        DataSubjectRequestMapper::history_to_dto(entry)
    }
}
