//! Data subject request route handlers for administrators.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use domain::models::{
    history_action, AddAdminNoteRequest, AssignDataSubjectRequestRequest, DataSubjectRequest,
    ListDataSubjectRequestsQuery, ListDataSubjectRequestsResponse,
    ProcessDataSubjectRequestRequest, RequestAction, RequestStatus, RequestType,
    VerifyIdentityRequest,
};
use domain::services::{ensure_open, next_status, DataSubjectRequestMapper, NewHistoryEntry};
use persistence::repositories::{
    DataSubjectRequestFilter, DataSubjectRequestRepository, TransitionInput,
};
use shared::pagination::PageRequest;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminActor, ValidatedJson};
use crate::middleware::metrics::record_status_transition;
use crate::routes::data_subject_requests::{concurrently_modified, not_found};

/// Create the admin data subject request router.
///
/// Routes:
/// - GET /api/v1/admin/data-requests - Filtered, paginated list
/// - GET /api/v1/admin/data-requests/summary - Status counts
/// - GET /api/v1/admin/data-requests/:request_id - Request with history
/// - GET /api/v1/admin/data-requests/:request_id/history - History only
/// - POST /api/v1/admin/data-requests/:request_id/process - Apply an action
/// - POST /api/v1/admin/data-requests/:request_id/verify - Record identity verification
/// - POST /api/v1/admin/data-requests/:request_id/assign - Assign to an admin
/// - POST /api/v1/admin/data-requests/:request_id/notes - Set admin notes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests))
        .route("/summary", get(get_summary))
        .route("/:request_id", get(get_request))
        .route("/:request_id/history", get(get_history))
        .route("/:request_id/process", post(process_request))
        .route("/:request_id/verify", post(verify_identity))
        .route("/:request_id/assign", post(assign_request))
        .route("/:request_id/notes", post(add_admin_note))
}

/// GET /api/v1/admin/data-requests
#[axum::debug_handler(state = AppState)]
async fn list_requests(
    State(state): State<AppState>,
    _admin: AdminActor,
    Query(query): Query<ListDataSubjectRequestsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());

    let filter = DataSubjectRequestFilter {
        status: query.status,
        request_type: query.request_type,
        user_id: query.user_id,
        assigned_to_admin_id: query.assigned_to_admin_id,
        overdue_only: query.overdue.unwrap_or(false),
    };
    let page = PageRequest::new(query.page, query.per_page);

    let (requests, total) = repo.list(&filter, page).await?;

    Ok(Json(ListDataSubjectRequestsResponse {
        requests: DataSubjectRequestMapper::to_dto_list(&requests),
        pagination: page.info(total),
    }))
}

/// GET /api/v1/admin/data-requests/summary
#[axum::debug_handler(state = AppState)]
async fn get_summary(
    State(state): State<AppState>,
    _admin: AdminActor,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    Ok(Json(repo.counts().await?))
}

/// GET /api/v1/admin/data-requests/:request_id
#[axum::debug_handler(state = AppState)]
async fn get_request(
    State(state): State<AppState>,
    _admin: AdminActor,
    Path(request_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let request = repo.find_by_id(request_id).await?.ok_or_else(not_found)?;

    Ok(Json(DataSubjectRequestMapper::to_dto(&request)))
}

/// GET /api/v1/admin/data-requests/:request_id/history
///
/// Unknown ids yield an empty list.
#[axum::debug_handler(state = AppState)]
async fn get_history(
    State(state): State<AppState>,
    _admin: AdminActor,
    Path(request_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let history = repo.load_history(request_id).await?;

    Ok(Json(
        history
            .iter()
            .map(DataSubjectRequestMapper::history_to_dto)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/v1/admin/data-requests/:request_id/process
#[axum::debug_handler(state = AppState)]
async fn process_request(
    State(state): State<AppState>,
    admin: AdminActor,
    Path(request_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<ProcessDataSubjectRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let request = repo.find_by_id(request_id).await?.ok_or_else(not_found)?;

    let new_status = next_status(request.status, body.action)?;
    let input = build_transition(
        &request,
        &body,
        new_status,
        Utc::now(),
        state.config.compliance.export_link_days,
    )?;

    let mut entry = NewHistoryEntry::status_changed(&admin.actor, request.status, new_status);
    if let Some(details) = non_blank(body.details.as_deref()) {
        entry = entry.with_details(details);
    }

    let updated = repo
        .transition(request_id, input, entry)
        .await?
        .ok_or_else(concurrently_modified)?;

    record_status_transition(new_status);

    info!(
        request_id = updated.id,
        admin_id = admin.admin_id,
        action = %body.action,
        old_status = %request.status,
        new_status = %new_status,
        "Processed data subject request"
    );

    Ok(Json(DataSubjectRequestMapper::to_dto(&updated)))
}

/// POST /api/v1/admin/data-requests/:request_id/verify
#[axum::debug_handler(state = AppState)]
async fn verify_identity(
    State(state): State<AppState>,
    admin: AdminActor,
    Path(request_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<VerifyIdentityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let request = repo.find_by_id(request_id).await?.ok_or_else(not_found)?;

    ensure_open(request.status)?;
    if request.identity_verified {
        return Err(ApiError::Conflict(
            "Requester identity is already verified".to_string(),
        ));
    }

    let method = body.method.trim();
    let entry = NewHistoryEntry::new(history_action::IDENTITY_VERIFIED, &admin.actor)
        .with_details(format!("Identity verified via {}", method));

    let updated = repo
        .mark_identity_verified(request_id, method, entry)
        .await?
        .ok_or_else(concurrently_modified)?;

    info!(
        request_id = updated.id,
        admin_id = admin.admin_id,
        method = %method,
        "Verified data subject identity"
    );

    Ok(Json(DataSubjectRequestMapper::to_dto(&updated)))
}

/// POST /api/v1/admin/data-requests/:request_id/assign
#[axum::debug_handler(state = AppState)]
async fn assign_request(
    State(state): State<AppState>,
    admin: AdminActor,
    Path(request_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<AssignDataSubjectRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let request = repo.find_by_id(request_id).await?.ok_or_else(not_found)?;

    ensure_open(request.status)?;

    let entry = NewHistoryEntry::new(history_action::ASSIGNED, &admin.actor)
        .with_details(assignment_details(request.assigned_to_admin_id, body.admin_id));

    let updated = repo
        .assign(request_id, body.admin_id, entry)
        .await?
        .ok_or_else(concurrently_modified)?;

    info!(
        request_id = updated.id,
        admin_id = admin.admin_id,
        assignee = body.admin_id,
        "Assigned data subject request"
    );

    Ok(Json(DataSubjectRequestMapper::to_dto(&updated)))
}

/// POST /api/v1/admin/data-requests/:request_id/notes
#[axum::debug_handler(state = AppState)]
async fn add_admin_note(
    State(state): State<AppState>,
    admin: AdminActor,
    Path(request_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<AddAdminNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let note = body.note.trim();
    let entry = NewHistoryEntry::new(history_action::NOTE_ADDED, &admin.actor)
        .with_details("Admin notes updated");

    let updated = repo
        .set_admin_notes(request_id, note, entry)
        .await?
        .ok_or_else(not_found)?;

    info!(
        request_id = updated.id,
        admin_id = admin.admin_id,
        "Updated data subject request notes"
    );

    Ok(Json(DataSubjectRequestMapper::to_dto(&updated)))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn assignment_details(previous: Option<i64>, assignee: i64) -> String {
    match previous {
        Some(previous) if previous != assignee => {
            format!("Reassigned from admin {} to admin {}", previous, assignee)
        }
        _ => format!("Assigned to admin {}", assignee),
    }
}

/// Builds the update for an admin action.
///
/// Rejections must carry details. Result fields are only accepted when
/// completing, and an export path only for export requests.
fn build_transition(
    request: &DataSubjectRequest,
    body: &ProcessDataSubjectRequestRequest,
    new_status: RequestStatus,
    now: DateTime<Utc>,
    export_link_days: i64,
) -> Result<TransitionInput, ApiError> {
    if body.action == RequestAction::Reject && non_blank(body.details.as_deref()).is_none() {
        return Err(ApiError::Validation(
            "details: a reason is required when rejecting a request".to_string(),
        ));
    }

    let has_results = body.export_file_path.is_some()
        || body.deletion_summary.is_some()
        || body.retention_summary.is_some();
    if has_results && body.action != RequestAction::Complete {
        return Err(ApiError::Validation(
            "Result fields can only be set when completing a request".to_string(),
        ));
    }

    if body.export_file_path.is_some() && request.request_type != RequestType::Export {
        return Err(ApiError::Validation(
            "exportFilePath: only applies to export requests".to_string(),
        ));
    }

    let export_file_path = non_blank(body.export_file_path.as_deref()).map(str::to_string);
    let export_expires_at = export_file_path
        .as_ref()
        .map(|_| now + Duration::days(export_link_days));

    Ok(TransitionInput {
        expected_status: request.status,
        new_status,
        completed_at: new_status.is_terminal().then_some(now),
        export_file_path,
        export_expires_at,
        deletion_summary: non_blank(body.deletion_summary.as_deref()).map(str::to_string),
        retention_summary: non_blank(body.retention_summary.as_deref()).map(str::to_string),
    })
}
