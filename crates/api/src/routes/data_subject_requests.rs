//! Data subject request route handlers for end users.
//!
//! A user can only see and cancel their own requests.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::info;

use domain::models::{
    deadline_after, CreateDataSubjectRequestRequest, RequestAction, RequestStatus,
};
use domain::services::{next_status, DataSubjectRequestMapper, NewHistoryEntry};
use persistence::repositories::{
    CreateDataSubjectRequestInput, DataSubjectRequestRepository, TransitionInput,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{UserActor, ValidatedJson};
use crate::middleware::metrics::{record_request_created, record_status_transition};

/// Create the user data subject request router.
///
/// Routes:
/// - POST /api/v1/data-requests - Submit a request
/// - GET /api/v1/data-requests - List own requests
/// - GET /api/v1/data-requests/:request_id - Get own request with history
/// - POST /api/v1/data-requests/:request_id/cancel - Cancel own request
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_own_requests).post(create_request))
        .route("/:request_id", get(get_own_request))
        .route("/:request_id/cancel", post(cancel_own_request))
}

pub(crate) fn not_found() -> ApiError {
    ApiError::NotFound("Data subject request not found".to_string())
}

pub(crate) fn concurrently_modified() -> ApiError {
    ApiError::Conflict("Data subject request was modified concurrently".to_string())
}

/// Submit a new data subject request.
///
/// POST /api/v1/data-requests
#[axum::debug_handler(state = AppState)]
async fn create_request(
    State(state): State<AppState>,
    user: UserActor,
    ValidatedJson(request): ValidatedJson<CreateDataSubjectRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());

    let submitted_at = Utc::now();
    let input = CreateDataSubjectRequestInput {
        user_id: user.user_id,
        request_type: request.request_type,
        description: request.description.trim().to_string(),
        ip_address: user.actor.ip_address.clone(),
        submitted_at,
        deadline_at: deadline_after(submitted_at, state.config.compliance.deadline_days),
    };

    let created = repo
        .create(input, NewHistoryEntry::created(&user.actor))
        .await?;

    record_request_created(created.request_type);

    info!(
        request_id = created.id,
        user_id = created.user_id,
        request_type = %created.request_type,
        deadline_at = %created.deadline_at,
        "Created data subject request"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataSubjectRequestMapper::to_dto(&created)),
    ))
}

/// List the caller's requests, newest first.
///
/// GET /api/v1/data-requests
#[axum::debug_handler(state = AppState)]
async fn list_own_requests(
    State(state): State<AppState>,
    user: UserActor,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let requests = repo.list_for_user(user.user_id).await?;

    Ok(Json(DataSubjectRequestMapper::to_dto_list(&requests)))
}

/// Get one of the caller's requests with its history.
///
/// GET /api/v1/data-requests/:request_id
#[axum::debug_handler(state = AppState)]
async fn get_own_request(
    State(state): State<AppState>,
    user: UserActor,
    Path(request_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let request = repo
        .find_by_id_for_user(user.user_id, request_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(DataSubjectRequestMapper::to_dto(&request)))
}

/// Cancel one of the caller's open requests.
///
/// POST /api/v1/data-requests/:request_id/cancel
#[axum::debug_handler(state = AppState)]
async fn cancel_own_request(
    State(state): State<AppState>,
    user: UserActor,
    Path(request_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = DataSubjectRequestRepository::new(state.pool.clone());
    let request = repo
        .find_by_id_for_user(user.user_id, request_id)
        .await?
        .ok_or_else(not_found)?;

    let new_status = next_status(request.status, RequestAction::Cancel)?;
    let input = cancel_transition(request.status, new_status);
    let entry = NewHistoryEntry::status_changed(&user.actor, request.status, new_status)
        .with_details("Cancelled by requester");

    let cancelled = repo
        .transition(request_id, input, entry)
        .await?
        .ok_or_else(concurrently_modified)?;

    record_status_transition(new_status);

    info!(
        request_id = cancelled.id,
        user_id = user.user_id,
        previous_status = %request.status,
        "Data subject request cancelled by requester"
    );

    Ok(Json(DataSubjectRequestMapper::to_dto(&cancelled)))
}

fn cancel_transition(current: RequestStatus, new_status: RequestStatus) -> TransitionInput {
    TransitionInput {
        expected_status: current,
        new_status,
        completed_at: Some(Utc::now()),
        export_file_path: None,
        export_expires_at: None,
        deletion_summary: None,
        retention_summary: None,
    }
}
