//! Privacy policy route handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use tracing::info;

use domain::models::{CreatePrivacyPolicyRequest, PrivacyPolicyDto};
use persistence::repositories::{CreatePrivacyPolicyInput, PrivacyPolicyRepository};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminActor, ValidatedJson};

/// Public router.
///
/// Routes:
/// - GET /api/v1/privacy-policy - Policy currently in effect
pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(get_current_policy))
}

/// Admin router.
///
/// Routes:
/// - GET /api/v1/admin/privacy-policies - All versions
/// - POST /api/v1/admin/privacy-policies - Publish a version
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/", get(list_policies).post(create_policy))
}

/// GET /api/v1/privacy-policy
#[axum::debug_handler(state = AppState)]
async fn get_current_policy(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let repo = PrivacyPolicyRepository::new(state.pool.clone());
    let policy = repo
        .current()
        .await?
        .ok_or_else(|| ApiError::NotFound("No privacy policy is in effect".to_string()))?;

    Ok(Json(PrivacyPolicyDto::from(&policy)))
}

/// GET /api/v1/admin/privacy-policies
#[axum::debug_handler(state = AppState)]
async fn list_policies(
    State(state): State<AppState>,
    _admin: AdminActor,
) -> Result<impl IntoResponse, ApiError> {
    let repo = PrivacyPolicyRepository::new(state.pool.clone());
    let policies = repo.list().await?;

    Ok(Json(
        policies.iter().map(PrivacyPolicyDto::from).collect::<Vec<_>>(),
    ))
}

/// POST /api/v1/admin/privacy-policies
#[axum::debug_handler(state = AppState)]
async fn create_policy(
    State(state): State<AppState>,
    admin: AdminActor,
    ValidatedJson(request): ValidatedJson<CreatePrivacyPolicyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = PrivacyPolicyRepository::new(state.pool.clone());
    let input = CreatePrivacyPolicyInput {
        version: request.version.clone(),
        effective_date: request.effective_date.unwrap_or_else(Utc::now),
        content_html: request.content_html,
    };

    let policy = repo.create(input).await.map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict(format!(
            "Privacy policy version {} already exists",
            request.version
        )),
        other => other,
    })?;

    info!(
        admin_id = admin.admin_id,
        version = %policy.version,
        effective_date = %policy.effective_date,
        "Published privacy policy"
    );

    Ok((StatusCode::CREATED, Json(PrivacyPolicyDto::from(&policy))))
}
