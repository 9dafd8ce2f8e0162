//! Database-backed integration tests for the data subject request API.
//!
//! These need a Postgres reachable at `TEST_DATABASE_URL` and are skipped
//! when it is not set. Each test works on its own user id, so the tests can
//! share one database and run in parallel.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;

use domain::models::{history_action, DataSubjectRequest, RequestStatus, RequestType};
use domain::services::{Actor, NewHistoryEntry};
use persistence::repositories::{
    CreateDataSubjectRequestInput, DataSubjectRequestRepository, TransitionInput,
};

use common::{
    create_test_app_with_pool, create_test_pool, get, parse_response_body, post_json, send,
    test_config, unique_user_id, ADMIN,
};

const USER_IP: &str = "198.51.100.23";

async fn seed_request(
    repo: &DataSubjectRequestRepository,
    user_id: i64,
    request_type: RequestType,
    submitted_days_ago: i64,
    deadline_in_days: i64,
) -> DataSubjectRequest {
    let now = Utc::now();
    let input = CreateDataSubjectRequestInput {
        user_id,
        request_type,
        description: format!("{} request for user {}", request_type, user_id),
        ip_address: USER_IP.to_string(),
        submitted_at: now - Duration::days(submitted_days_ago),
        deadline_at: now + Duration::days(deadline_in_days),
    };
    repo.create(input, NewHistoryEntry::created(&Actor::user(user_id, USER_IP)))
        .await
        .expect("Failed to seed request")
}

fn move_to(expected_status: RequestStatus, new_status: RequestStatus) -> TransitionInput {
    TransitionInput {
        expected_status,
        new_status,
        completed_at: new_status.is_terminal().then(Utc::now),
        export_file_path: None,
        export_expires_at: None,
        deletion_summary: None,
        retention_summary: None,
    }
}

fn status_entry(old: RequestStatus, new: RequestStatus) -> NewHistoryEntry {
    NewHistoryEntry::status_changed(&Actor::admin(7, "127.0.0.1"), old, new)
}

async fn submit(app: &axum::Router, user_id: i64) -> Value {
    let id = user_id.to_string();
    let response = send(
        app,
        post_json(
            "/api/v1/data-requests",
            &[("X-Actor-Id", id.as_str()), ("X-Forwarded-For", USER_IP)],
            json!({"requestType": "Deletion", "description": "Please erase my account"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    parse_response_body(response).await
}

async fn process(app: &axum::Router, request_id: i64, body: Value) -> (StatusCode, Value) {
    let response = send(
        app,
        post_json(
            &format!("/api/v1/admin/data-requests/{}/process", request_id),
            ADMIN,
            body,
        ),
    )
    .await;
    let status = response.status();
    (status, parse_response_body(response).await)
}

async fn admin_list(app: &axum::Router, query: &str) -> Value {
    let response = send(
        app,
        get(&format!("/api/v1/admin/data-requests?{}", query), ADMIN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "GET ?{query}");
    parse_response_body(response).await
}

async fn history_actions(pool: &PgPool, request_id: i64) -> Vec<String> {
    DataSubjectRequestRepository::new(pool.clone())
        .load_history(request_id)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect()
}

#[tokio::test]
async fn test_full_lifecycle_records_ordered_history() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let app = create_test_app_with_pool(test_config(), pool.clone());
    let user_id = unique_user_id();

    let created = submit(&app, user_id).await;
    let request_id = created["id"].as_i64().unwrap();
    assert_eq!(created["status"], "Pending");
    assert_eq!(created["ipAddress"], USER_IP);
    assert_eq!(created["history"].as_array().unwrap().len(), 1);

    let (status, started) = process(&app, request_id, json!({"action": "StartProcessing"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "InProgress");
    assert!(started["completedAt"].is_null());

    let (status, completed) = process(
        &app,
        request_id,
        json!({"action": "Complete", "deletionSummary": "Account and devices erased"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "Completed");
    assert_eq!(completed["deletionSummary"], "Account and devices erased");

    let id = user_id.to_string();
    let response = send(
        &app,
        get(
            &format!("/api/v1/data-requests/{}", request_id),
            &[("X-Actor-Id", id.as_str())],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;

    assert_eq!(body["status"], "Completed");
    assert!(body["completedAt"].is_string());

    let history = body["history"].as_array().unwrap();
    let actions: Vec<&str> = history.iter().map(|h| h["action"].as_str().unwrap()).collect();
    assert_eq!(actions, ["Created", "StatusChanged", "StatusChanged"]);

    let transitions: Vec<(&Value, &Value)> = history
        .iter()
        .map(|h| (&h["oldStatus"], &h["newStatus"]))
        .collect();
    assert_eq!(transitions[0], (&Value::Null, &json!("Pending")));
    assert_eq!(transitions[1], (&json!("Pending"), &json!("InProgress")));
    assert_eq!(transitions[2], (&json!("InProgress"), &json!("Completed")));

    assert_eq!(history[0]["performedByRole"], "User");
    assert_eq!(history[1]["performedByRole"], "Admin");
    let ids: Vec<i64> = history.iter().map(|h| h["id"].as_i64().unwrap()).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let response = send(
        &app,
        get(
            &format!("/api/v1/admin/data-requests/{}/history", request_id),
            ADMIN,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let admin_history = parse_response_body(response).await;
    assert_eq!(admin_history.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_stale_transition_is_not_applied() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let repo = DataSubjectRequestRepository::new(pool.clone());
    let request = seed_request(&repo, unique_user_id(), RequestType::Access, 0, 30).await;

    let started = repo
        .transition(
            request.id,
            move_to(RequestStatus::Pending, RequestStatus::InProgress),
            status_entry(RequestStatus::Pending, RequestStatus::InProgress),
        )
        .await
        .unwrap();
    assert_eq!(started.unwrap().status, RequestStatus::InProgress);

    // A second writer still believes the request is pending.
    let stale = repo
        .transition(
            request.id,
            move_to(RequestStatus::Pending, RequestStatus::Rejected),
            status_entry(RequestStatus::Pending, RequestStatus::Rejected),
        )
        .await
        .unwrap();
    assert!(stale.is_none());

    let current = repo.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(current.status, RequestStatus::InProgress);
    assert!(current.completed_at.is_none());
    assert_eq!(
        history_actions(&pool, request.id).await,
        ["Created", "StatusChanged"]
    );
}

#[tokio::test]
async fn test_transition_from_closed_request_is_conflict() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let app = create_test_app_with_pool(test_config(), pool.clone());
    let user_id = unique_user_id();

    let created = submit(&app, user_id).await;
    let request_id = created["id"].as_i64().unwrap();

    let id = user_id.to_string();
    let response = send(
        &app,
        post_json(
            &format!("/api/v1/data-requests/{}/cancel", request_id),
            &[("X-Actor-Id", id.as_str())],
            json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = process(&app, request_id, json!({"action": "StartProcessing"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    assert_eq!(
        history_actions(&pool, request_id).await,
        ["Created", "StatusChanged"]
    );
}

#[tokio::test]
async fn test_identity_is_verified_once() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let repo = DataSubjectRequestRepository::new(pool.clone());
    let request = seed_request(&repo, unique_user_id(), RequestType::Export, 0, 30).await;
    let admin = Actor::admin(7, "127.0.0.1");

    let entry = || NewHistoryEntry::new(history_action::IDENTITY_VERIFIED, &admin);
    let first = repo
        .mark_identity_verified(request.id, "passport", entry())
        .await
        .unwrap()
        .unwrap();
    assert!(first.identity_verified);
    assert_eq!(first.verification_method.as_deref(), Some("passport"));

    // A concurrent verifier that read the row before the first update landed.
    let second = repo
        .mark_identity_verified(request.id, "utility bill", entry())
        .await
        .unwrap();
    assert!(second.is_none());

    let current = repo.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(current.verification_method.as_deref(), Some("passport"));
    assert_eq!(current.verified_at, first.verified_at);
    assert_eq!(
        history_actions(&pool, request.id).await,
        ["Created", "IdentityVerified"]
    );

    let app = create_test_app_with_pool(test_config(), pool.clone());
    let response = send(
        &app,
        post_json(
            &format!("/api/v1/admin/data-requests/{}/verify", request.id),
            ADMIN,
            json!({"method": "passport"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_list_filters_and_paginates() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let repo = DataSubjectRequestRepository::new(pool.clone());
    let user_id = unique_user_id();

    // Oldest first: two overdue, one within its deadline, one closed past it.
    let overdue_access = seed_request(&repo, user_id, RequestType::Access, 40, -10).await;
    let overdue_deletion = seed_request(&repo, user_id, RequestType::Deletion, 35, -5).await;
    let current_access = seed_request(&repo, user_id, RequestType::Access, 2, 28).await;
    let closed_export = seed_request(&repo, user_id, RequestType::Export, 1, -1).await;
    for (old, new) in [
        (RequestStatus::Pending, RequestStatus::InProgress),
        (RequestStatus::InProgress, RequestStatus::Completed),
    ] {
        repo.transition(closed_export.id, move_to(old, new), status_entry(old, new))
            .await
            .unwrap()
            .unwrap();
    }

    let ids = |body: &Value| -> Vec<i64> {
        body["requests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    };

    let app = create_test_app_with_pool(test_config(), pool.clone());

    let all = admin_list(&app, &format!("userId={}", user_id)).await;
    assert_eq!(all["pagination"]["total"], 4);
    assert_eq!(
        ids(&all),
        [
            closed_export.id,
            current_access.id,
            overdue_deletion.id,
            overdue_access.id
        ]
    );

    let overdue = admin_list(&app, &format!("userId={}&overdue=true", user_id)).await;
    assert_eq!(overdue["pagination"]["total"], 2);
    assert_eq!(ids(&overdue), [overdue_deletion.id, overdue_access.id]);

    let pending_access = admin_list(
        &app,
        &format!("userId={}&status=Pending&requestType=Access", user_id),
    )
    .await;
    assert_eq!(pending_access["pagination"]["total"], 2);
    assert_eq!(ids(&pending_access), [current_access.id, overdue_access.id]);

    let combined = admin_list(
        &app,
        &format!(
            "userId={}&status=Pending&requestType=Access&overdue=true",
            user_id
        ),
    )
    .await;
    assert_eq!(combined["pagination"]["total"], 1);
    assert_eq!(ids(&combined), [overdue_access.id]);

    let completed = admin_list(&app, &format!("userId={}&status=Completed", user_id)).await;
    assert_eq!(ids(&completed), [closed_export.id]);

    let second_page = admin_list(&app, &format!("userId={}&perPage=3&page=2", user_id)).await;
    assert_eq!(second_page["pagination"]["total"], 4);
    assert_eq!(second_page["pagination"]["page"], 2);
    assert_eq!(second_page["pagination"]["perPage"], 3);
    assert_eq!(second_page["pagination"]["totalPages"], 2);
    assert_eq!(ids(&second_page), [overdue_access.id]);
}

#[tokio::test]
async fn test_history_rows_cannot_be_updated() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let repo = DataSubjectRequestRepository::new(pool.clone());
    let request = seed_request(&repo, unique_user_id(), RequestType::Objection, 0, 30).await;

    let result = sqlx::query(
        "UPDATE data_subject_request_history SET details = 'rewritten' WHERE request_id = $1",
    )
    .bind(request.id)
    .execute(&pool)
    .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("append-only"), "{err}");

    let history = repo.load_history(request.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].details, "Request submitted");
}
