//! Caller identity extractors.
//!
//! Authentication happens upstream. The gateway forwards the caller's id
//! and role in `X-Actor-Id` and `X-Actor-Role`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use domain::services::Actor;

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";
const REAL_IP_HEADER: &str = "X-Real-IP";
const ADMIN_ROLE: &str = "admin";

/// Best-effort client address: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            headers
                .get(REAL_IP_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .unwrap_or("unknown")
        .to_string()
}

fn actor_id(headers: &HeaderMap) -> Result<i64, ApiError> {
    let raw = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing X-Actor-Id header".to_string()))?;

    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Unauthorized("Invalid X-Actor-Id header".to_string()))
}

fn is_admin(headers: &HeaderMap) -> bool {
    headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|role| role.trim().eq_ignore_ascii_case(ADMIN_ROLE))
        .unwrap_or(false)
}

/// The end user a request is made on behalf of.
#[derive(Debug, Clone)]
pub struct UserActor {
    pub user_id: i64,
    pub actor: Actor,
}

#[async_trait]
impl<S> FromRequestParts<S> for UserActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = actor_id(&parts.headers)?;
        Ok(Self {
            user_id,
            actor: Actor::user(user_id, client_ip(&parts.headers)),
        })
    }
}

/// An administrator acting on the request queue.
#[derive(Debug, Clone)]
pub struct AdminActor {
    pub admin_id: i64,
    pub actor: Actor,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin_id = actor_id(&parts.headers)?;
        if !is_admin(&parts.headers) {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self {
            admin_id,
            actor: Actor::admin(admin_id, client_ip(&parts.headers)),
        })
    }
}
