//! Data subject request lifecycle rules and history entry construction.

use thiserror::Error;

use crate::models::{history_action, RequestAction, RequestStatus};

/// Errors raised by lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Invalid state transition: cannot {action} a {current} request")]
    InvalidTransition {
        current: RequestStatus,
        action: RequestAction,
    },

    #[error("Request is already {0}")]
    AlreadyClosed(RequestStatus),
}

/// Resolves the status a request moves to when `action` is applied.
pub fn next_status(
    current: RequestStatus,
    action: RequestAction,
) -> Result<RequestStatus, LifecycleError> {
    match (current, action) {
        (RequestStatus::Pending, RequestAction::StartProcessing) => Ok(RequestStatus::InProgress),
        (RequestStatus::Pending, RequestAction::Reject) => Ok(RequestStatus::Rejected),
        (RequestStatus::Pending, RequestAction::Cancel) => Ok(RequestStatus::Cancelled),
        (RequestStatus::InProgress, RequestAction::Complete) => Ok(RequestStatus::Completed),
        (RequestStatus::InProgress, RequestAction::Reject) => Ok(RequestStatus::Rejected),
        (RequestStatus::InProgress, RequestAction::Cancel) => Ok(RequestStatus::Cancelled),
        (current, _) if current.is_terminal() => Err(LifecycleError::AlreadyClosed(current)),
        (current, action) => Err(LifecycleError::InvalidTransition { current, action }),
    }
}

/// Fails when the request can no longer be modified.
pub fn ensure_open(current: RequestStatus) -> Result<(), LifecycleError> {
    if current.is_terminal() {
        Err(LifecycleError::AlreadyClosed(current))
    } else {
        Ok(())
    }
}

/// Role of whoever performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    User,
    Admin,
    System,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
            Self::System => "System",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an action, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
    pub ip_address: String,
}

impl Actor {
    pub fn user(user_id: i64, ip_address: impl Into<String>) -> Self {
        Self {
            id: user_id.to_string(),
            role: ActorRole::User,
            ip_address: ip_address.into(),
        }
    }

    pub fn admin(admin_id: i64, ip_address: impl Into<String>) -> Self {
        Self {
            id: admin_id.to_string(),
            role: ActorRole::Admin,
            ip_address: ip_address.into(),
        }
    }
}

/// A history entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub action: String,
    pub old_status: Option<RequestStatus>,
    pub new_status: Option<RequestStatus>,
    pub details: String,
    pub performed_by: String,
    pub performed_by_role: String,
    pub ip_address: String,
}

impl NewHistoryEntry {
    /// Starts an entry for `action` performed by `actor`.
    pub fn new(action: impl Into<String>, actor: &Actor) -> Self {
        Self {
            action: action.into(),
            old_status: None,
            new_status: None,
            details: String::new(),
            performed_by: actor.id.clone(),
            performed_by_role: actor.role.as_str().to_string(),
            ip_address: actor.ip_address.clone(),
        }
    }

    /// Entry recorded when a request is submitted.
    pub fn created(actor: &Actor) -> Self {
        Self::new(history_action::CREATED, actor)
            .with_transition(None, Some(RequestStatus::Pending))
            .with_details("Request submitted")
    }

    /// Entry recorded for a status change.
    pub fn status_changed(actor: &Actor, old: RequestStatus, new: RequestStatus) -> Self {
        Self::new(history_action::STATUS_CHANGED, actor)
            .with_transition(Some(old), Some(new))
            .with_details(format!("Status changed from {} to {}", old, new))
    }

    pub fn with_transition(
        mut self,
        old_status: Option<RequestStatus>,
        new_status: Option<RequestStatus>,
    ) -> Self {
        self.old_status = old_status;
        self.new_status = new_status;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}
