//! Domain services for Privacy Desk.
//!
//! Services contain logic that operates on domain models.

pub mod lifecycle;
pub mod request_mapper;

pub use lifecycle::{ensure_open, next_status, Actor, ActorRole, LifecycleError, NewHistoryEntry};
pub use request_mapper::DataSubjectRequestMapper;
