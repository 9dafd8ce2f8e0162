//! Custom Axum extractors.

pub mod actor;
pub mod validated;

pub use actor::{client_ip, AdminActor, UserActor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use validated::ValidatedJson;
