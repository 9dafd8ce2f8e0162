//! Rate limiting middleware.
//!
//! Limits how fast a single client can hit the user request endpoints.
//! Clients are keyed by their forwarded IP address.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::client_ip;
use crate::middleware::trace_id::get_request_id;

/// Stale client keys are swept after this many checks.
pub const PURGE_EVERY: u64 = 1024;

type ClientLimiter<C> =
    RateLimiter<String, DashMapStateStore<String>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Per-client rate limiter shared across all requests.
///
/// Every client address gets its own key, so keys whose quota has fully
/// replenished are dropped periodically to keep memory bounded.
pub struct RateLimiterState<C: Clock = DefaultClock> {
    limiter: ClientLimiter<C>,
    clock: C,
    rate_limit_per_minute: u32,
    checks: AtomicU64,
}

impl RateLimiterState {
    /// Returns `None` when the limit is zero, which disables rate limiting.
    pub fn new(rate_limit_per_minute: u32) -> Option<Self> {
        Self::with_clock(rate_limit_per_minute, DefaultClock::default())
    }
}

impl<C: Clock + Clone> RateLimiterState<C> {
    pub fn with_clock(rate_limit_per_minute: u32, clock: C) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiter: RateLimiter::dashmap_with_clock(Quota::per_minute(per_minute), clock.clone()),
            clock,
            rate_limit_per_minute,
            checks: AtomicU64::new(0),
        })
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Number of client keys currently held by the limiter.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Check if a request from the given client should be allowed.
    /// Returns the number of seconds to wait when it is not, minimum 1.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        let result = self
            .limiter
            .check_key(&client.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()).as_secs().max(1));

        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % PURGE_EVERY == 0 {
            self.purge_stale();
        }

        result
    }

    /// Drop every client whose quota has fully replenished.
    pub fn purge_stale(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(
            before,
            after = self.limiter.len(),
            "Purged stale rate limiter keys"
        );
    }
}

impl<C: Clock> std::fmt::Debug for RateLimiterState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_clients", &self.limiter.len())
            .finish()
    }
}

/// Middleware that applies rate limiting per client IP.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(rate_limiter) = state.rate_limiter.as_deref() {
        let client = client_ip(req.headers());
        if let Err(retry_after_secs) = rate_limiter.check(&client) {
            warn!(
                request_id = %get_request_id(req.extensions()),
                client = %client,
                limit = rate_limiter.rate_limit_per_minute(),
                "Rate limit exceeded"
            );
            return ApiError::RateLimited { retry_after_secs }.into_response();
        }
    }

    next.run(req).await
}
