//! Database metrics.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Histogram recording how long named queries take.
pub const QUERY_DURATION_METRIC: &str = "database_query_duration_seconds";

/// Records pool size gauges (`database_connections_{active,idle,total}`).
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one query and records it under [`QUERY_DURATION_METRIC`].
///
/// ```ignore
/// let timer = QueryTimer::new("dsr_find_by_id");
/// let row = sqlx::query_as::<_, DataSubjectRequestEntity>(..).fetch_optional(&pool).await?;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since the timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn record(self) {
        histogram!(QUERY_DURATION_METRIC, "query" => self.query_name).record(self.elapsed_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_name() {
        let timer = QueryTimer::new("dsr_list");
        assert_eq!(timer.query_name, "dsr_list");
    }

    #[test]
    fn test_query_timer_elapsed_is_monotonic() {
        let timer = QueryTimer::new("dsr_list");
        let first = timer.elapsed_secs();
        let second = timer.elapsed_secs();
        assert!(second >= first);
        assert!(first >= 0.0);
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        QueryTimer::new("dsr_find_by_id").record();
    }
}
