//! Per-statement hooks for query timing and diagnostics.

use crate::error::RepoError;
use log::{info, warn};
use std::time::Duration;
use uuid::Uuid;

/// One finished statement, reported after execution.
#[derive(Debug)]
pub struct QueryEvent<'a> {
    pub session_id: Uuid,
    pub sql: &'a str,
    pub param_count: usize,
    pub duration: Duration,
    pub error: Option<&'a RepoError>,
}

/// Observer invoked after every statement a session runs, including
/// `BEGIN`, `COMMIT` and `ROLLBACK`.
pub trait QueryHook: Send + Sync {
    fn after_query(&self, event: &QueryEvent<'_>);
}

/// Logs statements with their duration.
///
/// Without a threshold every statement is logged at `info`. With a threshold
/// only statements at or over it are logged, at `warn`.
#[derive(Debug, Clone, Default)]
pub struct SlowQueryLogger {
    threshold: Option<Duration>,
}

impl SlowQueryLogger {
    pub fn new(threshold: Option<Duration>) -> Self {
        if let Some(threshold) = threshold {
            info!(
                "event=query_log module=db status=enabled over_ms={}",
                threshold.as_millis()
            );
        }
        Self { threshold }
    }
}

impl QueryHook for SlowQueryLogger {
    fn after_query(&self, event: &QueryEvent<'_>) {
        let sql = single_line(event.sql);
        let error = event
            .error
            .map(|err| err.to_string())
            .unwrap_or_default();
        match self.threshold {
            Some(threshold) if event.duration < threshold => {}
            Some(_) => warn!(
                "event=db_query module=db status=slow session_id={} duration_ms={} params={} sql={} error={}",
                event.session_id,
                event.duration.as_millis(),
                event.param_count,
                sql,
                error
            ),
            None => info!(
                "event=db_query module=db status={} session_id={} duration_ms={} params={} sql={} error={}",
                if event.error.is_some() { "error" } else { "ok" },
                event.session_id,
                event.duration.as_millis(),
                event.param_count,
                sql,
                error
            ),
        }
    }
}

fn single_line(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
