//! Session configuration.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Connection settings for one store session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Number of connections the caller intends to pool behind this config.
    ///
    /// The distributed mutex only accepts `1`.
    pub pool_size: u32,
    /// How long a statement waits on a locked database file.
    pub busy_timeout_ms: u64,
    /// Installs a [`SlowQueryLogger`](super::SlowQueryLogger) on open.
    pub log_queries: bool,
    /// With `log_queries`, only statements at or over this duration are logged.
    pub slow_query_threshold_ms: Option<u64>,
    /// Free-form name reported in session log lines.
    pub application_name: String,
}

impl StoreConfig {
    /// Config for a database file with default settings.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn slow_query_threshold(&self) -> Option<Duration> {
        self.slow_query_threshold_ms.map(Duration::from_millis)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: 1,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_queries: false,
            slow_query_threshold_ms: None,
            application_name: "storekit".to_string(),
        }
    }
}
