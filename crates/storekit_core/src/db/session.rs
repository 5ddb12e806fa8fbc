//! Dedicated store session.
//!
//! # Invariants
//! - A session owns exactly one connection for its whole lifetime.
//! - Every statement is timed and reported to the installed hook.
//! - A session id is generated on open and never reused.

use super::executor::Executor;
use super::hook::{QueryEvent, QueryHook, SlowQueryLogger};
use super::open::open_connection;
use super::StoreConfig;
use crate::error::RepoResult;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One exclusively owned store connection.
pub struct Session {
    conn: Connection,
    id: Uuid,
    config: StoreConfig,
    hook: Option<Arc<dyn QueryHook>>,
}

impl Session {
    /// Opens a session as described by `config`.
    pub fn open(config: &StoreConfig) -> RepoResult<Self> {
        let conn = open_connection(config)?;
        let hook = if config.log_queries {
            let logger = SlowQueryLogger::new(config.slow_query_threshold());
            Some(Arc::new(logger) as Arc<dyn QueryHook>)
        } else {
            None
        };
        let id = Uuid::new_v4();
        debug!(
            "event=session_open module=db status=ok session_id={} app={}",
            id, config.application_name
        );

        Ok(Self {
            conn,
            id,
            config: config.clone(),
            hook,
        })
    }

    /// Opens a private in-memory session with default settings.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Replaces the statement hook.
    pub fn with_hook(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Overrides the configured busy timeout; zero makes a locked file fail
    /// immediately.
    pub(crate) fn set_busy_timeout(&self, timeout: Duration) -> RepoResult<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    pub(crate) fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    pub(crate) fn run<T>(
        &self,
        sql: &str,
        param_count: usize,
        op: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = op(&self.conn);
        if let Some(hook) = self.hook.as_deref() {
            hook.after_query(&QueryEvent {
                session_id: self.id,
                sql,
                param_count,
                duration: started_at.elapsed(),
                error: result.as_ref().err(),
            });
        }
        result
    }

    pub(crate) fn run_execute(&self, sql: &str, params: &[Value]) -> RepoResult<usize> {
        self.run(sql, params.len(), |conn| {
            Ok(conn.execute(sql, params_from_iter(params.iter()))?)
        })
    }

    pub(crate) fn run_batch(&self, sql: &str) -> RepoResult<()> {
        self.run(sql, 0, |conn| Ok(conn.execute_batch(sql)?))
    }

    pub(crate) fn run_query<T, F>(&self, sql: &str, params: &[Value], mut map: F) -> RepoResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> RepoResult<T>,
    {
        self.run(sql, params.len(), |conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut mapped = Vec::new();
            while let Some(row) = rows.next()? {
                mapped.push(map(row)?);
            }
            Ok(mapped)
        })
    }
}

impl Executor for Session {
    fn session_id(&self) -> Uuid {
        self.id
    }

    fn execute(&self, sql: &str, params: &[Value]) -> RepoResult<usize> {
        self.run_execute(sql, params)
    }

    fn execute_batch(&self, sql: &str) -> RepoResult<()> {
        self.run_batch(sql)
    }

    fn query<T, F>(&self, sql: &str, params: &[Value], map: F) -> RepoResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> RepoResult<T>,
    {
        self.run_query(sql, params, map)
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
