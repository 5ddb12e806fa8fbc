//! Cross-process mutual exclusion keyed by a 64-bit lock id.
//!
//! # Responsibility
//! - Acquire and release a named lock shared by every process that opens the
//!   same database file.
//! - Serialize lock calls made from several threads on one [`Mutex`].
//!
//! # Invariants
//! - A mutex owns exactly one dedicated session; lock rows are owned by that
//!   session's id.
//! - Acquisition never blocks or retries: first acquire wins, and a store
//!   file locked by another writer reads as "not acquired".
//! - Re-locking from the owning session succeeds without a second row.

use crate::db::{Executor, Session, StoreConfig};
use crate::error::{RepoError, RepoResult};
use log::{debug, warn};
use rusqlite::types::Value;
use std::sync::MutexGuard;
use std::time::Duration;

const LOCK_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS storekit_advisory_locks (
    lock_id INTEGER PRIMARY KEY,
    session_id TEXT NOT NULL,
    acquired_at INTEGER NOT NULL
);";

/// Advisory lock bound to one dedicated store session.
#[derive(Debug)]
pub struct Mutex {
    lock_id: i64,
    session: std::sync::Mutex<Session>,
}

impl Mutex {
    /// Opens the dedicated session for lock `lock_id`.
    ///
    /// # Errors
    /// - `Internal` when `config.pool_size` is not exactly 1, or the session
    ///   cannot be opened.
    pub fn new(config: &StoreConfig, lock_id: i64) -> RepoResult<Self> {
        if config.pool_size != 1 {
            return Err(RepoError::internal(format!(
                "pool size for mutex must be exactly 1, got {}",
                config.pool_size
            )));
        }
        let session = Session::open(config)?;
        session.execute_batch(LOCK_TABLE_DDL)?;
        session.set_busy_timeout(Duration::ZERO)?;
        debug!(
            "event=mutex_open module=mutex status=ok lock_id={} session_id={}",
            lock_id,
            session.id()
        );
        Ok(Self {
            lock_id,
            session: std::sync::Mutex::new(session),
        })
    }

    pub fn lock_id(&self) -> i64 {
        self.lock_id
    }

    /// Tries to take the lock once and reports whether this mutex holds it.
    ///
    /// A store file held by another writer is reported as `Ok(false)`.
    pub fn try_lock(&self) -> RepoResult<bool> {
        let session = self.session();
        match acquire(&session, self.lock_id) {
            Err(err) if is_store_busy(&err) => {
                debug!(
                    "event=mutex_try_lock module=mutex status=store_busy lock_id={} session_id={}",
                    self.lock_id,
                    session.id()
                );
                Ok(false)
            }
            result => result,
        }
    }

    /// Releases the lock if this mutex holds it; returns whether a lock was
    /// released.
    pub fn unlock(&self) -> RepoResult<bool> {
        let session = self.session();
        release(&session, self.lock_id)
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        let lock_id = self.lock_id;
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = release(session, lock_id) {
            warn!(
                "event=mutex_drop module=mutex status=error lock_id={} session_id={} error={}",
                lock_id,
                session.id(),
                err
            );
        }
    }
}

fn acquire(session: &Session, lock_id: i64) -> RepoResult<bool> {
    let owner = owner_param(session);
    let held: i64 = session.query_scalar(
        "SELECT EXISTS(SELECT 1 FROM storekit_advisory_locks WHERE lock_id = ? AND session_id = ?)",
        &[Value::Integer(lock_id), owner.clone()],
    )?;
    if held == 1 {
        return Ok(true);
    }

    let inserted = session.execute(
        "INSERT OR IGNORE INTO storekit_advisory_locks (lock_id, session_id, acquired_at)
         VALUES (?, ?, (strftime('%s', 'now') * 1000))",
        &[Value::Integer(lock_id), owner],
    )?;
    debug!(
        "event=mutex_try_lock module=mutex status={} lock_id={} session_id={}",
        if inserted == 1 { "acquired" } else { "busy" },
        lock_id,
        session.id()
    );
    Ok(inserted == 1)
}

fn is_store_busy(err: &RepoError) -> bool {
    matches!(err.code(), "DatabaseBusy" | "DatabaseLocked")
}

fn release(session: &Session, lock_id: i64) -> RepoResult<bool> {
    let deleted = session.execute(
        "DELETE FROM storekit_advisory_locks WHERE lock_id = ? AND session_id = ?",
        &[Value::Integer(lock_id), owner_param(session)],
    )?;
    debug!(
        "event=mutex_unlock module=mutex status={} lock_id={} session_id={}",
        if deleted == 1 { "released" } else { "not_held" },
        lock_id,
        session.id()
    );
    Ok(deleted == 1)
}

fn owner_param(session: &Session) -> Value {
    Value::Text(session.id().to_string())
}
