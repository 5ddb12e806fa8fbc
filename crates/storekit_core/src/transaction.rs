//! Transaction orchestration over a store session.
//!
//! # Responsibility
//! - Run a unit of work inside one transaction with commit/rollback handling.
//! - Keep nested calls inside the already open transaction.
//!
//! # Invariants
//! - Only a [`Session`] can begin; a [`Tx`] has no way to open a second
//!   transaction, so nesting never issues another `BEGIN`.
//! - When the unit of work fails, its error is returned unchanged; a rollback
//!   failure is logged and suppressed.
//! - A `Tx` that is dropped unfinished rolls back.

use crate::db::{Executor, Session};
use crate::error::RepoResult;
use log::{debug, error, warn};
use rusqlite::types::Value;
use rusqlite::Row;
use uuid::Uuid;

/// Transaction-scoped handle borrowed from a [`Session`].
pub struct Tx<'s> {
    session: &'s Session,
    finished: bool,
}

impl<'s> Tx<'s> {
    fn begin(session: &'s Session) -> RepoResult<Self> {
        session.run_batch("BEGIN")?;
        debug!(
            "event=tx_begin module=transaction status=ok session_id={}",
            session.id()
        );
        Ok(Self {
            session,
            finished: false,
        })
    }

    fn commit(mut self) -> RepoResult<()> {
        self.session.run_batch("COMMIT")?;
        self.finished = true;
        debug!(
            "event=tx_commit module=transaction status=ok session_id={}",
            self.session.id()
        );
        Ok(())
    }

    fn rollback(mut self) -> RepoResult<()> {
        self.finished = true;
        self.session.run_batch("ROLLBACK")
    }

    /// Runs `f` inside this transaction. No new transaction is opened.
    pub fn run_in_transaction<T, F>(&self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&Tx<'_>) -> RepoResult<T>,
    {
        f(self)
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if self.finished || !self.session.in_transaction() {
            return;
        }
        warn!(
            "event=tx_drop module=transaction status=rollback session_id={}",
            self.session.id()
        );
        if let Err(err) = self.session.run_batch("ROLLBACK") {
            error!(
                "event=tx_drop module=transaction status=error session_id={} error={}",
                self.session.id(),
                err
            );
        }
    }
}

impl Executor for Tx<'_> {
    fn session_id(&self) -> Uuid {
        self.session.id()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> RepoResult<usize> {
        self.session.run_execute(sql, params)
    }

    fn execute_batch(&self, sql: &str) -> RepoResult<()> {
        self.session.run_batch(sql)
    }

    fn query<T, F>(&self, sql: &str, params: &[Value], map: F) -> RepoResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> RepoResult<T>,
    {
        self.session.run_query(sql, params, map)
    }
}

impl Session {
    /// Runs `f` inside a new transaction.
    ///
    /// Commits when `f` succeeds and returns the commit error, if any.
    /// Rolls back when `f` fails and returns the error from `f` unchanged.
    pub fn run_in_transaction<T, F>(&mut self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&Tx<'_>) -> RepoResult<T>,
    {
        let tx = Tx::begin(self)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                let session_id = tx.session_id();
                if let Err(rollback_err) = tx.rollback() {
                    error!(
                        "event=tx_rollback module=transaction status=error session_id={} error={}",
                        session_id, rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

/// Anything that can host a unit of work in a transaction.
///
/// Sessions open one; borrowed transaction handles reuse themselves, so code
/// generic over this trait is reentrant.
pub trait Transactional {
    fn run_in_transaction<T, F>(&mut self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&Tx<'_>) -> RepoResult<T>;
}

impl Transactional for Session {
    fn run_in_transaction<T, F>(&mut self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&Tx<'_>) -> RepoResult<T>,
    {
        Session::run_in_transaction(self, f)
    }
}

impl Transactional for &Tx<'_> {
    fn run_in_transaction<T, F>(&mut self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&Tx<'_>) -> RepoResult<T>,
    {
        Tx::run_in_transaction(*self, f)
    }
}
