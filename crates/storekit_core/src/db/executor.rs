//! Statement execution capability shared by sessions and transactions.

use super::DbError;
use crate::error::RepoResult;
use rusqlite::types::{FromSql, Value};
use rusqlite::Row;
use uuid::Uuid;

/// Runs parameterized statements against one store session.
///
/// Implemented by [`Session`](super::Session) and by the transaction handle
/// [`Tx`](crate::transaction::Tx). Every error is already classified.
pub trait Executor {
    /// Identity of the underlying session.
    fn session_id(&self) -> Uuid;

    /// Executes one statement and returns the number of rows affected.
    fn execute(&self, sql: &str, params: &[Value]) -> RepoResult<usize>;

    /// Executes several parameterless statements.
    fn execute_batch(&self, sql: &str) -> RepoResult<()>;

    /// Runs a query and maps every returned row.
    fn query<T, F>(&self, sql: &str, params: &[Value], map: F) -> RepoResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> RepoResult<T>;

    /// Executes a statement that must affect exactly one row.
    fn execute_one(&self, sql: &str, params: &[Value]) -> RepoResult<()> {
        match self.execute(sql, params)? {
            0 => Err(DbError::NoRows.into()),
            1 => Ok(()),
            count => Err(DbError::MultipleRows(count).into()),
        }
    }

    /// Runs a query that must return exactly one row.
    fn query_one<T, F>(&self, sql: &str, params: &[Value], map: F) -> RepoResult<T>
    where
        F: FnMut(&Row<'_>) -> RepoResult<T>,
    {
        let mut rows = self.query(sql, params, map)?;
        match rows.len() {
            0 => Err(DbError::NoRows.into()),
            1 => Ok(rows.remove(0)),
            count => Err(DbError::MultipleRows(count).into()),
        }
    }

    /// Reads the first column of a single-row result.
    fn query_scalar<T: FromSql>(&self, sql: &str, params: &[Value]) -> RepoResult<T> {
        self.query_one(sql, params, |row| Ok(row.get::<_, T>(0)?))
    }
}
