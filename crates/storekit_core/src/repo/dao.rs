//! Generic data-access object over any [`Executor`].
//!
//! # Responsibility
//! - Provide CRUD, counting and upsert operations for one [`Model`] type.
//! - Route every option set through the [`Opts`] pipeline.
//!
//! # Invariants
//! - The executor is always an explicit argument; there is no ambient handle.
//! - Every store failure reaches the caller already classified.
//! - Upsert deduplicates by conflict-key values, last record wins.

use super::opt::{self, Opts};
use super::query::{quote_ident, Fragment, Query};
use super::unique::unique_last_wins;
use crate::db::{DbError, Executor};
use crate::error::{RepoError, RepoResult};
use crate::transaction::{Transactional, Tx};
use log::debug;
use rusqlite::types::Value;
use rusqlite::Row;
use std::marker::PhantomData;
use std::time::{SystemTime, UNIX_EPOCH};

const NOW_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

/// Table-backed record type.
pub trait Model: Sized {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Persisted columns, in the order [`Model::values`] returns them.
    const COLUMNS: &'static [&'static str];
    /// Column stamped with the current epoch milliseconds on every update.
    const UPDATED_COLUMN: Option<&'static str> = None;

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Model whose rows can be marked deleted instead of removed.
pub trait SoftDelete: Model {
    const DELETED_COLUMN: &'static str = "deleted";

    /// Records the deletion time in epoch milliseconds.
    fn set_deleted(&mut self, at_ms: i64);
}

pub struct Dao<M> {
    model: PhantomData<fn() -> M>,
}

impl<M: Model> Default for Dao<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Dao<M> {
    pub fn new() -> Self {
        Self { model: PhantomData }
    }

    pub fn ping(&self, exec: &impl Executor) -> RepoResult<()> {
        exec.query_scalar::<i64>("SELECT 1", &[]).map(|_| ())
    }

    /// Runs `f` in a transaction hosted by `host`.
    ///
    /// A session begins a new transaction; a transaction handle runs `f`
    /// directly.
    pub fn with_tx<X, T, F>(&self, host: &mut X, f: F) -> RepoResult<T>
    where
        X: Transactional,
        F: FnOnce(&Tx<'_>) -> RepoResult<T>,
    {
        host.run_in_transaction(f)
    }

    /// Returns the first record matching `opts`.
    ///
    /// Without a sort key the primary key orders the result.
    ///
    /// # Errors
    /// - `NotFound` when nothing matches.
    pub fn find_one(&self, exec: &impl Executor, opts: Option<&Opts>) -> RepoResult<M> {
        let mut query = opt::apply(opts, Self::select())?;
        if query.orders().is_empty() {
            query = query.order_by(Fragment::new(
                format!("{} ASC", quote_ident(M::PRIMARY_KEY)),
                Vec::new(),
            ));
        }
        let rendered = query.limit(1).to_select_sql();
        let mut rows = exec.query(rendered.sql(), rendered.params(), M::from_row)?;
        if rows.is_empty() {
            return Err(DbError::NoRows.into());
        }
        Ok(rows.remove(0))
    }

    pub fn find_list(&self, exec: &impl Executor, opts: Option<&Opts>) -> RepoResult<Vec<M>> {
        let rendered = opt::apply(opts, Self::select())?.to_select_sql();
        exec.query(rendered.sql(), rendered.params(), M::from_row)
    }

    /// Returns the requested page and the number of rows matching the filter.
    pub fn find_list_with_total(
        &self,
        exec: &impl Executor,
        opts: Option<&Opts>,
    ) -> RepoResult<(Vec<M>, i64)> {
        let total = self.get_total(exec, opts)?;
        let records = self.find_list(exec, opts)?;
        Ok((records, total))
    }

    /// Counts rows matching the filter and custom transforms; paging and
    /// sorting are ignored.
    pub fn get_total(&self, exec: &impl Executor, opts: Option<&Opts>) -> RepoResult<i64> {
        let query = opt::apply_filter(opts, Self::select());
        let rendered = opt::apply_fn(opts, query)?.to_count_sql();
        exec.query_scalar(rendered.sql(), rendered.params())
    }

    /// Inserts all records in one statement.
    pub fn insert(&self, exec: &impl Executor, records: &[M]) -> RepoResult<usize> {
        if records.is_empty() {
            return Err(RepoError::bad_request("records cannot be empty"));
        }
        let (sql, params) = Self::insert_statement(records)?;
        exec.execute(&sql, &params)
    }

    /// Updates `columns` of the row with the record's primary key.
    ///
    /// The updated-at column, when the model has one, is always stamped.
    ///
    /// # Errors
    /// - `BadRequest` for a column the model does not persist.
    /// - `NotFound` when no row has that primary key.
    pub fn update(&self, exec: &impl Executor, record: &M, columns: &[&str]) -> RepoResult<()> {
        let rendered = Self::update_statement(record, columns)?;
        exec.execute_one(rendered.sql(), rendered.params())
    }

    /// Like [`Dao::update`], but returns the row as stored after the update,
    /// including the stamped updated-at column and any trigger changes.
    ///
    /// # Errors
    /// - `BadRequest` for a column the model does not persist.
    /// - `NotFound` when no row has that primary key.
    pub fn update_returning(
        &self,
        exec: &impl Executor,
        record: &M,
        columns: &[&str],
    ) -> RepoResult<M> {
        let (mut sql, params) = Self::update_statement(record, columns)?.into_parts();
        let returning = M::COLUMNS
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" RETURNING {returning}"));
        exec.query_one(&sql, &params, M::from_row)
    }

    /// Sets columns on every row matching the filter of `opts`.
    ///
    /// `pairs` alternates column names (as text values) and new values.
    ///
    /// # Errors
    /// - `BadRequest` for an odd-length list or a non-text column name.
    pub fn update_where(
        &self,
        exec: &impl Executor,
        opts: Option<&Opts>,
        pairs: &[Value],
    ) -> RepoResult<usize> {
        if pairs.len() % 2 != 0 {
            return Err(RepoError::bad_request(format!(
                "column/value pairs must have even length, got {}",
                pairs.len()
            )));
        }
        let mut assignments = Vec::with_capacity(pairs.len() / 2 + 1);
        let mut columns = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks_exact(2) {
            let Value::Text(column) = &pair[0] else {
                return Err(RepoError::bad_request(format!(
                    "column name must be text, got {:?}",
                    pair[0]
                )));
            };
            assignments.push(Fragment::new(
                format!("{} = ?", quote_ident(column)),
                vec![pair[1].clone()],
            ));
            columns.push(column.as_str());
        }
        push_updated_stamp::<M>(&mut assignments, &columns);
        if assignments.is_empty() {
            return Err(RepoError::bad_request("nothing to update"));
        }

        let rendered = opt::apply_filter(opts, Query::table(M::TABLE)).to_update_sql(&assignments);
        exec.execute(rendered.sql(), rendered.params())
    }

    /// Stamps the record deleted now and persists the deleted column.
    pub fn soft_delete(&self, exec: &impl Executor, record: &mut M) -> RepoResult<()>
    where
        M: SoftDelete,
    {
        record.set_deleted(now_ms());
        self.update(exec, record, &[M::DELETED_COLUMN])
    }

    /// Removes the row with the record's primary key.
    pub fn hard_delete(&self, exec: &impl Executor, record: &M) -> RepoResult<usize> {
        let values = Self::checked_values(record)?;
        let key_index = Self::column_index(M::PRIMARY_KEY)?;
        let rendered = Query::table(M::TABLE)
            .filter(Fragment::new(
                format!("{} = ?", quote_ident(M::PRIMARY_KEY)),
                vec![values[key_index].clone()],
            ))
            .to_delete_sql();
        exec.execute(rendered.sql(), rendered.params())
    }

    /// Removes every row matching the filter of `opts`.
    pub fn hard_delete_where(&self, exec: &impl Executor, opts: Option<&Opts>) -> RepoResult<usize> {
        let rendered = opt::apply_filter(opts, Query::table(M::TABLE)).to_delete_sql();
        exec.execute(rendered.sql(), rendered.params())
    }

    /// Inserts `records`; on a `keys` conflict, overwrites `columns` with the
    /// incoming values, or keeps the stored row when `columns` is empty.
    ///
    /// # Errors
    /// - `BadRequest` for empty `keys` or `records`, or an unknown key.
    pub fn upsert(
        &self,
        exec: &impl Executor,
        records: Vec<M>,
        keys: &[&str],
        columns: &[&str],
    ) -> RepoResult<usize> {
        if keys.is_empty() {
            return Err(RepoError::bad_request("keys cannot be empty"));
        }
        let key_indexes = keys
            .iter()
            .map(|key| Self::column_index(key))
            .collect::<RepoResult<Vec<_>>>()?;
        for column in columns {
            Self::column_index(column)?;
        }

        let received = records.len();
        let records = unique_last_wins(records, |record| {
            let values = record.values();
            key_indexes
                .iter()
                .map(|index| values.get(*index).map_or_else(String::new, |value| format!("{value:?}")))
                .collect::<Vec<_>>()
                .join("_")
        });
        if records.is_empty() {
            return Err(RepoError::bad_request("records cannot be empty"));
        }
        debug!(
            "event=upsert module=repo status=start table={} received={} unique={}",
            M::TABLE,
            received,
            records.len()
        );

        let (mut sql, params) = Self::insert_statement(&records)?;
        let conflict_keys = keys
            .iter()
            .map(|key| quote_ident(key))
            .collect::<Vec<_>>()
            .join(", ");
        if columns.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({conflict_keys}) DO NOTHING"));
        } else {
            let updates = columns
                .iter()
                .map(|column| {
                    let ident = quote_ident(column);
                    format!("{ident} = excluded.{ident}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(
                " ON CONFLICT ({conflict_keys}) DO UPDATE SET {updates}"
            ));
        }
        exec.execute(&sql, &params)
    }

    fn select() -> Query {
        Query::table(M::TABLE).columns(M::COLUMNS.iter().copied())
    }

    fn update_statement(record: &M, columns: &[&str]) -> RepoResult<Fragment> {
        let values = Self::checked_values(record)?;
        let mut assignments = Vec::with_capacity(columns.len() + 1);
        for column in columns {
            let index = Self::column_index(column)?;
            assignments.push(Fragment::new(
                format!("{} = ?", quote_ident(column)),
                vec![values[index].clone()],
            ));
        }
        push_updated_stamp::<M>(&mut assignments, columns);
        if assignments.is_empty() {
            return Err(RepoError::bad_request("nothing to update"));
        }

        let key_index = Self::column_index(M::PRIMARY_KEY)?;
        Ok(Query::table(M::TABLE)
            .filter(Fragment::new(
                format!("{} = ?", quote_ident(M::PRIMARY_KEY)),
                vec![values[key_index].clone()],
            ))
            .to_update_sql(&assignments))
    }

    fn column_index(column: &str) -> RepoResult<usize> {
        M::COLUMNS
            .iter()
            .position(|candidate| *candidate == column)
            .ok_or_else(|| {
                RepoError::bad_request(format!("unknown column `{column}` for `{}`", M::TABLE))
            })
    }

    fn checked_values(record: &M) -> RepoResult<Vec<Value>> {
        let values = record.values();
        if values.len() != M::COLUMNS.len() {
            return Err(RepoError::internal(format!(
                "model `{}` returned {} values for {} columns",
                M::TABLE,
                values.len(),
                M::COLUMNS.len()
            )));
        }
        Ok(values)
    }

    fn insert_statement(records: &[M]) -> RepoResult<(String, Vec<Value>)> {
        let columns = M::COLUMNS
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        let row = format!("({})", vec!["?"; M::COLUMNS.len()].join(", "));
        let mut params = Vec::with_capacity(records.len() * M::COLUMNS.len());
        for record in records {
            params.extend(Self::checked_values(record)?);
        }
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES {}",
            quote_ident(M::TABLE),
            vec![row; records.len()].join(", ")
        );
        Ok((sql, params))
    }
}

fn push_updated_stamp<M: Model>(assignments: &mut Vec<Fragment>, columns: &[&str]) {
    if let Some(updated) = M::UPDATED_COLUMN {
        if !columns.contains(&updated) {
            assignments.push(Fragment::new(
                format!("{} = {NOW_MS_SQL}", quote_ident(updated)),
                Vec::new(),
            ));
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
