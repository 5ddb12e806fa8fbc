//! Ordered schema migrations tracked through `PRAGMA user_version`.
//!
//! # Responsibility
//! - Collect migrations from code or from a directory of `NNNN_name.sql` files.
//! - Apply pending migrations in one transaction.
//!
//! # Invariants
//! - Versions are strictly increasing.
//! - After a successful run, `user_version` equals the latest version.
//! - A database newer than the latest migration is never touched.

use crate::db::{DbError, Executor, Session};
use crate::error::{RepoError, RepoResult};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Instant;

static MIGRATION_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)_(.+)\.sql$").expect("valid migration file regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: u32, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Schema versions before and after a [`Migrator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub before: u32,
    pub after: u32,
}

#[derive(Debug, Clone)]
pub struct Migrator {
    migrations: Vec<Migration>,
    clean: bool,
}

impl Migrator {
    /// # Errors
    /// - `BadRequest` when versions are zero or not strictly increasing.
    pub fn new(migrations: Vec<Migration>) -> RepoResult<Self> {
        let mut previous = 0;
        for migration in &migrations {
            if migration.version <= previous {
                return Err(RepoError::bad_request(format!(
                    "migration `{}` has version {}, expected more than {previous}",
                    migration.name, migration.version
                )));
            }
            previous = migration.version;
        }
        Ok(Self {
            migrations,
            clean: false,
        })
    }

    /// Loads every `NNNN_name.sql` file in `dir`, ordered by version.
    /// Other files are ignored.
    pub fn from_dir(dir: impl AsRef<Path>) -> RepoResult<Self> {
        let dir = dir.as_ref();
        let source_err = |source| DbError::MigrationSource {
            path: dir.to_path_buf(),
            source,
        };

        let mut migrations = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(source_err)? {
            let path = entry.map_err(source_err)?.path();
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some(captures) = MIGRATION_FILE.captures(file_name) else {
                continue;
            };
            let version = captures[1].parse::<u32>().map_err(|err| {
                RepoError::bad_request(format!("bad migration version in `{file_name}`: {err}"))
            })?;
            let name = captures[2].to_string();
            let sql = std::fs::read_to_string(&path).map_err(|source| DbError::MigrationSource {
                path: path.clone(),
                source,
            })?;
            migrations.push(Migration::new(version, name, sql));
        }
        migrations.sort_by_key(|migration| migration.version);
        Self::new(migrations)
    }

    /// Drops every user table before migrating.
    pub fn with_clean(mut self) -> Self {
        self.clean = true;
        self
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map_or(0, |migration| migration.version)
    }

    /// Applies pending migrations.
    ///
    /// # Errors
    /// - `Internal` when the database is newer than [`Migrator::latest_version`].
    /// - The classified store error of the first failing migration; nothing
    ///   from the run is kept in that case.
    pub fn run(&self, session: &mut Session) -> RepoResult<MigrationReport> {
        let started_at = Instant::now();
        info!(
            "event=migrate module=db status=start session_id={} clean={}",
            session.id(),
            self.clean
        );
        let result = self.run_inner(session);
        match &result {
            Ok(report) => info!(
                "event=migrate module=db status=ok before={} after={} duration_ms={}",
                report.before,
                report.after,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=migrate module=db status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn run_inner(&self, session: &mut Session) -> RepoResult<MigrationReport> {
        if self.clean {
            drop_user_tables(session)?;
        }

        let before = user_version(session)?;
        let latest = self.latest_version();
        if before > latest {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: before,
                latest_supported: latest,
            }
            .into());
        }
        if before == latest {
            return Ok(MigrationReport {
                before,
                after: before,
            });
        }

        session.run_in_transaction(|tx| {
            for migration in self.migrations.iter().filter(|m| m.version > before) {
                tx.execute_batch(&migration.sql)?;
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
                info!(
                    "event=migrate_step module=db status=ok version={} name={}",
                    migration.version, migration.name
                );
            }
            Ok(())
        })?;

        Ok(MigrationReport {
            before,
            after: latest,
        })
    }
}

/// Current `PRAGMA user_version` of the session's database.
pub fn user_version(exec: &impl Executor) -> RepoResult<u32> {
    exec.query_scalar::<u32>("PRAGMA user_version;", &[])
}

fn drop_user_tables(session: &Session) -> RepoResult<()> {
    let tables = session.query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        &[],
        |row| Ok(row.get::<_, String>(0)?),
    )?;
    session.execute_batch("PRAGMA foreign_keys = OFF;")?;
    let dropped = tables.iter().try_for_each(|table| {
        session.execute_batch(&format!(
            "DROP TABLE IF EXISTS {};",
            crate::repo::quote_ident(table)
        ))
    });
    session.execute_batch("PRAGMA foreign_keys = ON; PRAGMA user_version = 0;")?;
    dropped?;
    info!(
        "event=migrate_clean module=db status=ok tables={}",
        tables.len()
    );
    Ok(())
}
