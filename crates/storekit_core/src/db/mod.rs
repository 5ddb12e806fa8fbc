//! SQLite store boundary: sessions, statement execution and migrations.
//!
//! # Responsibility
//! - Open and configure dedicated SQLite sessions.
//! - Execute parameterized statements and classify every raw failure.
//! - Apply caller-supplied schema migrations in deterministic order.
//!
//! # Invariants
//! - Raw `rusqlite` errors never escape this module unclassified.
//! - Migration version is tracked via `PRAGMA user_version`.

use crate::error::{convert, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod config;
mod executor;
mod hook;
pub mod migrations;
mod open;
mod session;

pub use config::StoreConfig;
pub use executor::Executor;
pub use hook::{QueryEvent, QueryHook, SlowQueryLogger};
pub use session::Session;

/// Raw store failure before classification.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A statement expected to touch exactly one row touched none.
    NoRows,
    /// A statement expected to touch exactly one row touched several.
    MultipleRows(usize),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    MigrationSource {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::NoRows => write!(f, "no rows in result set"),
            Self::MultipleRows(count) => {
                write!(f, "expected one row, statement returned {count}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MigrationSource { path, source } => {
                write!(f, "failed to read migrations from `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MigrationSource { source, .. } => Some(source),
            Self::NoRows | Self::MultipleRows(_) | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        convert(value)
    }
}
