//! Classification of raw store errors into the [`ErrorKind`] taxonomy.
//!
//! # Invariants
//! - The no-rows sentinel maps to `NotFound`, the multiple-rows sentinel to
//!   `BadRequest`.
//! - A structured SQLite failure keeps its code, extended code and message;
//!   it maps to `Conflict` when the message carries the duplicate-key marker.
//! - Unmatched errors are unwrapped through `source()` one level at a time;
//!   when the chain ends, the result is `Internal` with the innermost error's
//!   message.
//! - The source of a converted error is the error as passed in, so the whole
//!   chain down to the innermost error stays reachable through `source()`.

use super::{ErrorKind, RepoError, Tag};
use crate::db::DbError;
use std::error::Error;

const DUPLICATE_KEY_MARKER: &str = "UNIQUE constraint failed";

type BoxError = Box<dyn Error + Send + Sync + 'static>;

struct Classified {
    kind: ErrorKind,
    code: String,
    status: String,
    message: String,
    tags: Vec<Tag>,
}

impl Classified {
    fn plain(kind: ErrorKind, message: String) -> Self {
        Self {
            kind,
            code: String::new(),
            status: String::new(),
            message,
            tags: Vec::new(),
        }
    }
}

/// Converts any error into a classified [`RepoError`].
///
/// An error that already is a [`RepoError`] is returned unchanged.
pub fn convert(err: impl Into<BoxError>) -> RepoError {
    let boxed: BoxError = err.into();
    let boxed = match boxed.downcast::<RepoError>() {
        Ok(already) => return *already,
        Err(other) => other,
    };

    let classified = classify_chain(boxed.as_ref());
    let mut converted = RepoError::new(classified.kind, classified.message)
        .with_params(classified.code, classified.status)
        .with_source(boxed);
    for tag in &classified.tags {
        converted = converted.with_tag(tag);
    }
    converted
}

fn classify_chain(err: &(dyn Error + 'static)) -> Classified {
    let mut current = err;
    loop {
        if let Some(classified) = classify_one(current) {
            return classified;
        }
        match current.source() {
            Some(inner) => current = inner,
            None => return Classified::plain(ErrorKind::Internal, current.to_string()),
        }
    }
}

fn classify_one(err: &(dyn Error + 'static)) -> Option<Classified> {
    if let Some(repo_err) = err.downcast_ref::<RepoError>() {
        return Some(Classified {
            kind: repo_err.kind(),
            code: repo_err.code().to_string(),
            status: repo_err.status().to_string(),
            message: repo_err.message().to_string(),
            tags: repo_err.tags().to_vec(),
        });
    }

    if let Some(db_err) = err.downcast_ref::<DbError>() {
        return match db_err {
            DbError::NoRows => Some(Classified::plain(
                ErrorKind::NotFound,
                db_err.to_string(),
            )),
            DbError::MultipleRows(_) => Some(Classified::plain(
                ErrorKind::BadRequest,
                db_err.to_string(),
            )),
            DbError::Sqlite(inner) => classify_sqlite(inner),
            _ => None,
        };
    }

    if let Some(sqlite_err) = err.downcast_ref::<rusqlite::Error>() {
        return classify_sqlite(sqlite_err);
    }

    None
}

fn classify_sqlite(err: &rusqlite::Error) -> Option<Classified> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Some(Classified::plain(
            ErrorKind::NotFound,
            err.to_string(),
        )),
        rusqlite::Error::SqliteFailure(failure, message) => {
            let message = message.clone().unwrap_or_else(|| failure.to_string());
            let kind = if message.contains(DUPLICATE_KEY_MARKER) {
                ErrorKind::Conflict
            } else {
                ErrorKind::Internal
            };
            Some(Classified {
                kind,
                code: format!("{:?}", failure.code),
                status: failure.extended_code.to_string(),
                message,
                tags: Vec::new(),
            })
        }
        _ => None,
    }
}
