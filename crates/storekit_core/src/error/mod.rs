//! Error taxonomy shared by every storekit operation.
//!
//! # Responsibility
//! - Define the closed set of error kinds callers branch on.
//! - Carry store diagnostics (code, status, message) and identity tags.
//!
//! # Invariants
//! - Everything above the store boundary only sees [`RepoError`].
//! - Kind checks use [`RepoError::is_of_kind`]; cross-cutting signals use
//!   tags, never new kinds.

mod convert;
mod tag;

pub use convert::convert;
pub use tag::Tag;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Closed set of error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Catch-all for store failures and broken invariants.
    Internal,
    /// No row matched.
    NotFound,
    /// Uniqueness or duplicate-key violation.
    Conflict,
    /// Caller input is malformed.
    BadRequest,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::BadRequest => "bad_request",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Internal => "internal error",
            Self::NotFound => "entity not found",
            Self::Conflict => "entity already exists",
            Self::BadRequest => "bad request",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified repository error.
///
/// Built once, then enriched through the chained `with_*` mutators.
#[derive(Debug)]
pub struct RepoError {
    kind: ErrorKind,
    code: String,
    status: String,
    message: String,
    tags: Vec<Tag>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl RepoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: String::new(),
            status: String::new(),
            message: message.into(),
            tags: Vec::new(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Records the store's error code and status fields.
    pub fn with_params(mut self, code: impl Into<String>, status: impl Into<String>) -> Self {
        self.code = code.into();
        self.status = status.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches `tag`; attaching the same tag twice is a no-op.
    pub fn with_tag(mut self, tag: &Tag) -> Self {
        if !self.has_tag(tag) {
            self.tags.push(tag.clone());
        }
        self
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn is_of_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.kind.description())
        } else {
            write!(f, "{}: {}", self.kind.description(), self.message)
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        convert(value)
    }
}

/// Errors that are not a [`RepoError`] count as internal.
pub fn is_internal(err: &(dyn Error + 'static)) -> bool {
    err.downcast_ref::<RepoError>()
        .map_or(true, |repo_err| repo_err.is_of_kind(ErrorKind::Internal))
}

pub fn is_not_found(err: &(dyn Error + 'static)) -> bool {
    has_kind(err, ErrorKind::NotFound)
}

pub fn is_conflict(err: &(dyn Error + 'static)) -> bool {
    has_kind(err, ErrorKind::Conflict)
}

pub fn is_bad_request(err: &(dyn Error + 'static)) -> bool {
    has_kind(err, ErrorKind::BadRequest)
}

fn has_kind(err: &(dyn Error + 'static), kind: ErrorKind) -> bool {
    err.downcast_ref::<RepoError>()
        .is_some_and(|repo_err| repo_err.is_of_kind(kind))
}
