use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use storekit_core::error::{convert, is_conflict, is_internal, is_not_found};
use storekit_core::{DbError, ErrorKind, RepoError, Tag};

#[derive(Debug)]
struct Wrapped(Box<dyn Error + Send + Sync>);

impl Display for Wrapped {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "wrapped: {}", self.0)
    }
}

impl Error for Wrapped {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.0.as_ref())
    }
}

fn unique_violation() -> rusqlite::Error {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
        .unwrap();
    conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err()
}

#[test]
fn no_rows_sentinels_map_to_not_found() {
    let err = convert(DbError::NoRows);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(is_not_found(&err));

    let err = convert(rusqlite::Error::QueryReturnedNoRows);
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn multiple_rows_maps_to_bad_request() {
    let err = convert(DbError::MultipleRows(3));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn unique_violation_maps_to_conflict_and_keeps_message() {
    let raw = unique_violation();
    let raw_message = match &raw {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
        other => panic!("unexpected error shape: {other:?}"),
    };

    let err = convert(raw);
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(is_conflict(&err));
    assert_eq!(err.message(), raw_message);
    assert!(err.message().contains("UNIQUE constraint failed"));
    assert_eq!(err.code(), "ConstraintViolation");
    assert!(!err.status().is_empty());
}

#[test]
fn other_store_failures_are_internal() {
    let conn = Connection::open_in_memory().unwrap();
    let raw = conn.execute("SELECT * FROM missing_table", []).unwrap_err();
    let err = convert(raw);
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.message().contains("missing_table"));
}

#[test]
fn unrecognized_wrapper_is_unwrapped_until_a_match() {
    let err = convert(Wrapped(Box::new(unique_violation())));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = convert(Wrapped(Box::new(Wrapped(Box::new(DbError::NoRows)))));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn unmatched_chain_becomes_internal_with_innermost_message() {
    let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    let err = convert(Wrapped(Box::new(inner)));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.message(), "disk on fire");

    let outer = err.source().unwrap();
    assert!(outer.downcast_ref::<Wrapped>().is_some());
    let innermost = outer.source().unwrap();
    assert!(innermost.downcast_ref::<std::io::Error>().is_some());
    assert!(innermost.source().is_none());
}

#[test]
fn repo_error_passes_through_unchanged() {
    let tag = Tag::new("retryable");
    let original = RepoError::conflict("dup").with_params("c1", "s1").with_tag(&tag);
    let err = convert(original);

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.code(), "c1");
    assert_eq!(err.status(), "s1");
    assert_eq!(err.message(), "dup");
    assert!(err.has_tag(&tag));
}

#[test]
fn tags_are_identity_based() {
    let first = Tag::new("same");
    let second = Tag::new("same");
    let err = RepoError::internal("x").with_tag(&first).with_tag(&first);

    assert_eq!(err.tags().len(), 1);
    assert!(first.is_tagged(&err));
    assert!(!second.is_tagged(&err));
    assert!(err.has_tag(&first.clone()));
}

#[test]
fn kind_helpers_treat_foreign_errors_as_internal() {
    let foreign = std::io::Error::new(std::io::ErrorKind::Other, "io");
    assert!(is_internal(&foreign));
    assert!(!is_not_found(&foreign));
}

#[test]
fn display_joins_kind_description_and_message() {
    let err = RepoError::not_found("agent 7");
    assert_eq!(err.to_string(), "entity not found: agent 7");
    assert_eq!(RepoError::bad_request("").to_string(), "bad request");
}
