use rusqlite::types::Value;
use rusqlite::Connection;
use std::error::Error;
use std::fs;
use storekit_core::db::migrations::user_version;
use storekit_core::{DbError, ErrorKind, Executor, Migration, Migrator, Session, StoreConfig};

fn sample_migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "init", "CREATE TABLE agent (id INTEGER PRIMARY KEY, name TEXT);"),
        Migration::new(2, "teams", "CREATE TABLE team (id INTEGER PRIMARY KEY);"),
    ]
}

fn table_exists(exec: &impl Executor, table_name: &str) -> bool {
    let exists: i64 = exec
        .query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
            &[Value::Text(table_name.to_string())],
        )
        .unwrap();
    exists == 1
}

#[test]
fn run_applies_pending_migrations_in_order() {
    let mut session = Session::open_in_memory().unwrap();
    let migrator = Migrator::new(sample_migrations()).unwrap();

    let report = migrator.run(&mut session).unwrap();

    assert_eq!((report.before, report.after), (0, 2));
    assert_eq!(user_version(&session).unwrap(), 2);
    assert!(table_exists(&session, "agent"));
    assert!(table_exists(&session, "team"));
}

#[test]
fn rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("app.sqlite3"));
    let migrator = Migrator::new(sample_migrations()).unwrap();

    let mut first = Session::open(&config).unwrap();
    migrator.run(&mut first).unwrap();
    drop(first);

    let mut second = Session::open(&config).unwrap();
    let report = migrator.run(&mut second).unwrap();
    assert_eq!((report.before, report.after), (2, 2));
}

#[test]
fn newer_database_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let mut session = Session::open(&StoreConfig::file(&path)).unwrap();
    let err = Migrator::new(sample_migrations())
        .unwrap()
        .run(&mut session)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    match err.source().and_then(|source| source.downcast_ref::<DbError>()) {
        Some(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(*db_version, 999);
            assert_eq!(*latest_supported, 2);
        }
        other => panic!("unexpected source: {other:?}"),
    }
}

#[test]
fn failing_migration_leaves_schema_untouched() {
    let mut session = Session::open_in_memory().unwrap();
    let migrator = Migrator::new(vec![
        Migration::new(1, "init", "CREATE TABLE agent (id INTEGER PRIMARY KEY);"),
        Migration::new(2, "broken", "CREATE TABLE oops (;"),
    ])
    .unwrap();

    migrator.run(&mut session).unwrap_err();

    assert_eq!(user_version(&session).unwrap(), 0);
    assert!(!table_exists(&session, "agent"));
}

#[test]
fn versions_must_increase() {
    let err = Migrator::new(vec![
        Migration::new(2, "b", "SELECT 1;"),
        Migration::new(2, "c", "SELECT 1;"),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn from_dir_loads_numbered_sql_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("0002_teams.sql"), "CREATE TABLE team (id INTEGER);").unwrap();
    fs::write(dir.path().join("0001_init.sql"), "CREATE TABLE agent (id INTEGER);").unwrap();
    fs::write(dir.path().join("README.md"), "not a migration").unwrap();

    let migrator = Migrator::from_dir(dir.path()).unwrap();

    let loaded = migrator
        .migrations()
        .iter()
        .map(|migration| (migration.version, migration.name.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(loaded, vec![(1, "init"), (2, "teams")]);
    assert_eq!(migrator.latest_version(), 2);
}

#[test]
fn from_missing_dir_is_internal() {
    let dir = tempfile::tempdir().unwrap();
    let err = Migrator::from_dir(dir.path().join("absent")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn clean_drops_existing_tables_first() {
    let mut session = Session::open_in_memory().unwrap();
    session
        .execute_batch("CREATE TABLE leftover (id INTEGER); PRAGMA user_version = 1;")
        .unwrap();

    let report = Migrator::new(sample_migrations())
        .unwrap()
        .with_clean()
        .run(&mut session)
        .unwrap();

    assert_eq!((report.before, report.after), (0, 2));
    assert!(!table_exists(&session, "leftover"));
    assert!(table_exists(&session, "agent"));
}
