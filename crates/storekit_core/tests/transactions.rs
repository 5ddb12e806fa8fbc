use std::sync::{Arc, Mutex};
use storekit_core::db::{QueryEvent, QueryHook};
use storekit_core::{Executor, RepoError, Session, Transactional, Tx};

#[derive(Default)]
struct RecordingHook {
    statements: Mutex<Vec<String>>,
}

impl RecordingHook {
    fn count(&self, sql: &str) -> usize {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .filter(|statement| statement.as_str() == sql)
            .count()
    }
}

impl QueryHook for RecordingHook {
    fn after_query(&self, event: &QueryEvent<'_>) {
        self.statements.lock().unwrap().push(event.sql.to_string());
    }
}

fn session_with_hook() -> (Session, Arc<RecordingHook>) {
    let hook = Arc::new(RecordingHook::default());
    let session = Session::open_in_memory()
        .unwrap()
        .with_hook(hook.clone());
    session
        .execute_batch("CREATE TABLE item (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
        .unwrap();
    (session, hook)
}

fn item_count(exec: &impl Executor) -> i64 {
    exec.query_scalar("SELECT COUNT(*) FROM item", &[]).unwrap()
}

#[test]
fn success_commits_once() {
    let (mut session, hook) = session_with_hook();

    let value = session
        .run_in_transaction(|tx| {
            tx.execute("INSERT INTO item (name) VALUES ('a')", &[])?;
            Ok(42)
        })
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(hook.count("BEGIN"), 1);
    assert_eq!(hook.count("COMMIT"), 1);
    assert_eq!(hook.count("ROLLBACK"), 0);
    assert_eq!(item_count(&session), 1);
}

#[test]
fn failure_rolls_back_and_returns_original_error() {
    let (mut session, hook) = session_with_hook();

    let err = session
        .run_in_transaction(|tx| -> Result<(), RepoError> {
            tx.execute("INSERT INTO item (name) VALUES ('a')", &[])?;
            Err(RepoError::bad_request("business rule").with_params("E42", "rejected"))
        })
        .unwrap_err();

    assert_eq!(err.message(), "business rule");
    assert_eq!(err.code(), "E42");
    assert_eq!(hook.count("ROLLBACK"), 1);
    assert_eq!(hook.count("COMMIT"), 0);
    assert_eq!(item_count(&session), 0);
}

fn nested_unit(host: &mut impl Transactional, fail: bool) -> Result<(), RepoError> {
    host.run_in_transaction(|tx| {
        tx.execute("INSERT INTO item (name) VALUES ('inner')", &[])?;
        if fail {
            return Err(RepoError::conflict("inner failed"));
        }
        Ok(())
    })
}

#[test]
fn nested_call_reuses_open_transaction() {
    let (mut session, hook) = session_with_hook();

    session
        .run_in_transaction(|tx| {
            let mut host: &Tx<'_> = tx;
            nested_unit(&mut host, false)?;
            nested_unit(&mut host, false)
        })
        .unwrap();

    assert_eq!(hook.count("BEGIN"), 1);
    assert_eq!(hook.count("COMMIT"), 1);
    assert_eq!(item_count(&session), 2);
}

#[test]
fn nested_failure_propagates_unchanged_and_rolls_back_once() {
    let (mut session, hook) = session_with_hook();

    let err = session
        .run_in_transaction(|tx| {
            tx.execute("INSERT INTO item (name) VALUES ('outer')", &[])?;
            let mut host: &Tx<'_> = tx;
            nested_unit(&mut host, true)
        })
        .unwrap_err();

    assert!(storekit_core::error::is_conflict(&err));
    assert_eq!(err.message(), "inner failed");
    assert_eq!(hook.count("BEGIN"), 1);
    assert_eq!(hook.count("ROLLBACK"), 1);
    assert_eq!(item_count(&session), 0);
}

#[test]
fn session_hosted_unit_opens_its_own_transaction() {
    let (mut session, hook) = session_with_hook();

    nested_unit(&mut session, false).unwrap();

    assert_eq!(hook.count("BEGIN"), 1);
    assert_eq!(hook.count("COMMIT"), 1);
    assert_eq!(item_count(&session), 1);
}

#[test]
fn store_error_inside_transaction_is_classified() {
    let (mut session, _hook) = session_with_hook();

    let err = session
        .run_in_transaction(|tx| tx.execute("INSERT INTO item (name) VALUES (NULL)", &[]))
        .unwrap_err();

    assert_eq!(err.kind(), storekit_core::ErrorKind::Internal);
    assert!(err.message().contains("NOT NULL"));
}
