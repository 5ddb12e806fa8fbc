//! Connection bootstrap for store sessions.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections honor the configured busy timeout.

use super::{DbError, StoreConfig};
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

/// Opens the connection described by `config`.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub(super) fn open_connection(config: &StoreConfig) -> Result<Connection, DbError> {
    let started_at = Instant::now();
    let mode = if config.path.is_some() { "file" } else { "memory" };
    info!(
        "event=db_open module=db status=start mode={} app={}",
        mode, config.application_name
    );

    let opened = match config.path.as_deref() {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection, config: &StoreConfig) -> Result<(), DbError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(config.busy_timeout())?;
    Ok(())
}
