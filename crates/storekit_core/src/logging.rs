//! File logging bootstrap for storekit hosts.
//!
//! # Responsibility
//! - Start one rotating file logger per process.
//! - Report which level and directory are active.
//!
//! # Invariants
//! - Repeating initialization with the same settings is a no-op.
//! - Switching level or directory after start is rejected.
//! - Initialization never panics.

use crate::error::{RepoError, RepoResult};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "storekit";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 8 * 1024 * 1024;
const MAX_LOG_FILES: usize = 4;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` into the absolute directory `log_dir`.
///
/// # Errors
/// - `BadRequest` for an unknown level, a relative or empty directory, or a
///   call that conflicts with the running logger.
/// - `Internal` when the directory or the logger backend cannot be set up.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> RepoResult<()> {
    let level = parse_level(level)?;
    let log_dir = checked_log_dir(log_dir.as_ref())?;

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(level, &log_dir))?;
    if active.log_dir != log_dir {
        return Err(RepoError::bad_request(format!(
            "logging already writes to `{}`, cannot switch to `{}`",
            active.log_dir.display(),
            log_dir.display()
        )));
    }
    if active.level != level {
        return Err(RepoError::bad_request(format!(
            "logging already runs at `{}`, cannot switch to `{level}`",
            active.level
        )));
    }
    Ok(())
}

/// Active `(level, log_dir)`, or `None` before [`init_logging`] succeeded.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, log_dir: &Path) -> RepoResult<ActiveLogger> {
    std::fs::create_dir_all(log_dir).map_err(|err| {
        RepoError::internal(format!(
            "cannot create log directory `{}`: {err}",
            log_dir.display()
        ))
    })?;

    let handle = Logger::try_with_str(level)
        .map_err(|err| RepoError::bad_request(format!("invalid log level `{level}`: {err}")))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| RepoError::internal(format!("cannot start logger: {err}")))?;

    info!(
        "event=logging_start module=logging status=ok level={} log_dir={} version={}",
        level,
        log_dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> RepoResult<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(RepoError::bad_request(format!(
            "unknown log level `{other}`"
        ))),
    }
}

fn checked_log_dir(log_dir: &Path) -> RepoResult<PathBuf> {
    if log_dir.as_os_str().is_empty() {
        return Err(RepoError::bad_request("log directory cannot be empty"));
    }
    if !log_dir.is_absolute() {
        return Err(RepoError::bad_request(format!(
            "log directory must be absolute, got `{}`",
            log_dir.display()
        )));
    }
    Ok(log_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{checked_log_dir, init_logging, logging_status, parse_level};
    use std::path::Path;

    #[test]
    fn parse_level_normalizes_case_and_aliases() {
        assert_eq!(parse_level(" WARNING ").ok(), Some("warn"));
        assert_eq!(parse_level("Trace").ok(), Some("trace"));
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        assert!(checked_log_dir(Path::new("logs/dev")).is_err());
        assert!(checked_log_dir(Path::new("")).is_err());
    }

    #[test]
    fn init_is_idempotent_and_rejects_switching() {
        let first = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");

        init_logging("info", first.path()).expect("first init");
        init_logging("info", first.path()).expect("same settings are a no-op");
        assert!(init_logging("debug", first.path()).is_err());
        assert!(init_logging("info", second.path()).is_err());

        let (level, dir) = logging_status().expect("logging is active");
        assert_eq!(level, "info");
        assert_eq!(dir, first.path());
    }
}
