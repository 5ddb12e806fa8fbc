//! Command-line probe and migration runner for `storekit_core`.
//!
//! Usage:
//! - `storekit_cli ping` / `storekit_cli version`
//! - `storekit_cli migrate <db-file> <migrations-dir> [--clean]`
//!
//! `migrate` logs to `$STOREKIT_LOG_DIR`, or to `logs/` next to the database
//! file.

use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storekit_core::{default_log_level, init_logging, Migrator, RepoResult, Session, StoreConfig};

const LOG_DIR_ENV: &str = "STOREKIT_LOG_DIR";

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match args.first().map(String::as_str) {
        None | Some("ping") | Some("version") => {
            println!("storekit_core ping={}", storekit_core::ping());
            println!("storekit_core version={}", storekit_core::core_version());
            ExitCode::SUCCESS
        }
        Some("migrate") => match migrate(&args[1..]) {
            Ok(()) => ExitCode::SUCCESS,
            Err(message) => {
                error!("event=cli_migrate module=cli status=error error={message}");
                eprintln!("migrate failed: {message}");
                ExitCode::FAILURE
            }
        },
        Some(other) => {
            eprintln!("unknown command `{other}`; expected ping|version|migrate");
            ExitCode::from(2)
        }
    }
}

fn migrate(args: &[String]) -> Result<(), String> {
    let [db_path, dir, rest @ ..] = args else {
        return Err("usage: migrate <db-file> <migrations-dir> [--clean]".to_string());
    };
    let clean = match rest {
        [] => false,
        [flag] if flag == "--clean" => true,
        _ => return Err(format!("unexpected arguments: {}", rest.join(" "))),
    };

    let log_dir = log_dir_for(
        std::env::var_os(LOG_DIR_ENV).map(PathBuf::from),
        Path::new(db_path),
    )
    .map_err(|err| format!("cannot resolve log directory: {err}"))?;
    if let Err(err) = init_logging(default_log_level(), &log_dir) {
        eprintln!("logging disabled: {err}");
    }

    info!("event=cli_migrate module=cli status=start db={db_path} dir={dir} clean={clean}");
    run_migrations(db_path, dir, clean).map_err(|err| err.to_string())
}

fn log_dir_for(configured: Option<PathBuf>, db_path: &Path) -> std::io::Result<PathBuf> {
    let dir = match configured {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => db_path
            .parent()
            .map_or_else(PathBuf::new, Path::to_path_buf)
            .join("logs"),
    };
    if dir.is_absolute() {
        Ok(dir)
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

fn run_migrations(db_path: &str, dir: &str, clean: bool) -> RepoResult<()> {
    let mut migrator = Migrator::from_dir(dir)?;
    if clean {
        migrator = migrator.with_clean();
    }
    let mut session = Session::open(&StoreConfig::file(db_path))?;
    let report = migrator.run(&mut session)?;
    info!(
        "event=cli_migrate module=cli status=ok before={} after={}",
        report.before, report.after
    );
    println!(
        "schema version {} -> {} (latest {})",
        report.before,
        report.after,
        migrator.latest_version()
    );
    Ok(())
}
