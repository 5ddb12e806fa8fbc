//! Repository-layer toolkit over SQLite.
//! Typed predicates, composable query options, paging, transactions and a
//! cross-process mutex, all reporting one classified error type.

pub mod db;
pub mod error;
pub mod logging;
pub mod mutex;
pub mod pager;
pub mod repo;
pub mod transaction;

pub use db::migrations::{Migration, MigrationReport, Migrator};
pub use db::{DbError, Executor, QueryEvent, QueryHook, Session, SlowQueryLogger, StoreConfig};
pub use error::{ErrorKind, RepoError, RepoResult, Tag};
pub use logging::{default_log_level, init_logging, logging_status};
pub use mutex::Mutex;
pub use pager::{last_page_tag, walk, PageStep, Pager, PagerOptions};
pub use repo::{
    Condition, Dao, Direction, Filter, JsonEqValue, Model, Opts, Order, OrderExpr, Query,
    SoftDelete,
};
pub use transaction::{Transactional, Tx};

/// Liveness probe used by the CLI.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
