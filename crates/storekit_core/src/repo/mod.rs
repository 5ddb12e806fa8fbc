//! Query composition and generic data access.
//!
//! # Responsibility
//! - Model predicates and sort keys as typed values compiled to fragments.
//! - Compose them with paging and custom transforms through [`Opts`].
//! - Execute the result through [`Dao`] against an explicit executor.
//!
//! # Invariants
//! - Callers never concatenate SQL; identifiers are quoted and values bound.
//! - Fragment parameter order always matches placeholder order.

mod condition;
mod dao;
mod filter;
pub mod opt;
mod order;
mod query;
mod unique;

pub use condition::{Condition, JsonEqValue};
pub use dao::{Dao, Model, SoftDelete};
pub use filter::Filter;
pub use opt::Opts;
pub use order::{Direction, Order, OrderExpr};
pub use query::{query_fn, quote_ident, Fragment, IntoValue, Query, QueryFn};
pub use unique::unique_last_wins;
