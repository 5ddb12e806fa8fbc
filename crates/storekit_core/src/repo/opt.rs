//! Composable query options.
//!
//! # Responsibility
//! - Collect predicates, custom transforms, paging and sorting in one value.
//! - Apply them to a [`Query`] in a fixed order.
//!
//! # Invariants
//! - Builder methods consume `self` and return a new value; a built `Opts` is
//!   never mutated by later calls on a clone.
//! - `apply` runs filter, then custom transforms in insertion order, then
//!   paging, then sorting.
//! - The first failing custom transform aborts the pipeline.

use super::condition::{Condition, JsonEqValue};
use super::filter::Filter;
use super::order::{Direction, Order, OrderExpr};
use super::query::{IntoValue, Query, QueryFn};
use crate::error::{RepoError, RepoResult};
use crate::pager::Pager;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use serde_json::Value as JsonValue;
use std::fmt::{Debug, Formatter};

static ORDER_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S+)(?:\s+(.*?))?\s*$").expect("valid order rule regex")
});

/// Option set consumed by data-access operations.
#[derive(Clone, Default)]
pub struct Opts {
    page: i32,
    page_size: i32,
    sort_column: Option<String>,
    sort_direction: Option<Direction>,
    filter: Filter,
    fns: Vec<QueryFn>,
}

impl Opts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.condition(Condition::eq(column, value))
    }

    /// Case-insensitive equality.
    pub fn eq_ci(self, column: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.condition(Condition::eq_ci(column, value))
    }

    pub fn ne(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.condition(Condition::ne(column, value))
    }

    pub fn lt(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.condition(Condition::lt(column, value))
    }

    pub fn le(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.condition(Condition::le(column, value))
    }

    pub fn gt(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.condition(Condition::gt(column, value))
    }

    pub fn ge(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.condition(Condition::ge(column, value))
    }

    pub fn between(
        self,
        column: impl Into<String>,
        from: impl IntoValue,
        to: impl IntoValue,
    ) -> Self {
        self.condition(Condition::between(column, from, to))
    }

    pub fn in_list<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        self.condition(Condition::is_in(column, values))
    }

    /// Like [`Opts::in_list`], but adds nothing for an empty list.
    pub fn may_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        let values: Vec<Value> = values.into_iter().map(IntoValue::into_value).collect();
        if values.is_empty() {
            return self;
        }
        self.condition(Condition::is_in(column, values))
    }

    pub fn not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        self.condition(Condition::not_in(column, values))
    }

    pub fn starts(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition(Condition::starts(column, value))
    }

    pub fn ends(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition(Condition::ends(column, value))
    }

    pub fn contains(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition(Condition::contains(column, value))
    }

    pub fn matches(self, column: impl Into<String>, text: &str) -> RepoResult<Self> {
        Ok(self.condition(Condition::matches(column, text)?))
    }

    pub fn match_many<I, S>(self, text: &str, columns: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.condition(Condition::match_many(text, columns)?))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.condition(Condition::is_null(column))
    }

    pub fn not_null(self, column: impl Into<String>) -> Self {
        self.condition(Condition::not_null(column))
    }

    pub fn json_eq<I, S>(
        self,
        column: impl Into<String>,
        path: I,
        value: JsonEqValue,
    ) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.condition(Condition::json_eq(column, path, value)?))
    }

    pub fn json_contains<I, S>(self, column: impl Into<String>, pairs: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = (S, JsonValue)>,
        S: Into<String>,
    {
        Ok(self.condition(Condition::json_contains(column, pairs)?))
    }

    pub fn json_contains_value<I, S>(
        self,
        column: impl Into<String>,
        path: I,
        value: impl Into<String>,
    ) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.condition(Condition::json_contains_value(column, path, value)?))
    }

    pub fn raw(self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.condition(Condition::raw(sql, params))
    }

    /// Adds the predicates of `group` joined with `OR`.
    pub fn or(self, group: Opts) -> Self {
        self.condition(Condition::or(group.filter.into_conditions()))
    }

    /// Adds the predicates of `group` as one parenthesized `AND` group.
    pub fn and(self, group: Opts) -> Self {
        self.condition(Condition::and(group.filter.into_conditions()))
    }

    /// Adds the negation of the predicates of `group` joined with `AND`.
    pub fn not(self, group: Opts) -> Self {
        self.condition(Condition::not(group.filter.into_conditions()))
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn page(mut self, page: i32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, size: i32) -> Self {
        self.page_size = size;
        self
    }

    /// Alias of [`Opts::page_size`].
    pub fn limit(self, size: i32) -> Self {
        self.page_size(size)
    }

    pub fn paging(self, page: i32, size: i32) -> Self {
        self.page(page).page_size(size)
    }

    pub fn asc(self, column: impl Into<String>) -> Self {
        self.sort(column, Direction::Asc)
    }

    pub fn desc(self, column: impl Into<String>) -> Self {
        self.sort(column, Direction::Desc)
    }

    pub fn sort(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.sort_column = Some(column.into());
        self.sort_direction = Some(direction);
        self
    }

    /// Parses `"column [ASC|DESC] [NULLS FIRST|NULLS LAST]"`.
    ///
    /// # Errors
    /// - `BadRequest` for an empty rule or an unknown direction.
    pub fn order(self, rule: &str) -> RepoResult<Self> {
        let captures = ORDER_RULE
            .captures(rule)
            .ok_or_else(|| RepoError::bad_request(format!("unknown order rule `{rule}`")))?;
        let column = captures.get(1).map_or("", |m| m.as_str()).to_string();
        let direction = Direction::parse(captures.get(2).map_or("", |m| m.as_str()))
            .map_err(|err| err.with_message(format!("unknown order rule `{rule}`")))?;
        Ok(self.sort(column, direction))
    }

    /// Adds a custom transform, run after the filter and before paging.
    pub fn query_fn(mut self, f: QueryFn) -> Self {
        self.fns.push(f);
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn page_value(&self) -> i32 {
        self.page
    }

    pub fn page_size_value(&self) -> i32 {
        self.page_size
    }

    pub fn sort_column(&self) -> Option<&str> {
        self.sort_column.as_deref()
    }

    pub fn sort_direction(&self) -> Option<Direction> {
        self.sort_direction
    }

    pub fn is_filter(&self) -> bool {
        !self.filter.is_empty()
    }

    pub fn is_fn(&self) -> bool {
        !self.fns.is_empty()
    }

    pub fn is_paging(&self) -> bool {
        self.page > 0 || self.page_size > 0
    }

    pub fn is_sorting(&self) -> bool {
        self.sort_column.is_some() && self.sort_direction.is_some()
    }

    /// Applies filter, custom transforms, paging and sorting, in that order.
    pub fn apply(&self, query: Query) -> RepoResult<Query> {
        let query = self.apply_filter(query);
        let query = self.apply_fn(query)?;
        Ok(self.apply_paging(query))
    }

    /// Adds only the WHERE predicates.
    pub fn apply_filter(&self, query: Query) -> Query {
        if !self.is_filter() {
            return query;
        }
        self.filter.apply(query)
    }

    /// Runs only the custom transforms.
    pub fn apply_fn(&self, query: Query) -> RepoResult<Query> {
        self.fns.iter().try_fold(query, |query, f| f(query))
    }

    /// Adds LIMIT/OFFSET and the sort key.
    pub fn apply_paging(&self, mut query: Query) -> Query {
        if self.is_paging() {
            query = Pager::with_page_size(self.page, self.page_size).apply(query);
        }
        if let (Some(column), Some(direction)) = (&self.sort_column, self.sort_direction) {
            query = Order::new(vec![OrderExpr::new(column.clone(), direction)]).apply(query);
        }
        query
    }
}

impl Debug for Opts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opts")
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("sort_column", &self.sort_column)
            .field("sort_direction", &self.sort_direction)
            .field("filter", &self.filter)
            .field("fns", &self.fns.len())
            .finish()
    }
}

/// [`Opts::apply`]; `None` leaves the query untouched.
pub fn apply(opts: Option<&Opts>, query: Query) -> RepoResult<Query> {
    match opts {
        Some(opts) => opts.apply(query),
        None => Ok(query),
    }
}

pub fn apply_filter(opts: Option<&Opts>, query: Query) -> Query {
    match opts {
        Some(opts) => opts.apply_filter(query),
        None => query,
    }
}

pub fn apply_fn(opts: Option<&Opts>, query: Query) -> RepoResult<Query> {
    match opts {
        Some(opts) => opts.apply_fn(query),
        None => Ok(query),
    }
}

pub fn apply_paging(opts: Option<&Opts>, query: Query) -> Query {
    match opts {
        Some(opts) => opts.apply_paging(query),
        None => query,
    }
}
