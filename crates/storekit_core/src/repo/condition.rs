//! Typed predicate algebra compiled to parameterized SQL fragments.
//!
//! # Responsibility
//! - Model every supported predicate as one closed enum.
//! - Render each predicate as fragment text plus ordered parameters.
//!
//! # Invariants
//! - Parameters are emitted depth-first, left-to-right, matching placeholder
//!   order in the rendered text.
//! - Composite predicates parenthesize every child.
//! - Constructors reject malformed input; rendering never fails.

use super::query::{quote_ident, Fragment, IntoValue};
use super::unique::unique_last_wins;
use crate::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use serde_json::Value as JsonValue;

/// Typed right-hand side of a JSON path equality.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonEqValue {
    Int(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
    BigIntList(Vec<i64>),
}

/// One predicate over a table's columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { column: String, value: Value },
    /// Compares `LOWER(column)` with an already lowercased value.
    EqCaseInsensitive { column: String, value: String },
    Ne { column: String, value: Value },
    Lt { column: String, value: Value },
    Le { column: String, value: Value },
    Gt { column: String, value: Value },
    Ge { column: String, value: Value },
    Between { column: String, from: Value, to: Value },
    In { column: String, values: Vec<Value> },
    NotIn { column: String, values: Vec<Value> },
    Starts { column: String, value: String },
    Ends { column: String, value: String },
    /// Matches anywhere in the column cast to text.
    Contains { column: String, value: String },
    IsNull(String),
    NotNull(String),
    /// Every term must occur in the column.
    Match { column: String, terms: Vec<String> },
    /// Every term must occur in at least one of the columns, all in the same
    /// column.
    MatchMany { columns: Vec<String>, terms: Vec<String> },
    JsonPathEq { column: String, path: Vec<String>, value: JsonEqValue },
    /// Each top-level key must hold the given JSON value.
    JsonPathContains { column: String, pairs: Vec<(String, JsonValue)> },
    JsonPathContainsValue { column: String, path: Vec<String>, value: String },
    Raw { sql: String, params: Vec<Value> },
    Or(Vec<Condition>),
    And(Vec<Condition>),
    Not(Vec<Condition>),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl IntoValue) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into_value(),
        }
    }

    pub fn eq_ci(column: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self::EqCaseInsensitive {
            column: column.into(),
            value: value.as_ref().to_lowercase(),
        }
    }

    pub fn ne(column: impl Into<String>, value: impl IntoValue) -> Self {
        Self::Ne {
            column: column.into(),
            value: value.into_value(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl IntoValue) -> Self {
        Self::Lt {
            column: column.into(),
            value: value.into_value(),
        }
    }

    pub fn le(column: impl Into<String>, value: impl IntoValue) -> Self {
        Self::Le {
            column: column.into(),
            value: value.into_value(),
        }
    }

    pub fn gt(column: impl Into<String>, value: impl IntoValue) -> Self {
        Self::Gt {
            column: column.into(),
            value: value.into_value(),
        }
    }

    pub fn ge(column: impl Into<String>, value: impl IntoValue) -> Self {
        Self::Ge {
            column: column.into(),
            value: value.into_value(),
        }
    }

    pub fn between(column: impl Into<String>, from: impl IntoValue, to: impl IntoValue) -> Self {
        Self::Between {
            column: column.into(),
            from: from.into_value(),
            to: to.into_value(),
        }
    }

    /// Builds `Between` from a bound list, which must hold exactly two values.
    pub fn between_list(column: impl Into<String>, values: Vec<Value>) -> RepoResult<Self> {
        let column = column.into();
        let count = values.len();
        let [from, to]: [Value; 2] = values.try_into().map_err(|_| {
            RepoError::internal(format!(
                "between on `{column}` expects exactly 2 values, got {count}"
            ))
        })?;
        Ok(Self::Between { column, from, to })
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(IntoValue::into_value).collect(),
        }
    }

    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        Self::NotIn {
            column: column.into(),
            values: values.into_iter().map(IntoValue::into_value).collect(),
        }
    }

    pub fn starts(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Starts {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn ends(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Ends {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull(column.into())
    }

    /// Full-text style match of `text` against one column.
    ///
    /// # Errors
    /// - `BadRequest` when `text` has no search terms.
    pub fn matches(column: impl Into<String>, text: &str) -> RepoResult<Self> {
        Ok(Self::Match {
            column: column.into(),
            terms: search_terms(text)?,
        })
    }

    /// Full-text style match of `text` against several columns.
    ///
    /// # Errors
    /// - `BadRequest` when `text` has no search terms or no column is given.
    pub fn match_many<I, S>(text: &str, columns: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(RepoError::bad_request("match needs at least one column"));
        }
        Ok(Self::MatchMany {
            columns,
            terms: search_terms(text)?,
        })
    }

    /// # Errors
    /// - `BadRequest` when a path segment contains `"`.
    pub fn json_eq<I, S>(column: impl Into<String>, path: I, value: JsonEqValue) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::JsonPathEq {
            column: column.into(),
            path: path_segments(path)?,
            value,
        })
    }

    /// When a key repeats, its last value wins. Nested objects and arrays
    /// are compared structurally, so stored key order does not matter.
    ///
    /// # Errors
    /// - `BadRequest` when a key, at any depth, contains `"`.
    pub fn json_contains<I, S>(column: impl Into<String>, pairs: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = (S, JsonValue)>,
        S: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect::<Vec<_>>();
        for (key, value) in &pairs {
            check_segment(key)?;
            check_json_keys(value)?;
        }
        Ok(Self::JsonPathContains {
            column: column.into(),
            pairs: unique_last_wins(pairs, |(key, _)| key.clone()),
        })
    }

    /// # Errors
    /// - `BadRequest` when a path segment contains `"`.
    pub fn json_contains_value<I, S>(
        column: impl Into<String>,
        path: I,
        value: impl Into<String>,
    ) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::JsonPathContainsValue {
            column: column.into(),
            path: path_segments(path)?,
            value: value.into(),
        })
    }

    /// Literal fragment; nothing is validated.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Raw {
            sql: sql.into(),
            params,
        }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::Or(conditions)
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::And(conditions)
    }

    pub fn not(conditions: Vec<Condition>) -> Self {
        Self::Not(conditions)
    }

    /// Rendered fragment text.
    pub fn condition(&self) -> String {
        self.fragment().into_parts().0
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> Vec<Value> {
        self.fragment().into_parts().1
    }

    pub fn fragment(&self) -> Fragment {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render(&mut sql, &mut params);
        Fragment::new(sql, params)
    }

    fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Self::Eq { column, value } => binary(sql, params, column, "=", value),
            Self::Ne { column, value } => binary(sql, params, column, "!=", value),
            Self::Lt { column, value } => binary(sql, params, column, "<", value),
            Self::Le { column, value } => binary(sql, params, column, "<=", value),
            Self::Gt { column, value } => binary(sql, params, column, ">", value),
            Self::Ge { column, value } => binary(sql, params, column, ">=", value),
            Self::EqCaseInsensitive { column, value } => {
                sql.push_str(&format!("LOWER({}) = ?", quote_ident(column)));
                params.push(Value::Text(value.clone()));
            }
            Self::Between { column, from, to } => {
                sql.push_str(&format!("{} BETWEEN ? AND ?", quote_ident(column)));
                params.push(from.clone());
                params.push(to.clone());
            }
            Self::In { column, values } => {
                sql.push_str(&format!("{} IN ({})", quote_ident(column), placeholders(values.len())));
                params.extend(values.iter().cloned());
            }
            Self::NotIn { column, values } => {
                sql.push_str(&format!(
                    "{} NOT IN ({})",
                    quote_ident(column),
                    placeholders(values.len())
                ));
                params.extend(values.iter().cloned());
            }
            Self::Starts { column, value } => {
                sql.push_str(&format!("{} LIKE ?", quote_ident(column)));
                params.push(Value::Text(format!("{value}%")));
            }
            Self::Ends { column, value } => {
                sql.push_str(&format!("{} LIKE ?", quote_ident(column)));
                params.push(Value::Text(format!("%{value}")));
            }
            Self::Contains { column, value } => {
                sql.push_str(&format!("CAST({} AS TEXT) LIKE ?", quote_ident(column)));
                params.push(Value::Text(format!("%{value}%")));
            }
            Self::IsNull(column) => sql.push_str(&format!("{} IS NULL", quote_ident(column))),
            Self::NotNull(column) => sql.push_str(&format!("{} IS NOT NULL", quote_ident(column))),
            Self::Match { column, terms } => term_conjunction(sql, params, column, terms),
            Self::MatchMany { columns, terms } => {
                if columns.is_empty() {
                    sql.push_str("1 = 0");
                    return;
                }
                sql.push('(');
                for (index, column) in columns.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(" OR ");
                    }
                    term_conjunction(sql, params, column, terms);
                }
                sql.push(')');
            }
            Self::JsonPathEq {
                column,
                path,
                value,
            } => render_json_eq(sql, params, column, path, value),
            Self::JsonPathContains { column, pairs } => {
                if pairs.is_empty() {
                    sql.push_str("(1 = 1)");
                    return;
                }
                sql.push('(');
                for (index, (key, value)) in pairs.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(" AND ");
                    }
                    let mut path = String::from("$");
                    push_key(&mut path, key);
                    render_json_match(sql, params, column, &path, value);
                }
                sql.push(')');
            }
            Self::JsonPathContainsValue {
                column,
                path,
                value,
            } => {
                sql.push_str(&format!(
                    "CAST(json_extract({}, ?) AS TEXT) LIKE ?",
                    quote_ident(column)
                ));
                params.push(Value::Text(json_path(path)));
                params.push(Value::Text(format!("%{value}%")));
            }
            Self::Raw {
                sql: raw,
                params: raw_params,
            } => {
                sql.push_str(raw);
                params.extend(raw_params.iter().cloned());
            }
            Self::Or(children) => group(sql, params, "", " OR ", children, "(1 = 0)"),
            Self::And(children) => group(sql, params, "", " AND ", children, "(1 = 1)"),
            Self::Not(children) => group(sql, params, "NOT ", " AND ", children, "NOT (1 = 1)"),
        }
    }
}

fn binary(sql: &mut String, params: &mut Vec<Value>, column: &str, op: &str, value: &Value) {
    sql.push_str(&format!("{} {op} ?", quote_ident(column)));
    params.push(value.clone());
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn group(
    sql: &mut String,
    params: &mut Vec<Value>,
    prefix: &str,
    joiner: &str,
    children: &[Condition],
    empty: &str,
) {
    if children.is_empty() {
        sql.push_str(empty);
        return;
    }
    sql.push_str(prefix);
    sql.push('(');
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            sql.push_str(joiner);
        }
        sql.push('(');
        child.render(sql, params);
        sql.push(')');
    }
    sql.push(')');
}

fn term_conjunction(sql: &mut String, params: &mut Vec<Value>, column: &str, terms: &[String]) {
    if terms.is_empty() {
        sql.push_str("(1 = 0)");
        return;
    }
    let ident = quote_ident(column);
    sql.push('(');
    for (index, term) in terms.iter().enumerate() {
        if index > 0 {
            sql.push_str(" AND ");
        }
        sql.push_str(&format!("{ident} LIKE ?"));
        params.push(Value::Text(format!("%{term}%")));
    }
    sql.push(')');
}

fn render_json_eq(
    sql: &mut String,
    params: &mut Vec<Value>,
    column: &str,
    path: &[String],
    value: &JsonEqValue,
) {
    let extract = format!("json_extract({}, ?)", quote_ident(column));
    params.push(Value::Text(json_path(path)));
    match value {
        JsonEqValue::Int(number) => {
            sql.push_str(&format!("CAST({extract} AS INTEGER) = ?"));
            params.push(Value::Integer(i64::from(*number)));
        }
        JsonEqValue::BigInt(number) => {
            sql.push_str(&format!("CAST({extract} AS INTEGER) = ?"));
            params.push(Value::Integer(*number));
        }
        JsonEqValue::Float(number) => {
            sql.push_str(&format!("CAST({extract} AS REAL) = ?"));
            params.push(Value::Real(*number));
        }
        JsonEqValue::Text(text) => {
            sql.push_str(&format!("CAST({extract} AS TEXT) = ?"));
            params.push(Value::Text(text.clone()));
        }
        JsonEqValue::BigIntList(numbers) => {
            sql.push_str(&format!(
                "CAST({extract} AS INTEGER) IN ({})",
                placeholders(numbers.len())
            ));
            params.extend(numbers.iter().map(|number| Value::Integer(*number)));
        }
    }
}

/// Builds an SQLite JSON path; all-digit segments address array elements.
fn json_path(segments: &[String]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        if !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_digit()) {
            path.push_str(&format!("[{segment}]"));
        } else {
            push_key(&mut path, segment);
        }
    }
    path
}

fn push_key(path: &mut String, key: &str) {
    path.push_str(&format!(".\"{key}\""));
}

/// SQLite path labels end at the first `"`; such keys cannot be addressed.
fn check_segment(segment: &str) -> RepoResult<()> {
    if segment.contains('"') {
        return Err(RepoError::bad_request(format!(
            "json path segment `{segment}` must not contain a double quote"
        )));
    }
    Ok(())
}

fn path_segments<I, S>(path: I) -> RepoResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let segments: Vec<String> = path.into_iter().map(Into::into).collect();
    for segment in &segments {
        check_segment(segment)?;
    }
    Ok(segments)
}

fn check_json_keys(value: &JsonValue) -> RepoResult<()> {
    match value {
        JsonValue::Object(map) => {
            for (key, nested) in map {
                check_segment(key)?;
                check_json_keys(nested)?;
            }
            Ok(())
        }
        JsonValue::Array(items) => items.iter().try_for_each(check_json_keys),
        _ => Ok(()),
    }
}

/// Renders "the document at `path` equals `value`".
///
/// Objects match when every expected key matches and no other key remains;
/// arrays match element by element with equal length.
fn render_json_match(
    sql: &mut String,
    params: &mut Vec<Value>,
    column: &str,
    path: &str,
    value: &JsonValue,
) {
    let column_sql = quote_ident(column);
    match value {
        JsonValue::Null => {
            sql.push_str(&format!("json_type({column_sql}, ?) = 'null'"));
            params.push(Value::Text(path.to_string()));
        }
        JsonValue::Bool(flag) => {
            sql.push_str(&format!("json_type({column_sql}, ?) = '{flag}'"));
            params.push(Value::Text(path.to_string()));
        }
        JsonValue::Number(number) => {
            sql.push_str(&format!("json_extract({column_sql}, ?) = ?"));
            params.push(Value::Text(path.to_string()));
            params.push(match number.as_i64() {
                Some(integer) => Value::Integer(integer),
                None => Value::Real(number.as_f64().unwrap_or_default()),
            });
        }
        JsonValue::String(text) => {
            sql.push_str(&format!("json_extract({column_sql}, ?) = ?"));
            params.push(Value::Text(path.to_string()));
            params.push(Value::Text(text.clone()));
        }
        JsonValue::Array(items) => {
            sql.push_str(&format!(
                "(json_type({column_sql}, ?) = 'array' AND json_array_length({column_sql}, ?) = ?"
            ));
            params.push(Value::Text(path.to_string()));
            params.push(Value::Text(path.to_string()));
            params.push(Value::Integer(items.len() as i64));
            for (index, item) in items.iter().enumerate() {
                sql.push_str(" AND ");
                render_json_match(sql, params, column, &format!("{path}[{index}]"), item);
            }
            sql.push(')');
        }
        JsonValue::Object(map) => {
            sql.push_str(&format!(
                "(json_type({column_sql}, ?) = 'object' AND json_remove(json_extract({column_sql}, ?)"
            ));
            params.push(Value::Text(path.to_string()));
            params.push(Value::Text(path.to_string()));
            let mut nested = Vec::with_capacity(map.len());
            for (key, item) in map {
                let mut key_path = String::from("$");
                push_key(&mut key_path, key);
                sql.push_str(", ?");
                params.push(Value::Text(key_path));

                let mut item_path = path.to_string();
                push_key(&mut item_path, key);
                nested.push((item_path, item));
            }
            sql.push_str(") = '{}'");
            for (item_path, item) in nested {
                sql.push_str(" AND ");
                render_json_match(sql, params, column, &item_path, item);
            }
            sql.push(')');
        }
    }
}

fn search_terms(text: &str) -> RepoResult<Vec<String>> {
    let terms = text
        .split_whitespace()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return Err(RepoError::bad_request("search text has no terms"));
    }
    Ok(terms)
}
