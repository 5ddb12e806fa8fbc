//! Parameterized SQL fragments and the query they are applied to.
//!
//! # Invariants
//! - Identifiers are rendered inline as quoted identifiers; values are always
//!   `?` placeholders.
//! - A fragment's parameter list matches its placeholders in order.
//! - Rendered statements list WHERE params, then LIMIT, then OFFSET.

use crate::error::RepoResult;
use rusqlite::types::Value;
use std::sync::Arc;

/// SQL text with positional placeholders and its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    sql: String,
    params: Vec<Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

/// Conversion of caller values into bound parameters.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! into_value_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::from(self)
                }
            }
        )*
    };
}

into_value_via_from!(bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, String, Vec<u8>);

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

/// Quotes an identifier, splitting `table.column` into two quoted parts.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Caller-supplied query transform applied between filtering and paging.
pub type QueryFn = Arc<dyn Fn(Query) -> RepoResult<Query> + Send + Sync>;

/// Wraps a closure as a [`QueryFn`].
pub fn query_fn<F>(f: F) -> QueryFn
where
    F: Fn(Query) -> RepoResult<Query> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Statement under construction for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    columns: Vec<String>,
    wheres: Vec<Fragment>,
    orders: Vec<Fragment>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            wheres: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Selects only these columns. An empty list selects `*`.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one predicate; predicates are AND-combined.
    pub fn filter(mut self, fragment: Fragment) -> Self {
        self.wheres.push(fragment);
        self
    }

    /// Appends one sort key after the existing ones.
    pub fn order_by(mut self, fragment: Fragment) -> Self {
        self.orders.push(fragment);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn wheres(&self) -> &[Fragment] {
        &self.wheres
    }

    pub fn orders(&self) -> &[Fragment] {
        &self.orders
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    pub fn to_select_sql(&self) -> Fragment {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|column| quote_ident(column))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(&self.table));
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params);

        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            let mut first = true;
            for order in &self.orders {
                if !first {
                    sql.push_str(", ");
                }
                first = false;
                sql.push_str(order.sql());
                params.extend(order.params().iter().cloned());
            }
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                params.push(Value::Integer(limit));
                params.push(Value::Integer(offset));
            }
            (Some(limit), None) => {
                sql.push_str(" LIMIT ?");
                params.push(Value::Integer(limit));
            }
            (None, Some(offset)) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(Value::Integer(offset));
            }
            (None, None) => {}
        }

        Fragment::new(sql, params)
    }

    /// Counts matching rows; ordering and paging are ignored.
    pub fn to_count_sql(&self) -> Fragment {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table));
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params);
        Fragment::new(sql, params)
    }

    /// Updates matching rows. Assignment params precede WHERE params.
    pub fn to_update_sql(&self, assignments: &[Fragment]) -> Fragment {
        let mut sql = format!("UPDATE {} SET ", quote_ident(&self.table));
        let mut params = Vec::new();
        let mut first = true;
        for assignment in assignments {
            if !first {
                sql.push_str(", ");
            }
            first = false;
            sql.push_str(assignment.sql());
            params.extend(assignment.params().iter().cloned());
        }
        self.push_where(&mut sql, &mut params);
        Fragment::new(sql, params)
    }

    pub fn to_delete_sql(&self) -> Fragment {
        let mut sql = format!("DELETE FROM {}", quote_ident(&self.table));
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params);
        Fragment::new(sql, params)
    }

    fn push_where(&self, sql: &mut String, params: &mut Vec<Value>) {
        if self.wheres.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        let mut first = true;
        for fragment in &self.wheres {
            if !first {
                sql.push_str(" AND ");
            }
            first = false;
            sql.push('(');
            sql.push_str(fragment.sql());
            sql.push(')');
            params.extend(fragment.params().iter().cloned());
        }
    }
}
