//! Sort-order expressions.

use super::query::{quote_ident, Fragment, Query};
use crate::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};

/// Sort direction with explicit null placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    AscNullsFirst,
    AscNullsLast,
    Desc,
    DescNullsFirst,
    DescNullsLast,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::AscNullsFirst => "ASC NULLS FIRST",
            Self::AscNullsLast => "ASC NULLS LAST",
            Self::Desc => "DESC",
            Self::DescNullsFirst => "DESC NULLS FIRST",
            Self::DescNullsLast => "DESC NULLS LAST",
        }
    }

    /// Parses a direction keyword, ignoring case and extra whitespace.
    /// An empty string is `Asc`.
    pub fn parse(text: &str) -> RepoResult<Self> {
        let normalized = text
            .split_whitespace()
            .map(str::to_ascii_uppercase)
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "" | "ASC" => Ok(Self::Asc),
            "ASC NULLS FIRST" | "NULLS FIRST" => Ok(Self::AscNullsFirst),
            "ASC NULLS LAST" | "NULLS LAST" => Ok(Self::AscNullsLast),
            "DESC" => Ok(Self::Desc),
            "DESC NULLS FIRST" => Ok(Self::DescNullsFirst),
            "DESC NULLS LAST" => Ok(Self::DescNullsLast),
            _ => Err(RepoError::bad_request(format!(
                "unsupported sort direction `{text}`"
            ))),
        }
    }
}

/// One sort key bound to a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderExpr {
    Asc(String),
    AscNullsFirst(String),
    AscNullsLast(String),
    Desc(String),
    DescNullsFirst(String),
    DescNullsLast(String),
}

impl OrderExpr {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        let column = column.into();
        match direction {
            Direction::Asc => Self::Asc(column),
            Direction::AscNullsFirst => Self::AscNullsFirst(column),
            Direction::AscNullsLast => Self::AscNullsLast(column),
            Direction::Desc => Self::Desc(column),
            Direction::DescNullsFirst => Self::DescNullsFirst(column),
            Direction::DescNullsLast => Self::DescNullsLast(column),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Asc(column)
            | Self::AscNullsFirst(column)
            | Self::AscNullsLast(column)
            | Self::Desc(column)
            | Self::DescNullsFirst(column)
            | Self::DescNullsLast(column) => column,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Asc(_) => Direction::Asc,
            Self::AscNullsFirst(_) => Direction::AscNullsFirst,
            Self::AscNullsLast(_) => Direction::AscNullsLast,
            Self::Desc(_) => Direction::Desc,
            Self::DescNullsFirst(_) => Direction::DescNullsFirst,
            Self::DescNullsLast(_) => Direction::DescNullsLast,
        }
    }

    /// Rendered ORDER BY item, e.g. `"created_at" DESC NULLS LAST`.
    pub fn expression(&self) -> String {
        format!("{} {}", quote_ident(self.column()), self.direction().as_sql())
    }

    pub fn fragment(&self) -> Fragment {
        Fragment::new(self.expression(), Vec::new())
    }
}

/// Sort keys applied in sequence; the first is the primary key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order(Vec<OrderExpr>);

impl Order {
    pub fn new(exprs: Vec<OrderExpr>) -> Self {
        Self(exprs)
    }

    pub fn push(&mut self, expr: OrderExpr) {
        self.0.push(expr);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn exprs(&self) -> &[OrderExpr] {
        &self.0
    }

    pub fn apply(&self, query: Query) -> Query {
        self.0
            .iter()
            .fold(query, |query, expr| query.order_by(expr.fragment()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, OrderExpr};

    #[test]
    fn direction_parse_accepts_null_placement() {
        assert_eq!(Direction::parse(" desc  nulls last ").ok(), Some(Direction::DescNullsLast));
        assert_eq!(Direction::parse("").ok(), Some(Direction::Asc));
        assert!(Direction::parse("sideways").is_err());
    }

    #[test]
    fn expression_quotes_column() {
        let expr = OrderExpr::new("created_at", Direction::AscNullsFirst);
        assert_eq!(expr.expression(), "\"created_at\" ASC NULLS FIRST");
    }
}
