//! Ordered collection of predicates applied as AND-ed clauses.

use super::condition::Condition;
use super::query::Query;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Vec<Condition>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: Condition) {
        self.0.push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn into_conditions(self) -> Vec<Condition> {
        self.0
    }

    /// Adds every predicate to `query` as its own WHERE clause, in order.
    pub fn apply(&self, query: Query) -> Query {
        self.0
            .iter()
            .fold(query, |query, condition| query.filter(condition.fragment()))
    }
}

impl From<Vec<Condition>> for Filter {
    fn from(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }
}

impl FromIterator<Condition> for Filter {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
