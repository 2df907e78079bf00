//! SQL query builder for annotation searches.
//!
//! Renders a [`Predicate`] into Postgres SQL over the `annotation` and
//! `collection` tables. Every value travels as a positional bind; only
//! offset/limit integers are formatted into the statement.

use crate::db::search::Predicate;
use crate::db::traits::Window;

mod bind;
mod clauses;

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    TextArray(Vec<String>),
}

const FROM_CLAUSE: &str = "FROM annotation a JOIN collection c ON c.key = a.collection_key";

const SELECT_COLUMNS: &str = "SELECT a.key, a.slug, a.collection_key, c.slug AS collection_slug, \
     a.data, a.created, a.modified, a.deleted";

pub struct QueryBuilder<'a> {
    predicate: &'a Predicate,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(predicate: &'a Predicate) -> Self {
        Self { predicate }
    }

    /// Row query ordered by creation sequence and sliced by `window`.
    pub fn build_sql(&self, window: Window) -> (String, Vec<BindValue>) {
        let mut bind_params = Vec::new();
        let mut sql = format!("{SELECT_COLUMNS} {FROM_CLAUSE}");
        self.push_where(&mut sql, &mut bind_params);
        sql.push_str(" ORDER BY a.key ASC");

        if let Some(limit) = window.limit {
            sql.push_str(&format!(" LIMIT {}", clamp(limit)));
        }
        if window.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", clamp(window.offset)));
        }

        (sql, bind_params)
    }

    pub fn build_count_sql(&self) -> (String, Vec<BindValue>) {
        let mut bind_params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) {FROM_CLAUSE}");
        self.push_where(&mut sql, &mut bind_params);
        (sql, bind_params)
    }

    fn push_where(&self, sql: &mut String, bind_params: &mut Vec<BindValue>) {
        let conditions: Vec<String> = self
            .predicate
            .clauses()
            .iter()
            .filter_map(|clause| clauses::build_clause(clause, bind_params))
            .collect();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
    }
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
