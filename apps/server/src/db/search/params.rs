//! Search parameter parsing
//!
//! Turns raw `(name, value)` pairs into a validated [`QuerySpec`]:
//! - `collection`: collection slug
//! - `contains`: JSON containment pattern
//! - `range`, `fts`, `fts_phrase`: JSON objects keyed by field (may repeat; all are ANDed)
//! - `deleted`: `exclude` (default), `include` or `only`
//! - `offset`, `limit`: non-negative integers

use serde_json::Value as JsonValue;

use super::clause::{
    self, Clause, CollectionClause, ContainsClause, DeletedMode, FullTextClause, PhraseClause,
    RangeClause,
};
use crate::db::traits::Window;
use crate::{Error, Result};

/// Validated description of one search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub collection: Option<CollectionClause>,
    pub contains: Option<ContainsClause>,
    pub ranges: Vec<RangeClause>,
    pub full_text: Vec<FullTextClause>,
    pub phrases: Vec<PhraseClause>,
    pub deleted: DeletedMode,
    pub offset: u64,
    /// `None` returns every row after `offset`
    pub limit: Option<u64>,
}

impl QuerySpec {
    pub fn from_items(items: &[(String, String)]) -> Result<Self> {
        let mut spec = Self::default();
        let mut seen_single: Vec<&str> = Vec::new();

        for (key, value) in items {
            let key = key.as_str();
            if matches!(
                key,
                "collection" | "contains" | "deleted" | "offset" | "limit"
            ) {
                if seen_single.contains(&key) {
                    return Err(Error::invalid_query(format!(
                        "parameter '{key}' must not appear more than once"
                    )));
                }
                seen_single.push(key);
            }

            match key {
                "collection" => {
                    spec.collection = Some(CollectionClause {
                        slug: value.clone(),
                    });
                }
                "contains" => {
                    if let Clause::Contains(c) = clause::contains_clause(value)? {
                        spec.contains = Some(c);
                    }
                }
                "range" => {
                    for c in clause::range_clauses(value)? {
                        if let Clause::Range(r) = c {
                            spec.ranges.push(r);
                        }
                    }
                }
                "fts" => {
                    for c in clause::full_text_clauses(value)? {
                        if let Clause::FullText(f) = c {
                            spec.full_text.push(f);
                        }
                    }
                }
                "fts_phrase" => {
                    for c in clause::phrase_clauses(value)? {
                        if let Clause::Phrase(p) = c {
                            spec.phrases.push(p);
                        }
                    }
                }
                "deleted" => {
                    if let Clause::Deleted(mode) = clause::deleted_clause(value)? {
                        spec.deleted = mode;
                    }
                }
                "offset" => spec.offset = parse_count("offset", value)?,
                "limit" => spec.limit = Some(parse_count("limit", value)?),
                other => {
                    return Err(Error::invalid_query(format!(
                        "unknown search parameter '{other}'"
                    )))
                }
            }
        }

        Ok(spec)
    }

    pub fn in_collection(mut self, slug: impl Into<String>) -> Self {
        self.collection = Some(CollectionClause { slug: slug.into() });
        self
    }

    pub fn containing(mut self, pattern: JsonValue) -> Self {
        self.contains = Some(ContainsClause { pattern });
        self
    }

    pub fn with_deleted(mut self, mode: DeletedMode) -> Self {
        self.deleted = mode;
        self
    }

    pub fn with_window(mut self, offset: u64, limit: Option<u64>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// All clauses of the request, combined with AND.
    ///
    /// The deleted clause is always present; absent parameters contribute nothing.
    pub fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::default();
        if let Some(c) = &self.collection {
            predicate.push(Clause::Collection(c.clone()));
        }
        if let Some(c) = &self.contains {
            predicate.push(Clause::Contains(c.clone()));
        }
        for r in &self.ranges {
            predicate.push(Clause::Range(r.clone()));
        }
        for f in &self.full_text {
            predicate.push(Clause::FullText(f.clone()));
        }
        for p in &self.phrases {
            predicate.push(Clause::Phrase(p.clone()));
        }
        predicate.push(Clause::Deleted(self.deleted));
        predicate
    }

    pub fn window(&self) -> Window {
        Window {
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Ordered conjunction of clauses. An empty predicate matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of clauses per kind, in first-seen order.
    pub fn kind_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for clause in &self.clauses {
            match counts.iter_mut().find(|(kind, _)| *kind == clause.kind()) {
                Some((_, n)) => *n += 1,
                None => counts.push((clause.kind(), 1)),
            }
        }
        counts
    }
}

fn parse_count(name: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        Error::invalid_query(format!(
            "{name} must be a non-negative integer (got '{value}')"
        ))
    })
}
