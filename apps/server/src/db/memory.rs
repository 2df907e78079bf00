//! In-process annotation store
//!
//! Evaluates predicates in Rust with the same semantics the Postgres store
//! renders into SQL. Used by the test suites and for embedding without a
//! database.

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::db::search::clause::{
    decimal_from_number, Clause, FullTextClause, PhraseClause, RangeBound, RangeClause,
    RangeField, TextOperator,
};
use crate::db::search::text::{indexed_texts, tokenize};
use crate::db::search::Predicate;
use crate::db::traits::{AnnotationStore, Window};
use crate::models::{AnnotationRecord, CollectionRecord};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct MemoryState {
    collections: Vec<CollectionRecord>,
    annotations: Vec<AnnotationRecord>,
    next_key: i64,
}

impl MemoryState {
    fn allocate_key(&mut self) -> i64 {
        self.next_key += 1;
        self.next_key
    }

    fn collection(&self, slug: &str) -> Option<&CollectionRecord> {
        self.collections.iter().find(|c| c.slug == slug)
    }

    fn annotation_mut(&mut self, collection: &str, slug: &str) -> Result<&mut AnnotationRecord> {
        self.annotations
            .iter_mut()
            .find(|a| a.collection_slug == collection && a.slug == slug)
            .ok_or_else(|| Error::NotFound(format!("annotation {collection}/{slug}")))
    }

    fn matching(&self, predicate: &Predicate) -> Vec<&AnnotationRecord> {
        let mut rows: Vec<&AnnotationRecord> = self
            .annotations
            .iter()
            .filter(|record| record_matches(predicate, record))
            .collect();
        rows.sort_by_key(|record| record.key);
        rows
    }
}

/// Annotation store held in memory behind a tokio `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnnotationStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection; a missing slug is replaced by a random UUID.
    pub async fn create_collection(
        &self,
        slug: Option<&str>,
        data: JsonValue,
    ) -> Result<CollectionRecord> {
        self.create_collection_at(slug, data, Utc::now()).await
    }

    pub async fn create_collection_at(
        &self,
        slug: Option<&str>,
        data: JsonValue,
        created: DateTime<Utc>,
    ) -> Result<CollectionRecord> {
        let mut state = self.state.write().await;
        let slug = slug.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
        if state.collection(&slug).is_some() {
            return Err(Error::Other(anyhow!("collection '{slug}' already exists")));
        }
        let record = CollectionRecord {
            key: state.allocate_key(),
            slug,
            data,
            created,
            modified: None,
            deleted: false,
        };
        state.collections.push(record.clone());
        Ok(record)
    }

    /// Add an annotation to an existing, non-deleted collection.
    pub async fn create_annotation(
        &self,
        collection_slug: &str,
        slug: Option<&str>,
        data: JsonValue,
    ) -> Result<AnnotationRecord> {
        self.create_annotation_at(collection_slug, slug, data, Utc::now())
            .await
    }

    pub async fn create_annotation_at(
        &self,
        collection_slug: &str,
        slug: Option<&str>,
        data: JsonValue,
        created: DateTime<Utc>,
    ) -> Result<AnnotationRecord> {
        let mut state = self.state.write().await;
        let collection = state
            .collection(collection_slug)
            .ok_or_else(|| Error::NotFound(format!("collection {collection_slug}")))?;
        if collection.deleted {
            return Err(Error::CollectionDeleted {
                slug: collection_slug.to_string(),
            });
        }
        let collection_key = collection.key;
        let slug = slug.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
        if state
            .annotations
            .iter()
            .any(|a| a.collection_key == collection_key && a.slug == slug)
        {
            return Err(Error::Other(anyhow!(
                "annotation '{collection_slug}/{slug}' already exists"
            )));
        }
        let record = AnnotationRecord {
            key: state.allocate_key(),
            slug,
            collection_key,
            collection_slug: collection_slug.to_string(),
            data,
            created,
            modified: None,
            deleted: false,
        };
        state.annotations.push(record.clone());
        Ok(record)
    }

    /// Replace an annotation's document and stamp `modified`.
    pub async fn update_annotation_at(
        &self,
        collection_slug: &str,
        slug: &str,
        data: JsonValue,
        modified: DateTime<Utc>,
    ) -> Result<AnnotationRecord> {
        let mut state = self.state.write().await;
        let record = state.annotation_mut(collection_slug, slug)?;
        record.data = data;
        record.modified = Some(modified);
        Ok(record.clone())
    }

    pub async fn soft_delete_annotation(&self, collection_slug: &str, slug: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.annotation_mut(collection_slug, slug)?.deleted = true;
        Ok(())
    }

    /// Soft-delete a collection. Only allowed once it owns no visible annotations.
    pub async fn soft_delete_collection(&self, slug: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let key = state
            .collection(slug)
            .map(|c| c.key)
            .ok_or_else(|| Error::NotFound(format!("collection {slug}")))?;
        if state
            .annotations
            .iter()
            .any(|a| a.collection_key == key && !a.deleted)
        {
            return Err(Error::Other(anyhow!(
                "collection '{slug}' still has annotations"
            )));
        }
        if let Some(collection) = state.collections.iter_mut().find(|c| c.key == key) {
            collection.deleted = true;
        }
        Ok(())
    }
}

#[async_trait]
impl AnnotationStore for InMemoryAnnotationStore {
    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.matching(predicate).len() as u64)
    }

    async fn fetch(&self, predicate: &Predicate, window: Window) -> Result<Vec<AnnotationRecord>> {
        let state = self.state.read().await;
        Ok(apply_window(state.matching(predicate), window))
    }

    async fn count_and_fetch(
        &self,
        predicate: &Predicate,
        window: Window,
    ) -> Result<(u64, Vec<AnnotationRecord>)> {
        // One read guard for both, so no writer can interleave.
        let state = self.state.read().await;
        let rows = state.matching(predicate);
        let total = rows.len() as u64;
        Ok((total, apply_window(rows, window)))
    }

    async fn collection_members(
        &self,
        slug: &str,
        predicate: &Predicate,
        window: Window,
    ) -> Result<(Option<CollectionRecord>, u64, Vec<AnnotationRecord>)> {
        let state = self.state.read().await;
        let rows = state.matching(predicate);
        let total = rows.len() as u64;
        Ok((
            state.collection(slug).cloned(),
            total,
            apply_window(rows, window),
        ))
    }

    async fn find_collection(&self, slug: &str) -> Result<Option<CollectionRecord>> {
        let state = self.state.read().await;
        Ok(state.collection(slug).cloned())
    }
}

fn apply_window(rows: Vec<&AnnotationRecord>, window: Window) -> Vec<AnnotationRecord> {
    let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
    let limit = window
        .limit
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    rows.into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect()
}

/// Whether `record` satisfies every clause of `predicate`.
pub fn record_matches(predicate: &Predicate, record: &AnnotationRecord) -> bool {
    predicate
        .clauses()
        .iter()
        .all(|clause| clause_matches(clause, record))
}

fn clause_matches(clause: &Clause, record: &AnnotationRecord) -> bool {
    match clause {
        Clause::Collection(c) => record.collection_slug == c.slug,
        Clause::Contains(c) => json_contains(&record.data, &c.pattern, true),
        Clause::Range(r) => range_matches(r, record),
        Clause::FullText(f) => full_text_matches(f, &record.data),
        Clause::Phrase(p) => phrase_matches(p, &record.data),
        Clause::Deleted(mode) => mode.admits(record.deleted),
    }
}

/// Structural containment with jsonb `@>` semantics.
fn json_contains(doc: &JsonValue, pattern: &JsonValue, top_level: bool) -> bool {
    match (doc, pattern) {
        (JsonValue::Object(doc), JsonValue::Object(pattern)) => pattern
            .iter()
            .all(|(k, pv)| doc.get(k).is_some_and(|dv| json_contains(dv, pv, false))),
        (JsonValue::Array(doc), JsonValue::Array(pattern)) => pattern
            .iter()
            .all(|pv| doc.iter().any(|dv| json_contains(dv, pv, false))),
        (JsonValue::Array(doc), scalar) if top_level && !scalar.is_object() => {
            doc.iter().any(|dv| scalar_eq(dv, scalar))
        }
        (doc, pattern) => scalar_eq(doc, pattern),
    }
}

fn scalar_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            match (decimal_from_number(x), decimal_from_number(y)) {
                (Some(x), Some(y)) => x == y,
                _ => x == y,
            }
        }
        (JsonValue::Object(_) | JsonValue::Array(_), _)
        | (_, JsonValue::Object(_) | JsonValue::Array(_)) => false,
        _ => a == b,
    }
}

fn range_matches(clause: &RangeClause, record: &AnnotationRecord) -> bool {
    let ordering = match &clause.field {
        RangeField::Created => timestamp_ordering(Some(&record.created), &clause.bound),
        RangeField::Modified => timestamp_ordering(record.modified.as_ref(), &clause.bound),
        RangeField::Data(path) => path
            .lookup(&record.data)
            .and_then(|value| value_ordering(value, &clause.bound)),
    };
    ordering.is_some_and(|o| clause.op.accepts(o))
}

fn timestamp_ordering(stored: Option<&DateTime<Utc>>, bound: &RangeBound) -> Option<Ordering> {
    match (stored, bound) {
        (Some(stored), RangeBound::Timestamp(bound)) => Some(stored.cmp(bound)),
        _ => None,
    }
}

/// Typed comparison; `None` when the stored value's type differs from the bound's.
fn value_ordering(stored: &JsonValue, bound: &RangeBound) -> Option<Ordering> {
    match (stored, bound) {
        (JsonValue::Number(n), RangeBound::Number(bound)) => {
            decimal_from_number(n).map(|stored| stored.cmp(bound))
        }
        (JsonValue::String(s), RangeBound::Text(bound)) => Some(s.as_str().cmp(bound.as_str())),
        (JsonValue::Bool(b), RangeBound::Bool(bound)) => Some(b.cmp(bound)),
        _ => None,
    }
}

fn full_text_matches(clause: &FullTextClause, data: &JsonValue) -> bool {
    let Some(value) = clause.field.lookup(data) else {
        return false;
    };
    let words: Vec<String> = indexed_texts(value)
        .iter()
        .flat_map(|text| tokenize(text))
        .collect();
    let term_matches = |term: &String| {
        words.iter().any(|word| {
            if clause.prefix {
                word.starts_with(term.as_str())
            } else {
                word == term
            }
        })
    };
    match clause.operator {
        TextOperator::And => clause.terms.iter().all(term_matches),
        TextOperator::Or => clause.terms.iter().any(term_matches),
    }
}

fn phrase_matches(clause: &PhraseClause, data: &JsonValue) -> bool {
    let Some(value) = clause.field.lookup(data) else {
        return false;
    };
    indexed_texts(value)
        .iter()
        .any(|text| phrase_in_words(&tokenize(text), &clause.terms, clause.distance))
}

/// Terms occur in order, each exactly `distance` positions after the previous
/// one (adjacent when `distance` is 0).
fn phrase_in_words(words: &[String], terms: &[String], distance: u32) -> bool {
    let Some((first, rest)) = terms.split_first() else {
        return false;
    };
    let step = distance.max(1) as usize;
    let mut frontier: Vec<usize> = positions(words, first);
    for term in rest {
        frontier = positions(words, term)
            .into_iter()
            .filter(|&pos| pos >= step && frontier.contains(&(pos - step)))
            .collect();
        if frontier.is_empty() {
            return false;
        }
    }
    !frontier.is_empty()
}

fn positions(words: &[String], term: &str) -> Vec<usize> {
    words
        .iter()
        .enumerate()
        .filter(|(_, word)| word.as_str() == term)
        .map(|(i, _)| i)
        .collect()
}
