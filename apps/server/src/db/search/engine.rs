//! Search execution
//!
//! The SearchEngine turns a [`QuerySpec`] into one predicate, then asks the
//! store for the total and the windowed rows in a single snapshot.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::db::search::{Predicate, QuerySpec};
use crate::db::traits::AnnotationStore;
use crate::metrics;
use crate::models::{AnnotationRecord, CollectionRecord};
use crate::Result;

/// Search results from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Matching annotations after offset/limit, in creation order
    pub items: Vec<AnnotationRecord>,
    /// Matching annotations before offset/limit
    pub total: u64,
}

/// Executes annotation searches against a storage backend
pub struct SearchEngine<S: AnnotationStore> {
    store: Arc<S>,
}

impl<S: AnnotationStore> Clone for SearchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AnnotationStore> SearchEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run a search.
    ///
    /// Every present filter becomes one clause; all clauses are ANDed. The
    /// deleted-visibility clause is always applied (default: exclude).
    #[tracing::instrument(
        name = "annotation_search",
        skip_all,
        fields(offset = spec.offset, limit = ?spec.limit, clauses = tracing::field::Empty)
    )]
    pub async fn search(&self, spec: &QuerySpec) -> Result<SearchResult> {
        let start = Instant::now();
        let predicate = prepare(spec);

        let result = self
            .store
            .count_and_fetch(&predicate, spec.window())
            .await
            .map(|(total, items)| SearchResult { items, total });

        observe(&result, start);
        result
    }

    /// Search the members of collection `slug` and load the collection record
    /// from the same snapshot.
    ///
    /// `spec` is restricted to the collection; the record is `None` when no
    /// collection has this slug.
    #[tracing::instrument(
        name = "collection_search",
        skip_all,
        fields(slug = %slug, offset = spec.offset, limit = ?spec.limit, clauses = tracing::field::Empty)
    )]
    pub async fn search_collection(
        &self,
        slug: &str,
        spec: &QuerySpec,
    ) -> Result<(Option<CollectionRecord>, SearchResult)> {
        let start = Instant::now();
        let spec = spec.clone().in_collection(slug);
        let predicate = prepare(&spec);

        let outcome = self
            .store
            .collection_members(slug, &predicate, spec.window())
            .await;
        let (collection, result) = match outcome {
            Ok((collection, total, items)) => (collection, Ok(SearchResult { items, total })),
            Err(e) => (None, Err(e)),
        };

        observe(&result, start);
        Ok((collection, result?))
    }

    /// Parse raw `(name, value)` parameters and run the search.
    pub async fn search_items(&self, items: &[(String, String)]) -> Result<SearchResult> {
        let spec = QuerySpec::from_items(items)?;
        self.search(&spec).await
    }
}

fn observe(result: &Result<SearchResult>, start: Instant) {
    metrics::SEARCH_TOTAL
        .with_label_values(&[metrics::status_label(result)])
        .inc();
    metrics::SEARCH_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());

    match result {
        Ok(found) => {
            metrics::SEARCH_RESULTS.observe(found.items.len() as f64);
            tracing::debug!(
                total = found.total,
                returned = found.items.len(),
                "Search completed"
            );
        }
        Err(e) => tracing::warn!(error = %e, kind = e.kind(), "Search failed"),
    }
}

fn prepare(spec: &QuerySpec) -> Predicate {
    let predicate = spec.predicate();
    tracing::Span::current().record("clauses", predicate.len());
    for (kind, n) in predicate.kind_counts() {
        metrics::SEARCH_CLAUSES
            .with_label_values(&[kind])
            .observe(n as f64);
    }
    predicate
}
