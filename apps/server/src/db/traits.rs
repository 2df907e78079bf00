//! Storage collaborator consumed by the search engine and collection service

use crate::{
    db::search::Predicate,
    models::{AnnotationRecord, CollectionRecord},
    Result,
};
use async_trait::async_trait;

/// Offset/limit slice of an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub offset: u64,
    /// `None` means every row after `offset`
    pub limit: Option<u64>,
}

impl Window {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

/// Annotation storage backend
///
/// Implementations evaluate a [`Predicate`] (every clause ANDed) against
/// stored annotations. Fetches are always ordered by surrogate key ascending,
/// which is the creation sequence.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Number of annotations matching the predicate, ignoring any window.
    async fn count(&self, predicate: &Predicate) -> Result<u64>;

    /// Matching annotations in key order, sliced by `window`.
    async fn fetch(&self, predicate: &Predicate, window: Window) -> Result<Vec<AnnotationRecord>>;

    /// Count and fetch observing the same data.
    ///
    /// The default runs the two calls back to back. Backends that can pin a
    /// snapshot should override it so `total` and the items never disagree.
    async fn count_and_fetch(
        &self,
        predicate: &Predicate,
        window: Window,
    ) -> Result<(u64, Vec<AnnotationRecord>)> {
        let total = self.count(predicate).await?;
        let items = self.fetch(predicate, window).await?;
        Ok((total, items))
    }

    /// Collection lookup plus `count_and_fetch`, all observing the same data.
    ///
    /// The default runs the calls back to back; snapshot-capable backends
    /// override it like `count_and_fetch`.
    async fn collection_members(
        &self,
        slug: &str,
        predicate: &Predicate,
        window: Window,
    ) -> Result<(Option<CollectionRecord>, u64, Vec<AnnotationRecord>)> {
        let collection = self.find_collection(slug).await?;
        let (total, items) = self.count_and_fetch(predicate, window).await?;
        Ok((collection, total, items))
    }

    /// Look up a collection by slug, including soft-deleted ones.
    ///
    /// # Returns
    /// * `Ok(Some(collection))` - Collection exists (check `deleted`)
    /// * `Ok(None)` - No collection has this slug
    async fn find_collection(&self, slug: &str) -> Result<Option<CollectionRecord>>;
}
