use std::sync::Arc;

use anyhow::Context as _;
use chrono::Duration;
use explicates::db::{InMemoryAnnotationStore, SearchEngine};
use explicates::models::{AnnotationRecord, CollectionRecord};
use explicates::services::{CollectionService, RenderContext};
use serde_json::{json, Value};

use super::builders::{collection_data, AnnotationBuilder};
use super::shared::{frozen_time, init_tracing};

pub const BASE_URL: &str = "https://example.org/annotations";

pub fn render_context() -> RenderContext {
    RenderContext::new(
        BASE_URL,
        json!({"id": "https://example.org/generator", "type": "Software"}),
        frozen_time(),
    )
}

/// In-memory store with helpers for seeding deterministic data.
pub struct TestStore {
    pub store: Arc<InMemoryAnnotationStore>,
}

impl TestStore {
    pub fn new() -> Self {
        init_tracing();
        Self {
            store: Arc::new(InMemoryAnnotationStore::new()),
        }
    }

    pub fn engine(&self) -> SearchEngine<InMemoryAnnotationStore> {
        SearchEngine::new(Arc::clone(&self.store))
    }

    pub fn collections(
        &self,
        per_page: usize,
    ) -> anyhow::Result<CollectionService<InMemoryAnnotationStore>> {
        CollectionService::new(self.engine(), per_page).context("build collection service")
    }

    pub async fn collection(&self, slug: &str) -> anyhow::Result<CollectionRecord> {
        self.store
            .create_collection_at(Some(slug), collection_data(slug), frozen_time())
            .await
            .with_context(|| format!("create collection {slug}"))
    }

    pub async fn annotate(
        &self,
        collection: &str,
        slug: &str,
        data: Value,
    ) -> anyhow::Result<AnnotationRecord> {
        self.store
            .create_annotation_at(collection, Some(slug), data, frozen_time())
            .await
            .with_context(|| format!("create annotation {collection}/{slug}"))
    }

    /// Annotation created `days` after the frozen instant.
    pub async fn annotate_on_day(
        &self,
        collection: &str,
        slug: &str,
        days: i64,
    ) -> anyhow::Result<AnnotationRecord> {
        self.store
            .create_annotation_at(
                collection,
                Some(slug),
                AnnotationBuilder::new().build(),
                frozen_time() + Duration::days(days),
            )
            .await
            .with_context(|| format!("create annotation {collection}/{slug}"))
    }

    /// `n` default annotations named `anno-000`, `anno-001`, ...
    pub async fn annotate_many(
        &self,
        collection: &str,
        n: usize,
    ) -> anyhow::Result<Vec<AnnotationRecord>> {
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(
                self.annotate(collection, &format!("anno-{i:03}"), AnnotationBuilder::new().build())
                    .await?,
            );
        }
        Ok(out)
    }

    pub async fn delete(&self, collection: &str, slug: &str) -> anyhow::Result<()> {
        self.store
            .soft_delete_annotation(collection, slug)
            .await
            .with_context(|| format!("delete annotation {collection}/{slug}"))
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}
