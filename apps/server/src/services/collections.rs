//! Collection service - container and page orchestration
//!
//! Loads the collection and its members from one snapshot, plans the page
//! and renders it under the client's representation preference.

use std::time::Instant;

use serde_json::Value as JsonValue;

use crate::db::search::QuerySpec;
use crate::db::{AnnotationStore, SearchEngine, Window};
use crate::metrics;
use crate::models::{AnnotationRecord, CollectionRecord};
use crate::services::container::{ContainerRenderer, RenderContext};
use crate::services::paging::plan_page;
use crate::services::representation::ContainerPreference;
use crate::{Error, Result};

pub struct CollectionService<S: AnnotationStore> {
    engine: SearchEngine<S>,
    per_page: usize,
}

impl<S: AnnotationStore> CollectionService<S> {
    pub fn new(engine: SearchEngine<S>, per_page: usize) -> Result<Self> {
        if per_page == 0 {
            return Err(Error::Config("per_page must be at least 1".to_string()));
        }
        Ok(Self { engine, per_page })
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Render the collection container.
    ///
    /// Full and IRI representations embed page 0; the minimal container only
    /// needs the member count.
    #[tracing::instrument(name = "collection_container", skip(self, ctx), fields(preference = ?preference))]
    pub async fn container(
        &self,
        ctx: &RenderContext,
        slug: &str,
        preference: ContainerPreference,
    ) -> Result<JsonValue> {
        let start = Instant::now();
        let result = self.render_container(ctx, slug, preference).await;
        record_outcome("container", &result, start);
        result
    }

    /// Render one AnnotationPage of the collection.
    #[tracing::instrument(name = "collection_page", skip(self, ctx), fields(preference = ?preference))]
    pub async fn page(
        &self,
        ctx: &RenderContext,
        slug: &str,
        page: i64,
        preference: ContainerPreference,
    ) -> Result<JsonValue> {
        let start = Instant::now();
        let result = self.render_page(ctx, slug, page, preference).await;
        record_outcome("page", &result, start);
        result
    }

    async fn render_container(
        &self,
        ctx: &RenderContext,
        slug: &str,
        preference: ContainerPreference,
    ) -> Result<JsonValue> {
        let window = if preference.is_minimal() {
            Window::new(0, 0)
        } else {
            Window::new(0, self.per_page as u64)
        };
        let (collection, items, total) = self.load(slug, window).await?;

        let first = plan_page(total, self.per_page, 0)?;
        Ok(ContainerRenderer::new(ctx, &collection, preference).container(&first, &items))
    }

    async fn render_page(
        &self,
        ctx: &RenderContext,
        slug: &str,
        page: i64,
        preference: ContainerPreference,
    ) -> Result<JsonValue> {
        let index = u64::try_from(page).map_err(|_| Error::NotFound(format!("page {page}")))?;
        let window = Window::new(
            index.saturating_mul(self.per_page as u64),
            self.per_page as u64,
        );
        let (collection, items, total) = self.load(slug, window).await?;

        // Out-of-range pages are detected against the same snapshot's total.
        let plan = plan_page(total, self.per_page, page)?;
        Ok(ContainerRenderer::new(ctx, &collection, preference).page(&plan, &items))
    }

    /// Collection record and visible members, read from one snapshot.
    async fn load(
        &self,
        slug: &str,
        window: Window,
    ) -> Result<(CollectionRecord, Vec<AnnotationRecord>, u64)> {
        let spec = QuerySpec::default().with_window(window.offset, window.limit);
        let (collection, found) = self.engine.search_collection(slug, &spec).await?;
        match collection {
            Some(collection) if collection.deleted => Err(Error::CollectionDeleted {
                slug: slug.to_string(),
            }),
            Some(collection) => Ok((collection, found.items, found.total)),
            None => Err(Error::NotFound(format!("collection {slug}"))),
        }
    }
}

fn record_outcome(kind: &str, result: &Result<JsonValue>, start: Instant) {
    let status = metrics::status_label(result);
    metrics::CONTAINER_REQUESTS_TOTAL
        .with_label_values(&[kind, status])
        .inc();
    match result {
        Ok(_) => tracing::debug!(
            kind,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rendered collection"
        ),
        Err(e) if e.is_client_error() => tracing::debug!(kind, error = %e, "Collection request rejected"),
        Err(e) => tracing::warn!(kind, error = %e, "Collection request failed"),
    }
}
