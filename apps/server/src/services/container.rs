//! AnnotationCollection and AnnotationPage payloads
//!
//! Payloads are plain `serde_json` objects built in a fixed key order, so
//! rendering the same records with the same [`RenderContext`] always yields
//! byte-identical output.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};

use crate::config::AnnotationsConfig;
use crate::models::{
    annotation_iri, collection_iri, format_timestamp, AnnotationRecord, CollectionRecord,
    ANNOTATION_PAGE_TYPE, ANNOTATION_TYPE,
};
use crate::services::paging::PageDescriptor;
use crate::services::representation::ContainerPreference;

/// Everything a payload needs beyond the stored records.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// Root IRI of all collections
    pub base_url: String,
    /// Emitted as `generator` on every annotation description
    pub generator: JsonValue,
    /// Emitted as `generated`; fixed per request so output is reproducible
    pub generated: DateTime<Utc>,
}

impl RenderContext {
    pub fn new(base_url: impl Into<String>, generator: JsonValue, generated: DateTime<Utc>) -> Self {
        Self {
            base_url: base_url.into(),
            generator,
            generated,
        }
    }

    pub fn from_config(config: &AnnotationsConfig, generated: DateTime<Utc>) -> Self {
        Self::new(config.base_url.clone(), config.generator.clone(), generated)
    }
}

/// Renders one collection under one representation preference.
pub struct ContainerRenderer<'a> {
    ctx: &'a RenderContext,
    collection: &'a CollectionRecord,
    preference: ContainerPreference,
}

impl<'a> ContainerRenderer<'a> {
    pub fn new(
        ctx: &'a RenderContext,
        collection: &'a CollectionRecord,
        preference: ContainerPreference,
    ) -> Self {
        Self {
            ctx,
            collection,
            preference,
        }
    }

    fn base_iri(&self) -> String {
        collection_iri(&self.ctx.base_url, &self.collection.slug)
    }

    /// Container IRI, `?iris=1` in IRI mode.
    pub fn container_iri(&self) -> String {
        let iri = self.base_iri();
        if self.preference.iri_mode() {
            format!("{iri}?iris=1")
        } else {
            iri
        }
    }

    /// Page IRI, `?page=N` plus `&iris=1` in IRI mode.
    pub fn page_iri(&self, page: u64) -> String {
        let iri = format!("{}?page={page}", self.base_iri());
        if self.preference.iri_mode() {
            format!("{iri}&iris=1")
        } else {
            iri
        }
    }

    /// The container with page 0 embedded (or referenced, when minimal).
    ///
    /// `first_page` must describe page 0 and `items` hold its members.
    pub fn container(&self, first_page: &PageDescriptor, items: &[AnnotationRecord]) -> JsonValue {
        let mut out = Map::new();
        out.insert("id".into(), JsonValue::String(self.container_iri()));
        out.insert("type".into(), self.collection.container_type());
        if let JsonValue::Object(fields) = &self.collection.data {
            for (key, value) in fields {
                if key != "id" && key != "type" {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out.insert(
            "created".into(),
            JsonValue::String(format_timestamp(&self.collection.created)),
        );
        out.insert(
            "generated".into(),
            JsonValue::String(format_timestamp(&self.ctx.generated)),
        );
        if let Some(modified) = &self.collection.modified {
            out.insert("modified".into(), JsonValue::String(format_timestamp(modified)));
        }
        out.insert("total".into(), JsonValue::from(first_page.total));

        let first = if self.preference.is_minimal() {
            JsonValue::String(self.page_iri(0))
        } else {
            JsonValue::Object(self.page_body(first_page, items))
        };
        out.insert("first".into(), first);

        if first_page.last_page > 0 {
            out.insert(
                "last".into(),
                JsonValue::String(self.page_iri(first_page.last_page)),
            );
        }
        JsonValue::Object(out)
    }

    /// A standalone AnnotationPage with `partOf`, `next` and `prev`.
    pub fn page(&self, page: &PageDescriptor, items: &[AnnotationRecord]) -> JsonValue {
        let mut out = Map::new();
        out.insert("id".into(), JsonValue::String(self.page_iri(page.page)));
        out.insert("type".into(), JsonValue::from(ANNOTATION_PAGE_TYPE));
        out.insert("startIndex".into(), JsonValue::from(page.start_index));
        out.insert("items".into(), self.items(items));
        out.insert("partOf".into(), self.part_of(page.total));
        if page.has_next {
            out.insert("next".into(), JsonValue::String(self.page_iri(page.page + 1)));
        }
        if page.has_prev {
            out.insert("prev".into(), JsonValue::String(self.page_iri(page.page - 1)));
        }
        JsonValue::Object(out)
    }

    /// Page as embedded in the container: no `partOf`, never a `prev`.
    fn page_body(&self, page: &PageDescriptor, items: &[AnnotationRecord]) -> Map<String, JsonValue> {
        let mut out = Map::new();
        out.insert("id".into(), JsonValue::String(self.page_iri(page.page)));
        out.insert("type".into(), JsonValue::from(ANNOTATION_PAGE_TYPE));
        out.insert("startIndex".into(), JsonValue::from(page.start_index));
        out.insert("items".into(), self.items(items));
        if page.has_next {
            out.insert("next".into(), JsonValue::String(self.page_iri(page.page + 1)));
        }
        out
    }

    fn part_of(&self, total: u64) -> JsonValue {
        let mut out = Map::new();
        out.insert("id".into(), JsonValue::String(self.container_iri()));
        out.insert("total".into(), JsonValue::from(total));
        out.insert("type".into(), self.collection.container_type());
        out.insert(
            "created".into(),
            JsonValue::String(format_timestamp(&self.collection.created)),
        );
        out.insert(
            "generated".into(),
            JsonValue::String(format_timestamp(&self.ctx.generated)),
        );
        JsonValue::Object(out)
    }

    fn items(&self, items: &[AnnotationRecord]) -> JsonValue {
        JsonValue::Array(
            items
                .iter()
                .map(|record| {
                    if self.preference.iri_mode() {
                        JsonValue::String(self.annotation_iri(record))
                    } else {
                        describe_annotation(self.ctx, record)
                    }
                })
                .collect(),
        )
    }

    fn annotation_iri(&self, record: &AnnotationRecord) -> String {
        annotation_iri(&self.ctx.base_url, &record.collection_slug, &record.slug)
    }
}

/// Full description of one annotation.
///
/// `id` and `type` are always computed; stored values for them are ignored.
pub fn describe_annotation(ctx: &RenderContext, record: &AnnotationRecord) -> JsonValue {
    let mut out = Map::new();
    out.insert(
        "id".into(),
        JsonValue::String(annotation_iri(
            &ctx.base_url,
            &record.collection_slug,
            &record.slug,
        )),
    );
    out.insert("type".into(), JsonValue::from(ANNOTATION_TYPE));
    if let JsonValue::Object(fields) = &record.data {
        for (key, value) in fields {
            if key != "id" && key != "type" {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out.insert(
        "created".into(),
        JsonValue::String(format_timestamp(&record.created)),
    );
    if let Some(modified) = &record.modified {
        out.insert("modified".into(), JsonValue::String(format_timestamp(modified)));
    }
    out.insert(
        "generated".into(),
        JsonValue::String(format_timestamp(&ctx.generated)),
    );
    out.insert("generator".into(), ctx.generator.clone());
    JsonValue::Object(out)
}
