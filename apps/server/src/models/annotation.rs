//! Persisted annotation and collection records.
//!
//! Records carry only stored state. Identifiers (`id`) and `type` are
//! projections computed from a record plus explicit context (base IRI,
//! collection slug) by the free functions below.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const ANNOTATION_TYPE: &str = "Annotation";
pub const ANNOTATION_PAGE_TYPE: &str = "AnnotationPage";
pub const DEFAULT_COLLECTION_TYPE: &str = "AnnotationCollection";

/// A stored annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Surrogate key. Monotonic, so it doubles as the creation sequence.
    pub key: i64,

    /// IRI path segment of the annotation within its collection
    pub slug: String,

    pub collection_key: i64,

    /// Public identifier of the owning collection
    pub collection_slug: String,

    /// The annotation document (`body`, `target`, arbitrary fields)
    pub data: JsonValue,

    pub created: DateTime<Utc>,

    pub modified: Option<DateTime<Utc>>,

    pub deleted: bool,
}

/// A stored annotation collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub key: i64,

    /// Public identifier (server-generated or client-supplied slug)
    pub slug: String,

    /// Descriptive fields (`type`, `label`, ...)
    pub data: JsonValue,

    pub created: DateTime<Utc>,

    pub modified: Option<DateTime<Utc>>,

    pub deleted: bool,
}

impl CollectionRecord {
    /// The collection's `type`, falling back to `AnnotationCollection` when
    /// the stored document has none.
    pub fn container_type(&self) -> JsonValue {
        self.data
            .get("type")
            .cloned()
            .unwrap_or_else(|| JsonValue::String(DEFAULT_COLLECTION_TYPE.to_string()))
    }
}

/// IRI of a collection container: `{base}/{slug}/`.
pub fn collection_iri(base_url: &str, collection_slug: &str) -> String {
    format!(
        "{}/{}/",
        base_url.trim_end_matches('/'),
        urlencoding::encode(collection_slug)
    )
}

/// IRI of an annotation: `{base}/{collection}/{annotation}`.
pub fn annotation_iri(base_url: &str, collection_slug: &str, annotation_slug: &str) -> String {
    format!(
        "{}{}",
        collection_iri(base_url, collection_slug),
        urlencoding::encode(annotation_slug)
    )
}

/// Timestamps are emitted with second precision in UTC, e.g. `1984-11-19T00:00:00Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
