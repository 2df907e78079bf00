//! Domain models for annotations and collections

pub mod annotation;

pub use annotation::{
    annotation_iri, collection_iri, format_timestamp, AnnotationRecord, CollectionRecord,
    ANNOTATION_PAGE_TYPE, ANNOTATION_TYPE, DEFAULT_COLLECTION_TYPE,
};
