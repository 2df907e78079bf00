//! Annotation search: clause composition, SQL rendering and execution

pub mod clause;
pub mod engine;
pub mod params;
pub mod query_builder;
pub mod text;

pub use clause::{
    collection_clause, contains_clause, deleted_clause, full_text_clauses, phrase_clauses,
    range_clauses, Clause, DeletedMode, TextOperator,
};
pub use params::{Predicate, QuerySpec};
