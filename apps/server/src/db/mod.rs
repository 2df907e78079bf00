//! Database layer - annotation storage and search

pub mod memory;
pub mod search;
pub mod store;
pub mod traits;

pub use memory::InMemoryAnnotationStore;
pub use search::engine::{SearchEngine, SearchResult};
pub use search::{Predicate, QuerySpec};
pub use store::PostgresAnnotationStore;
pub use traits::{AnnotationStore, Window};
