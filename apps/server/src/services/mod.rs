//! Business logic services
//!
//! Page planning, representation selection and container rendering sit on
//! top of the search engine; `CollectionService` ties them together.

pub mod collections;
pub mod container;
pub mod paging;
pub mod representation;

pub use collections::CollectionService;
pub use container::{describe_annotation, ContainerRenderer, RenderContext};
pub use paging::{plan_page, PageDescriptor};
pub use representation::{
    parse_prefer_header, preference_from_request, select_representation, ContainerPreference,
};
