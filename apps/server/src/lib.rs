//! Explicates - annotation store core
//!
//! W3C Web Annotation Protocol containers over a relational store:
//! - Composable annotation search (collection, containment, ranges, full-text, phrases)
//! - Single-snapshot count and fetch, ordered by creation sequence
//! - AnnotationPage planning and container representation preferences

// Allow clippy lints that are acceptable for this domain-specific codebase
#![allow(
    clippy::too_many_arguments,      // Functions with many args are acceptable for domain operations
    clippy::large_enum_variant,      // Large enum variants acceptable; boxing may impact performance
)]

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{Error, Result};
