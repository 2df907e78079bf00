//! Error types for the annotation store core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed filter parameter. The whole request is rejected; nothing is
    /// partially applied.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collection deleted: {slug}")]
    CollectionDeleted { slug: String },

    /// Storage-layer failure (connectivity, timeout, SQL error), passed through
    /// unmodified.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery(message.into())
    }

    /// Whether the error is a deterministic consequence of the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidQuery(_) | Error::NotFound(_) | Error::CollectionDeleted { .. }
        )
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidQuery(_) => "invalid_query",
            Error::NotFound(_) => "not_found",
            Error::CollectionDeleted { .. } => "gone",
            Error::StorageUnavailable(_) => "storage_unavailable",
            Error::Config(_) => "config",
            Error::Other(_) => "internal",
        }
    }
}
