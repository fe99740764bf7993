//! Catalog-level error type shared by the aggregation, detail and discovery
//! services.

use thiserror::Error;

use crate::{cache::CacheError, tmdb::ProviderError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream could not produce anything usable for the request.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
