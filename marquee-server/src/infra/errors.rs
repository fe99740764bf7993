use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use marquee_core::{CatalogError, resolver::ResolveError, tmdb::ProviderError};

pub type AppResult<T> = Result<T, AppError>;

pub const SOURCES_UNAVAILABLE: &str = "All streaming sources are currently unavailable.";
pub const UPSTREAM_UNAVAILABLE: &str = "Metadata service temporarily unavailable.";

/// How the error body is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBody {
    Json,
    PlainText,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub body: ErrorBody,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: ErrorBody::Json,
        }
    }

    pub fn plain(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: ErrorBody::PlainText,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Rejections at the request boundary are plain text.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.body {
            ErrorBody::PlainText => (self.status, self.message).into_response(),
            ErrorBody::Json => {
                let body = Json(json!({
                    "error": {
                        "message": self.message,
                        "status": self.status.as_u16(),
                    }
                }));

                (self.status, body).into_response()
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidInput(msg) => Self::bad_request(msg),
            CatalogError::NotFound(msg) => Self::not_found(msg),
            CatalogError::Unavailable(msg) => Self::bad_gateway(msg),
            CatalogError::Upstream(ProviderError::NotFound) => {
                Self::not_found("Title not found")
            }
            CatalogError::Upstream(err) => {
                tracing::warn!(error = %err, "upstream metadata request failed");
                Self::bad_gateway(UPSTREAM_UNAVAILABLE)
            }
            CatalogError::Cache(err) => {
                tracing::error!(error = %err, "cache backend operation failed");
                Self::service_unavailable("Cache temporarily unavailable.")
            }
            CatalogError::Serialization(err) => {
                tracing::error!(error = %err, "serialization failed");
                Self::internal("Internal server error")
            }
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::AllSourcesUnavailable { failures } => {
                tracing::warn!(
                    failures = failures.len(),
                    "stream resolution exhausted every tier"
                );
                Self::plain(StatusCode::BAD_GATEWAY, SOURCES_UNAVAILABLE)
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}
