//! TMDB metadata access.
//!
//! [`TmdbTransport`] is the single network seam (endpoint + query in, JSON
//! out). [`TmdbClient`] layers typed calls on top of it.

mod types;

pub use self::types::*;

use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::debug;

use crate::media::MediaKind;

pub const TMDB_V3_BASE: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[async_trait]
pub trait TmdbTransport: Send + Sync {
    /// GETs `endpoint` (relative to the API base, e.g. `/movie/550`).
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ProviderError>;
}

#[derive(Clone)]
pub struct ReqwestTmdbTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl fmt::Debug for ReqwestTmdbTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTmdbTransport")
            .field("base_url", &self.base_url)
            .field("api_key_set", &!self.api_key.is_empty())
            .field("language", &self.language)
            .finish()
    }
}

impl ReqwestTmdbTransport {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl TmdbTransport for ReqwestTmdbTransport {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(endpoint = %endpoint, "TMDB GET");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(ProviderError::from);
        }

        #[derive(Debug, Deserialize)]
        struct TmdbErrorBody {
            #[serde(default)]
            status_message: Option<String>,
        }

        let message = response
            .json::<TmdbErrorBody>()
            .await
            .ok()
            .and_then(|body| body.status_message)
            .unwrap_or_else(|| format!("TMDB request failed with status {}", status));

        match status.as_u16() {
            401 => Err(ProviderError::InvalidApiKey),
            404 => Err(ProviderError::NotFound),
            429 => Err(ProviderError::RateLimited),
            _ => Err(ProviderError::ApiError(message)),
        }
    }
}

/// Per-title facets fetched alongside the primary detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailFacet {
    Videos,
    Reviews,
    Credits,
    Recommendations,
    Similar,
    Keywords,
}

impl DetailFacet {
    pub fn path(&self) -> &'static str {
        match self {
            DetailFacet::Videos => "videos",
            DetailFacet::Reviews => "reviews",
            DetailFacet::Credits => "credits",
            DetailFacet::Recommendations => "recommendations",
            DetailFacet::Similar => "similar",
            DetailFacet::Keywords => "keywords",
        }
    }
}

/// Search scope accepted by `/search/{scope}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    Multi,
    Movie,
    Tv,
}

impl SearchScope {
    /// Unknown or missing scopes fall back to `multi`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some("movie") => SearchScope::Movie,
            Some("tv") => SearchScope::Tv,
            _ => SearchScope::Multi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Multi => "multi",
            SearchScope::Movie => "movie",
            SearchScope::Tv => "tv",
        }
    }
}

/// Typed TMDB calls over a shared transport.
#[derive(Clone)]
pub struct TmdbClient {
    transport: Arc<dyn TmdbTransport>,
}

impl fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbClient").finish_non_exhaustive()
    }
}

fn page_param(page: u32) -> (String, String) {
    ("page".to_string(), page.max(1).to_string())
}

impl TmdbClient {
    pub fn new(transport: Arc<dyn TmdbTransport>) -> Self {
        Self { transport }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, ProviderError> {
        let value = self.transport.get_json(endpoint, params).await?;
        serde_json::from_value(value)
            .map_err(|err| ProviderError::ParseError(format!("{endpoint}: {err}")))
    }

    pub async fn discover(
        &self,
        kind: MediaKind,
        query: &DiscoverQuery,
    ) -> Result<DiscoverPage<ContentItem>, ProviderError> {
        self.fetch(&format!("/discover/{kind}"), &query.to_params(kind))
            .await
    }

    pub async fn popular(
        &self,
        kind: MediaKind,
        page: u32,
    ) -> Result<DiscoverPage<ContentItem>, ProviderError> {
        self.fetch(&format!("/{kind}/popular"), &[page_param(page)])
            .await
    }

    pub async fn trending_movies_today(
        &self,
        page: u32,
    ) -> Result<DiscoverPage<ContentItem>, ProviderError> {
        self.fetch("/trending/movie/day", &[page_param(page)]).await
    }

    pub async fn search(
        &self,
        scope: SearchScope,
        query: &str,
        page: u32,
    ) -> Result<DiscoverPage<ContentItem>, ProviderError> {
        self.fetch(
            &format!("/search/{}", scope.as_str()),
            &[("query".to_string(), query.to_string()), page_param(page)],
        )
        .await
    }

    pub async fn details(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> Result<DetailPayload, ProviderError> {
        self.fetch(&format!("/{kind}/{id}"), &[]).await
    }

    pub async fn facet<T: DeserializeOwned>(
        &self,
        kind: MediaKind,
        id: u64,
        facet: DetailFacet,
    ) -> Result<T, ProviderError> {
        self.fetch(&format!("/{kind}/{id}/{}", facet.path()), &[])
            .await
    }

    pub async fn season(
        &self,
        id: u64,
        season: u32,
    ) -> Result<serde_json::Value, ProviderError> {
        self.transport
            .get_json(&format!("/tv/{id}/season/{season}"), &[])
            .await
    }

    pub async fn episode(
        &self,
        id: u64,
        season: u32,
        episode: u32,
    ) -> Result<serde_json::Value, ProviderError> {
        self.transport
            .get_json(&format!("/tv/{id}/season/{season}/episode/{episode}"), &[])
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned transport shared by the catalog, detail and discovery tests.

    use super::*;
    use std::{collections::HashMap, sync::Mutex};

    #[derive(Debug, Clone)]
    pub enum Canned {
        Json(serde_json::Value),
        Fail(u16),
    }

    /// Answers by endpoint, optionally narrowed by one query parameter.
    #[derive(Debug, Default)]
    pub struct CannedTmdb {
        routes: Mutex<HashMap<String, Canned>>,
        pub calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl CannedTmdb {
        pub fn new() -> Self {
            Self::default()
        }

        fn route_key(endpoint: &str, matcher: Option<(&str, &str)>) -> String {
            match matcher {
                Some((name, value)) => format!("{endpoint}?{name}={value}"),
                None => endpoint.to_string(),
            }
        }

        pub fn on(&self, endpoint: &str, response: Canned) -> &Self {
            self.routes
                .lock()
                .unwrap()
                .insert(Self::route_key(endpoint, None), response);
            self
        }

        pub fn on_param(
            &self,
            endpoint: &str,
            name: &str,
            value: &str,
            response: Canned,
        ) -> &Self {
            self.routes
                .lock()
                .unwrap()
                .insert(Self::route_key(endpoint, Some((name, value))), response);
            self
        }

        pub fn call_count(&self, endpoint: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(e, _)| e == endpoint)
                .count()
        }
    }

    #[async_trait]
    impl TmdbTransport for CannedTmdb {
        async fn get_json(
            &self,
            endpoint: &str,
            params: &[(String, String)],
        ) -> Result<serde_json::Value, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), params.to_vec()));

            let routes = self.routes.lock().unwrap();
            let narrowed = params
                .iter()
                .find_map(|(name, value)| {
                    routes.get(&Self::route_key(endpoint, Some((name, value))))
                });
            match narrowed.or_else(|| routes.get(endpoint)) {
                Some(Canned::Json(value)) => Ok(value.clone()),
                Some(Canned::Fail(404)) | None => Err(ProviderError::NotFound),
                Some(Canned::Fail(status)) => Err(ProviderError::ApiError(format!(
                    "TMDB request failed with status {status}"
                ))),
            }
        }
    }

    pub fn page(results: serde_json::Value) -> Canned {
        let total = results.as_array().map(Vec::len).unwrap_or(0);
        Canned::Json(serde_json::json!({
            "page": 1,
            "results": results,
            "total_pages": 1,
            "total_results": total,
        }))
    }
}
