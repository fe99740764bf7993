#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{Value, json};

use marquee_config::{
    CacheConfig, CatalogConfig, Config, ConfigMetadata, CorsConfig, ResolverConfig,
    ServerConfig, SourcesConfig, TmdbConfig,
};
use marquee_core::{
    cache::{CacheStore, MemoryCacheStore},
    sources::{
        SourceDefinition, SourceResponse, SourceTarget, StreamTransport, Tier, TransportError,
    },
    tmdb::{ProviderError, TMDB_IMAGE_BASE, TmdbTransport},
};
use marquee_server::{
    AppState,
    infra::startup::{NoopStartupHooks, StartupHooks, Upstreams, build_state},
    routes::create_api_router,
};

/// TMDB fake answering by endpoint; unknown endpoints are 404s.
#[derive(Debug, Default)]
pub struct FakeTmdb {
    routes: Mutex<HashMap<String, Result<Value, u16>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTmdb {
    pub fn on(&self, endpoint: &str, body: Value) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Ok(body));
        self
    }

    pub fn fail(&self, endpoint: &str, status: u16) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Err(status));
        self
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == endpoint)
            .count()
    }
}

#[async_trait]
impl TmdbTransport for FakeTmdb {
    async fn get_json(
        &self,
        endpoint: &str,
        _params: &[(String, String)],
    ) -> Result<Value, ProviderError> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        match self.routes.lock().unwrap().get(endpoint) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(404)) | None => Err(ProviderError::NotFound),
            Some(Err(status)) => Err(ProviderError::ApiError(format!(
                "TMDB request failed with status {status}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SourceBehavior {
    Serve(&'static str),
    Status(u16),
}

/// Stream source fake keyed by URL prefix.
#[derive(Debug, Default)]
pub struct FakeStreams {
    behaviors: Mutex<Vec<(String, SourceBehavior)>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeStreams {
    pub fn on(&self, url_prefix: &str, behavior: SourceBehavior) -> &Self {
        self.behaviors
            .lock()
            .unwrap()
            .push((url_prefix.to_string(), behavior));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    fn behavior(&self, url: &str) -> Option<SourceBehavior> {
        self.behaviors
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, behavior)| behavior.clone())
    }
}

#[async_trait]
impl StreamTransport for FakeStreams {
    async fn fetch(&self, target: &SourceTarget) -> Result<SourceResponse, TransportError> {
        self.fetches.lock().unwrap().push(target.url.clone());
        match self.behavior(&target.url) {
            Some(SourceBehavior::Serve(body)) => Ok(SourceResponse {
                status: 200,
                content_type: Some("text/html".into()),
                body: body.to_string(),
            }),
            Some(SourceBehavior::Status(status)) => Ok(SourceResponse {
                status,
                content_type: None,
                body: String::new(),
            }),
            None => Err(TransportError::Network("connection refused".into())),
        }
    }

    async fn probe(&self, target: &SourceTarget) -> Result<u16, TransportError> {
        match self.behavior(&target.url) {
            Some(SourceBehavior::Serve(_)) => Ok(200),
            Some(SourceBehavior::Status(status)) => Ok(status),
            None => Err(TransportError::Network("connection refused".into())),
        }
    }
}

pub const ALPHA: &str = "https://alpha.example";
pub const BETA: &str = "https://beta.example";

fn source(name: &str, base_url: &str, movie: Option<Tier>, tv: Option<Tier>) -> SourceDefinition {
    SourceDefinition {
        name: name.to_string(),
        base_url: base_url.to_string(),
        path: "{kind}/{id}".to_string(),
        movie,
        tv,
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        redis: None,
        cache: CacheConfig {
            operation_timeout: Duration::from_secs(2),
        },
        tmdb: TmdbConfig {
            api_key: Some("test-key".into()),
            base_url: "https://tmdb.example/3".into(),
            image_base: TMDB_IMAGE_BASE.into(),
            language: "en-US".into(),
            request_timeout: Duration::from_secs(10),
        },
        resolver: ResolverConfig {
            adapter_timeout: Duration::from_secs(8),
            probe_timeout: Duration::from_secs(3),
            stream_ttl: Duration::from_secs(30 * 60),
        },
        catalog: CatalogConfig {
            listing_ttl: Duration::from_secs(60 * 60),
            negative_ttl: Duration::from_secs(5 * 60),
            sample_size: 12,
            total_pages: 1000,
            detail_freshness: Duration::from_secs(2 * 60 * 60),
            detail_retention: Duration::from_secs(24 * 60 * 60),
            hero_ttl: Duration::from_secs(30 * 60),
            hero_count: 10,
            search_ttl: Duration::from_secs(60 * 60),
        },
        sources: SourcesConfig {
            definitions: vec![
                source("alpha", ALPHA, Some(Tier::Primary), Some(Tier::Primary)),
                source("beta", BETA, Some(Tier::Fallback), None),
            ],
            allowed_domains: vec!["example".into()],
            from_file: true,
        },
        cors: CorsConfig {
            allowed_origins: Vec::new(),
        },
        metadata: ConfigMetadata::default(),
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub cache: Arc<MemoryCacheStore>,
    pub tmdb: Arc<FakeTmdb>,
    pub streams: Arc<FakeStreams>,
}

impl TestApp {
    pub async fn cached(&self, key: &str) -> Option<Value> {
        self.cache
            .get(key)
            .await
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }
}

pub async fn build_test_app(tmdb: FakeTmdb, streams: FakeStreams) -> Result<TestApp> {
    let cache = Arc::new(MemoryCacheStore::new());
    let tmdb = Arc::new(tmdb);
    let streams = Arc::new(streams);

    let upstreams = Upstreams {
        cache: Arc::clone(&cache) as Arc<dyn CacheStore>,
        tmdb: Arc::clone(&tmdb) as Arc<dyn TmdbTransport>,
        streams: Arc::clone(&streams) as Arc<dyn StreamTransport>,
    };
    let state = build_state(test_config(), upstreams)?;
    NoopStartupHooks.run(&state).await?;

    let router = create_api_router().with_state(state.clone());
    let server = TestServer::new(router).map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state,
        cache,
        tmdb,
        streams,
    })
}

/// Discover-style page of `count` movies with ids starting at `first_id`.
pub fn movie_page(first_id: u64, count: u64) -> Value {
    let results: Vec<Value> = (first_id..first_id + count)
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Movie {id}"),
                "poster_path": format!("/poster-{id}.jpg"),
                "backdrop_path": format!("/backdrop-{id}.jpg"),
                "release_date": "2024-03-01",
                "vote_average": 7.26,
                "vote_count": 1500,
                "overview": "An overview.",
                "original_language": "en"
            })
        })
        .collect();

    json!({
        "page": 1,
        "results": results,
        "total_pages": 3,
        "total_results": count,
    })
}
