use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use marquee_config::Config;
use marquee_core::{
    cache::{CacheClient, CacheStore, MemoryCacheStore, RedisCacheStore},
    catalog::{AggregationFetcher, CategoryCachePolicy, CategoryCatalog},
    detail::{DetailRecordCache, EpisodeCache},
    discovery::Discovery,
    resolver::StreamResolver,
    sources::{ReqwestStreamTransport, StreamTransport},
    tmdb::{ReqwestTmdbTransport, TmdbClient, TmdbTransport},
    watchlist::WatchlistSink,
};

use crate::infra::app_state::AppState;

/// Upstream seams the services are built over. Production wires reqwest
/// transports; tests substitute fakes.
#[derive(Clone)]
pub struct Upstreams {
    pub cache: Arc<dyn CacheStore>,
    pub tmdb: Arc<dyn TmdbTransport>,
    pub streams: Arc<dyn StreamTransport>,
}

impl std::fmt::Debug for Upstreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstreams")
            .field("cache", &self.cache.backend())
            .finish_non_exhaustive()
    }
}

/// Connects the cache store named by configuration, falling back to the
/// in-process store when no Redis URL is set. An unreachable Redis is not
/// fatal: the store keeps retrying and reads miss in the meantime.
pub async fn connect_cache(config: &Config) -> Result<Arc<dyn CacheStore>> {
    match &config.redis {
        Some(redis) => {
            let store = RedisCacheStore::connect(&redis.url)
                .await
                .context("invalid Redis URL")?;
            info!(connected = store.is_connected(), "cache backend: redis");
            Ok(Arc::new(store))
        }
        None => {
            info!("cache backend: memory");
            Ok(Arc::new(MemoryCacheStore::new()))
        }
    }
}

/// Production upstreams: configured cache plus reqwest transports.
pub async fn production_upstreams(config: &Config) -> Result<Upstreams> {
    let cache = connect_cache(config).await?;

    let tmdb_http = reqwest::Client::builder()
        .timeout(config.tmdb.request_timeout)
        .build()
        .context("failed to build TMDB HTTP client")?;
    let tmdb = ReqwestTmdbTransport::new(
        tmdb_http,
        config.tmdb.base_url.clone(),
        config.tmdb.api_key.clone().unwrap_or_default(),
        config.tmdb.language.clone(),
    );

    // Per-adapter deadlines are enforced by the resolver.
    let stream_http = reqwest::Client::builder()
        .build()
        .context("failed to build stream source HTTP client")?;

    Ok(Upstreams {
        cache,
        tmdb: Arc::new(tmdb),
        streams: Arc::new(ReqwestStreamTransport::new(stream_http)),
    })
}

/// Builds every service over `upstreams` and bundles them into [`AppState`].
pub fn build_state(config: Config, upstreams: Upstreams) -> Result<AppState> {
    let registry = config
        .sources
        .registry()
        .context("invalid stream source configuration")?;

    let cache =
        CacheClient::new(upstreams.cache).with_operation_timeout(config.cache.operation_timeout);
    let tmdb = TmdbClient::new(upstreams.tmdb);
    let image_base = config.tmdb.image_base.clone();

    let resolver = StreamResolver::new(
        Arc::new(registry),
        upstreams.streams,
        cache.clone(),
        config.resolver.settings(),
    );

    let listings = CategoryCachePolicy::new(
        AggregationFetcher::new(tmdb.clone(), image_base.clone()),
        cache.clone(),
        config.catalog.listing_settings(),
    );

    let details = DetailRecordCache::new(
        tmdb.clone(),
        cache.clone(),
        config.catalog.detail_settings(),
    );
    let episodes = EpisodeCache::new(tmdb.clone(), cache.clone());
    let discovery = Discovery::new(
        tmdb,
        cache.clone(),
        image_base,
        config.catalog.discovery_settings(),
    );
    let watchlist = WatchlistSink::new(cache.clone());

    Ok(AppState {
        config: Arc::new(config),
        cache,
        resolver: Arc::new(resolver),
        categories: Arc::new(CategoryCatalog::default()),
        listings: Arc::new(listings),
        details,
        episodes: Arc::new(episodes),
        discovery: Arc::new(discovery),
        watchlist: Arc::new(watchlist),
    })
}

#[async_trait]
pub trait StartupHooks: Send + Sync {
    async fn run(&self, state: &AppState) -> Result<()>;
}

/// Reports the wiring and checks the cache is reachable. An unreachable
/// cache is not fatal: reads degrade to misses.
#[derive(Debug, Default)]
pub struct ProdStartupHooks;

#[async_trait]
impl StartupHooks for ProdStartupHooks {
    async fn run(&self, state: &AppState) -> Result<()> {
        if let Err(err) = state.cache.ping().await {
            warn!(
                backend = state.cache.backend(),
                error = %err,
                "cache unreachable at startup; serving without cache"
            );
        }

        info!(
            categories = state.categories.names().count(),
            sources = state.config().sources.definitions.len(),
            custom_sources = state.config().sources.from_file,
            "services ready"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NoopStartupHooks;

#[async_trait]
impl StartupHooks for NoopStartupHooks {
    async fn run(&self, _state: &AppState) -> Result<()> {
        Ok(())
    }
}
