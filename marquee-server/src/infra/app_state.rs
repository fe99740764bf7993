use std::{fmt, sync::Arc};

use marquee_config::Config;
use marquee_core::{
    cache::CacheClient,
    catalog::{CategoryCachePolicy, CategoryCatalog},
    detail::{DetailRecordCache, EpisodeCache},
    discovery::Discovery,
    resolver::StreamResolver,
    watchlist::WatchlistSink,
};

/// Shared handles for every handler. Cloned per request; all services are
/// built once at startup over the same cache client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: CacheClient,
    pub resolver: Arc<StreamResolver>,
    pub categories: Arc<CategoryCatalog>,
    pub listings: Arc<CategoryCachePolicy>,
    pub details: DetailRecordCache,
    pub episodes: Arc<EpisodeCache>,
    pub discovery: Arc<Discovery>,
    pub watchlist: Arc<WatchlistSink>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stops background work owned by the services.
    pub fn shutdown(&self) {
        self.details.shutdown();
    }
}
