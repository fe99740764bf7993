use serde_json::Value;
use std::time::Duration;

use crate::{
    cache::{CacheClient, CacheKeys},
    error::CatalogError,
    tmdb::{ProviderError, TmdbClient},
};

pub const EPISODE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Cache-aside pass-through for season and episode payloads.
#[derive(Debug, Clone)]
pub struct EpisodeCache {
    tmdb: TmdbClient,
    cache: CacheClient,
    ttl: Duration,
}

impl EpisodeCache {
    pub fn new(tmdb: TmdbClient, cache: CacheClient) -> Self {
        Self {
            tmdb,
            cache,
            ttl: EPISODE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn season(&self, id: u64, season: u32) -> Result<Value, CatalogError> {
        let key = CacheKeys::season(id, season);
        if let Some(cached) = self.cache.get_json(&key).await {
            return Ok(cached);
        }

        let payload = self
            .tmdb
            .season(id, season)
            .await
            .map_err(|err| upstream(err, format!("tv {id} season {season}")))?;
        self.cache.set_json(&key, &payload, self.ttl).await;
        Ok(payload)
    }

    pub async fn episode(
        &self,
        id: u64,
        season: u32,
        episode: u32,
    ) -> Result<Value, CatalogError> {
        let key = CacheKeys::episode(id, season, episode);
        if let Some(cached) = self.cache.get_json(&key).await {
            return Ok(cached);
        }

        let payload = self
            .tmdb
            .episode(id, season, episode)
            .await
            .map_err(|err| upstream(err, format!("tv {id} season {season} episode {episode}")))?;
        self.cache.set_json(&key, &payload, self.ttl).await;
        Ok(payload)
    }
}

fn upstream(err: ProviderError, what: String) -> CatalogError {
    match err {
        ProviderError::NotFound => CatalogError::NotFound(what),
        other => CatalogError::Upstream(other),
    }
}
