//! Per-title detail records served stale-while-revalidate, plus the
//! cache-aside season and episode lookups.

mod episodes;
mod record;

pub use episodes::{EpisodeCache, EPISODE_TTL};
pub use record::{DetailRecord, Facets};

use chrono::Utc;
use dashmap::DashSet;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheClient, CacheKeys},
    error::CatalogError,
    media::MediaKind,
    tmdb::{
        ContentItem, CreditsPayload, DetailFacet, DiscoverPage, KeywordsPayload, ProviderError,
        ReviewsPayload, TmdbClient, VideosPayload,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSettings {
    /// Age after which a served record triggers a background refresh.
    pub freshness: Duration,
    /// Store TTL; entries older than `freshness` remain servable until then.
    pub retention: Duration,
}

impl Default for DetailSettings {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(2 * 60 * 60),
            retention: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Stored form of a [`DetailRecord`]: the record plus its write time in
/// epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDetail {
    #[serde(flatten)]
    pub record: DetailRecord,
    #[serde(rename = "_cachedAt", default)]
    pub cached_at: Option<i64>,
}

impl CachedDetail {
    pub fn now(record: DetailRecord) -> Self {
        Self {
            record,
            cached_at: Some(Utc::now().timestamp_millis()),
        }
    }

    /// Entries without a timestamp count as stale.
    pub fn is_stale(&self, now_ms: i64, freshness: Duration) -> bool {
        match self.cached_at {
            Some(cached_at) => now_ms.saturating_sub(cached_at) > freshness.as_millis() as i64,
            None => true,
        }
    }
}

/// Observes background refreshes.
pub trait DetailRefreshHook: Send + Sync {
    fn refresh_scheduled(&self, _key: &str) {}

    fn refresh_completed(&self, _key: &str, _succeeded: bool) {}
}

#[derive(Debug, Default)]
pub struct NoopRefreshHook;

impl DetailRefreshHook for NoopRefreshHook {}

struct Inner {
    tmdb: TmdbClient,
    cache: CacheClient,
    settings: DetailSettings,
    hook: Arc<dyn DetailRefreshHook>,
    in_flight: DashSet<String>,
    shutdown: CancellationToken,
}

/// Stale-while-revalidate cache over assembled [`DetailRecord`]s.
#[derive(Clone)]
pub struct DetailRecordCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for DetailRecordCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetailRecordCache")
            .field("settings", &self.inner.settings)
            .field("refreshing", &self.inner.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl DetailRecordCache {
    pub fn new(tmdb: TmdbClient, cache: CacheClient, settings: DetailSettings) -> Self {
        Self::with_hook(tmdb, cache, settings, Arc::new(NoopRefreshHook))
    }

    pub fn with_hook(
        tmdb: TmdbClient,
        cache: CacheClient,
        settings: DetailSettings,
        hook: Arc<dyn DetailRefreshHook>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tmdb,
                cache,
                settings,
                hook,
                in_flight: DashSet::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Returns the cached record if any, scheduling a refresh when it is
    /// stale. Cold keys are fetched synchronously.
    pub async fn get(&self, kind: MediaKind, id: u64) -> Result<DetailRecord, CatalogError> {
        let key = CacheKeys::detail(kind, id);

        if let Some(cached) = self.inner.cache.get_json::<CachedDetail>(&key).await {
            let now_ms = Utc::now().timestamp_millis();
            if cached.is_stale(now_ms, self.inner.settings.freshness) {
                self.spawn_refresh(kind, id, key);
            }
            return Ok(cached.record);
        }

        self.inner.fetch_and_store(kind, id, &key).await
    }

    fn spawn_refresh(&self, kind: MediaKind, id: u64, key: String) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        if !self.inner.in_flight.insert(key.clone()) {
            debug!(key = %key, "detail refresh already in flight");
            return;
        }

        info!(key = %key, "serving stale detail record; refreshing in background");
        self.inner.hook.refresh_scheduled(&key);

        let inner = Arc::clone(&self.inner);
        let token = inner.shutdown.child_token();
        tokio::spawn(async move {
            let succeeded = tokio::select! {
                _ = token.cancelled() => {
                    debug!(key = %key, "detail refresh cancelled");
                    false
                }
                result = inner.fetch_and_store(kind, id, &key) => match result {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(key = %key, error = %err, "background detail refresh failed");
                        false
                    }
                },
            };
            inner.in_flight.remove(&key);
            inner.hook.refresh_completed(&key, succeeded);
        });
    }

    /// Cancels outstanding background refreshes.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    async fn fetch_and_store(
        &self,
        kind: MediaKind,
        id: u64,
        key: &str,
    ) -> Result<DetailRecord, CatalogError> {
        let record = self.assemble(kind, id).await?;
        let cached = CachedDetail::now(record);
        self.cache
            .set_json(key, &cached, self.settings.retention)
            .await;
        Ok(cached.record)
    }

    async fn assemble(&self, kind: MediaKind, id: u64) -> Result<DetailRecord, CatalogError> {
        let primary = self
            .tmdb
            .details(kind, id)
            .await
            .map_err(|err| match err {
                ProviderError::NotFound => CatalogError::NotFound(format!("{kind} {id}")),
                other => CatalogError::Upstream(other),
            })?;

        let (videos, reviews, credits, recommendations, similar, keywords) = tokio::join!(
            self.facet::<VideosPayload>(kind, id, DetailFacet::Videos),
            self.facet::<ReviewsPayload>(kind, id, DetailFacet::Reviews),
            self.facet::<CreditsPayload>(kind, id, DetailFacet::Credits),
            self.facet::<DiscoverPage<ContentItem>>(kind, id, DetailFacet::Recommendations),
            self.facet::<DiscoverPage<ContentItem>>(kind, id, DetailFacet::Similar),
            self.facet::<KeywordsPayload>(kind, id, DetailFacet::Keywords),
        );

        Ok(DetailRecord::assemble(
            primary,
            Facets {
                videos,
                reviews,
                credits,
                recommendations,
                similar,
                keywords,
            },
        ))
    }

    async fn facet<T: DeserializeOwned>(
        &self,
        kind: MediaKind,
        id: u64,
        facet: DetailFacet,
    ) -> Option<T> {
        match self.tmdb.facet(kind, id, facet).await {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!(
                    kind = %kind,
                    id,
                    facet = facet.path(),
                    error = %err,
                    "detail facet unavailable"
                );
                None
            }
        }
    }
}
