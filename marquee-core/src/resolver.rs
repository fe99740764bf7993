//! Tiered, racing stream resolver.
//!
//! Resolution walks `cache lookup -> validate -> race primary -> race
//! fallback`. A remembered source is probed before reuse and dropped when
//! the probe fails. Each tier races all of its adapters concurrently under a
//! shared cancellation token; the first success cancels the rest, which are
//! drained before the tier returns.

use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{task::JoinSet, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheClient, CacheKeys},
    media::{MediaKind, TitleId},
    sources::{
        SourceAdapter, SourceRegistry, SourceResponse, SourceTarget, StreamTransport,
        Tier, TransportError,
    },
};

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Deadline for a single adapter fetch, measured from dispatch.
    pub adapter_timeout: Duration,
    /// Deadline for revalidating a cached source.
    pub probe_timeout: Duration,
    /// Lifetime of a remembered winning source.
    pub stream_ttl: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(8),
            probe_timeout: Duration::from_secs(3),
            stream_ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// What gets remembered about a winning source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedStreamRef {
    pub source: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub media_kind: MediaKind,
    pub id: TitleId,
    pub source_name: String,
    pub payload: String,
    pub cache_key: String,
    pub from_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterFailure {
    pub source: String,
    pub tier: Tier,
    pub error: TransportError,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("all streaming sources are unavailable ({} failures)", failures.len())]
    AllSourcesUnavailable { failures: Vec<AdapterFailure> },
}

struct TierWinner {
    adapter: Arc<SourceAdapter>,
    target: SourceTarget,
    response: SourceResponse,
}

#[derive(Clone)]
pub struct StreamResolver {
    registry: Arc<SourceRegistry>,
    transport: Arc<dyn StreamTransport>,
    cache: CacheClient,
    settings: ResolverSettings,
}

impl std::fmt::Debug for StreamResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResolver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StreamResolver {
    pub fn new(
        registry: Arc<SourceRegistry>,
        transport: Arc<dyn StreamTransport>,
        cache: CacheClient,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            registry,
            transport,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub async fn resolve(
        &self,
        kind: MediaKind,
        id: &TitleId,
    ) -> Result<ResolvedStream, ResolveError> {
        let key = CacheKeys::stream(kind, id);

        if let Some(hit) = self.revalidate_cached(kind, id, &key).await {
            return Ok(hit);
        }

        let mut failures = Vec::new();
        for tier in Tier::ORDER {
            let adapters = self.registry.adapters_for(kind, tier);
            match self.race_tier(tier, adapters, kind, id).await {
                Ok(winner) => {
                    let reference = CachedStreamRef {
                        source: winner.adapter.name().to_string(),
                        url: winner.target.url.clone(),
                    };
                    self.cache
                        .set_json(&key, &reference, self.settings.stream_ttl)
                        .await;

                    return Ok(ResolvedStream {
                        media_kind: kind,
                        id: id.clone(),
                        source_name: reference.source,
                        payload: winner.response.body,
                        cache_key: key,
                        from_cache: false,
                    });
                }
                Err(mut tier_failures) => {
                    warn!(
                        media_kind = %kind,
                        id = %id,
                        tier = %tier,
                        failures = tier_failures.len(),
                        "every source in tier failed"
                    );
                    failures.append(&mut tier_failures);
                }
            }
        }

        warn!(
            media_kind = %kind,
            id = %id,
            failures = ?failures
                .iter()
                .map(|f| format!("{}: {}", f.source, f.error))
                .collect::<Vec<_>>(),
            "all streaming sources failed"
        );
        Err(ResolveError::AllSourcesUnavailable { failures })
    }

    /// Serves a remembered source only after it passes a probe and a fresh
    /// fetch. Anything less removes the entry.
    async fn revalidate_cached(
        &self,
        kind: MediaKind,
        id: &TitleId,
        key: &str,
    ) -> Option<ResolvedStream> {
        let cached: CachedStreamRef = self.cache.get_json(key).await?;

        let Some(adapter) = self.registry.find(kind, &cached.source) else {
            info!(key = %key, source = %cached.source, "cached source no longer registered");
            self.cache.invalidate(key).await;
            return None;
        };
        let target = adapter.target_for_url(cached.url.clone());

        let probe = tokio::time::timeout(
            self.settings.probe_timeout,
            self.transport.probe(&target),
        )
        .await;
        let reachable = matches!(probe, Ok(Ok(status)) if (200..400).contains(&status));

        if reachable {
            let fetched = tokio::time::timeout(
                self.settings.adapter_timeout,
                self.transport.fetch(&target),
            )
            .await;
            if let Ok(Ok(response)) = fetched
                && adapter.classify(&response).is_ok()
            {
                debug!(key = %key, source = %cached.source, "serving revalidated stream source");
                return Some(ResolvedStream {
                    media_kind: kind,
                    id: id.clone(),
                    source_name: cached.source,
                    payload: response.body,
                    cache_key: key.to_string(),
                    from_cache: true,
                });
            }
        }

        info!(key = %key, source = %cached.source, "cached stream source failed validation");
        self.cache.invalidate(key).await;
        None
    }

    async fn race_tier(
        &self,
        tier: Tier,
        adapters: &[Arc<SourceAdapter>],
        kind: MediaKind,
        id: &TitleId,
    ) -> Result<TierWinner, Vec<AdapterFailure>> {
        if adapters.is_empty() {
            return Err(Vec::new());
        }

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for adapter in adapters {
            let adapter = Arc::clone(adapter);
            let transport = Arc::clone(&self.transport);
            let token = cancel.child_token();
            let timeout = self.settings.adapter_timeout;
            let target = adapter.build_request(kind, id);

            tasks.spawn(async move {
                let started = Instant::now();
                let outcome = tokio::select! {
                    _ = token.cancelled() => Err(TransportError::Cancelled),
                    result = tokio::time::timeout(timeout, transport.fetch(&target)) => {
                        match result {
                            Ok(Ok(response)) => adapter.classify(&response).map(|()| response),
                            Ok(Err(err)) => Err(err),
                            Err(_) => Err(TransportError::Timeout(timeout)),
                        }
                    }
                };
                (adapter, target, outcome, started.elapsed())
            });
        }

        let mut winner: Option<TierWinner> = None;
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (adapter, target, outcome, elapsed) = match joined {
                Ok(done) => done,
                Err(err) => {
                    warn!(error = %err, tier = %tier, "stream source task aborted");
                    continue;
                }
            };

            match outcome {
                Ok(response) if winner.is_none() => {
                    info!(
                        source = %adapter.name(),
                        tier = %tier,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "stream source won race"
                    );
                    cancel.cancel();
                    winner = Some(TierWinner {
                        adapter,
                        target,
                        response,
                    });
                }
                Ok(_) | Err(TransportError::Cancelled) => {}
                Err(error) => {
                    debug!(
                        source = %adapter.name(),
                        tier = %tier,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %error,
                        "stream source failed"
                    );
                    failures.push(AdapterFailure {
                        source: adapter.name().to_string(),
                        tier,
                        error,
                    });
                }
            }
        }

        winner.ok_or(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCacheStore};
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    #[derive(Clone)]
    enum Behaviour {
        Succeed { after: Duration, body: &'static str },
        Fail { after: Duration, status: u16 },
    }

    struct CancelGuard {
        finished: bool,
        cancelled: Arc<AtomicUsize>,
    }

    impl Drop for CancelGuard {
        fn drop(&mut self) {
            if !self.finished {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        fetches: HashMap<String, Behaviour>,
        probes: HashMap<String, u16>,
        fetch_log: Mutex<Vec<String>>,
        probe_log: Mutex<Vec<String>>,
        cancelled: Arc<AtomicUsize>,
        cache_on_first_fetch: Mutex<Option<bool>>,
        observed_store: Option<(Arc<MemoryCacheStore>, String)>,
    }

    impl FakeTransport {
        fn on(mut self, url: &str, behaviour: Behaviour) -> Self {
            self.fetches.insert(url.to_string(), behaviour);
            self
        }

        fn probe(mut self, url: &str, status: u16) -> Self {
            self.probes.insert(url.to_string(), status);
            self
        }

        fn watch_key(mut self, store: Arc<MemoryCacheStore>, key: &str) -> Self {
            self.observed_store = Some((store, key.to_string()));
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetch_log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamTransport for FakeTransport {
        async fn fetch(&self, target: &SourceTarget) -> Result<SourceResponse, TransportError> {
            let first = self.fetch_log.lock().unwrap().is_empty();
            if first && let Some((store, key)) = &self.observed_store {
                let present = store.exists(key).await.unwrap();
                *self.cache_on_first_fetch.lock().unwrap() = Some(present);
            }
            self.fetch_log.lock().unwrap().push(target.url.clone());

            let mut guard = CancelGuard {
                finished: false,
                cancelled: Arc::clone(&self.cancelled),
            };
            let behaviour = self
                .fetches
                .get(&target.url)
                .cloned()
                .unwrap_or(Behaviour::Fail {
                    after: Duration::ZERO,
                    status: 404,
                });

            let result = match behaviour {
                Behaviour::Succeed { after, body } => {
                    tokio::time::sleep(after).await;
                    Ok(SourceResponse {
                        status: 200,
                        content_type: Some("text/html".into()),
                        body: body.to_string(),
                    })
                }
                Behaviour::Fail { after, status } => {
                    tokio::time::sleep(after).await;
                    Ok(SourceResponse {
                        status,
                        content_type: None,
                        body: String::new(),
                    })
                }
            };
            guard.finished = true;
            result
        }

        async fn probe(&self, target: &SourceTarget) -> Result<u16, TransportError> {
            self.probe_log.lock().unwrap().push(target.url.clone());
            self.probes
                .get(&target.url)
                .copied()
                .ok_or_else(|| TransportError::Network("connection refused".into()))
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn resolver(
        transport: Arc<FakeTransport>,
        store: Arc<MemoryCacheStore>,
    ) -> StreamResolver {
        StreamResolver::new(
            Arc::new(SourceRegistry::builtin()),
            transport,
            CacheClient::new(store),
            ResolverSettings::default(),
        )
    }

    fn fight_club() -> TitleId {
        TitleId::parse("550").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_tier_wins_after_primary_timeouts() {
        let store = Arc::new(MemoryCacheStore::new());
        let transport = Arc::new(
            FakeTransport::default()
                .on(
                    "https://sonix-movies.vercel.app/movie/550",
                    Behaviour::Succeed { after: ms(10000), body: "late" },
                )
                .on(
                    "https://vidsrc.to/embed/movie/550",
                    Behaviour::Succeed { after: ms(12000), body: "late" },
                )
                .on(
                    "https://goojara.to/embed/550",
                    Behaviour::Succeed { after: ms(1200), body: "<iframe goojara>" },
                )
                .on(
                    "https://flixhq.to/embed/movie/550",
                    Behaviour::Fail { after: ms(300), status: 500 },
                ),
        );
        let resolver = resolver(Arc::clone(&transport), Arc::clone(&store));

        let started = Instant::now();
        let resolved = resolver.resolve(MediaKind::Movie, &fight_club()).await.unwrap();

        assert_eq!(resolved.source_name, "goojara");
        assert_eq!(resolved.payload, "<iframe goojara>");
        assert!(!resolved.from_cache);
        // Primary tier is bounded by the 8s adapter deadline, then 1.2s fallback.
        let elapsed = started.elapsed();
        assert!(elapsed >= ms(9200) && elapsed < ms(9300), "{elapsed:?}");

        let cached: CachedStreamRef = serde_json::from_str(
            &store.get("stream:movie:550").await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(
            cached,
            CachedStreamRef {
                source: "goojara".into(),
                url: "https://goojara.to/embed/550".into(),
            }
        );
        assert_eq!(store.ttl("stream:movie:550"), Some(Duration::from_secs(1800)));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_cancels_remaining_adapters() {
        let store = Arc::new(MemoryCacheStore::new());
        let transport = Arc::new(
            FakeTransport::default()
                .on(
                    "https://sonix-movies.vercel.app/movie/550",
                    Behaviour::Succeed { after: ms(5000), body: "slow" },
                )
                .on(
                    "https://vidsrc.to/embed/movie/550",
                    Behaviour::Succeed { after: ms(100), body: "fast" },
                ),
        );
        let resolver = resolver(Arc::clone(&transport), store);

        let started = Instant::now();
        let resolved = resolver.resolve(MediaKind::Movie, &fight_club()).await.unwrap();

        assert_eq!(resolved.source_name, "vidsrc");
        assert!(started.elapsed() < ms(200));
        assert_eq!(transport.cancelled.load(Ordering::SeqCst), 1);
        // Fallback tier never dispatched.
        assert_eq!(transport.fetched().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_every_failure() {
        let store = Arc::new(MemoryCacheStore::new());
        let transport = Arc::new(FakeTransport::default());
        let resolver = resolver(Arc::clone(&transport), Arc::clone(&store));

        let err = resolver
            .resolve(MediaKind::Tv, &TitleId::parse("1399").unwrap())
            .await
            .unwrap_err();

        let ResolveError::AllSourcesUnavailable { failures } = err;
        let sources: Vec<_> = failures.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(failures.len(), 4);
        for name in ["sonix", "asiaflix", "dramacool", "zoro"] {
            assert!(sources.contains(&name));
        }
        assert!(failures.iter().all(|f| f.error == TransportError::Status(404)));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_body_counts_as_failure() {
        let store = Arc::new(MemoryCacheStore::new());
        let transport = Arc::new(
            FakeTransport::default()
                .on(
                    "https://sonix-movies.vercel.app/movie/550",
                    Behaviour::Succeed { after: ms(100), body: "   " },
                )
                .on(
                    "https://flixhq.to/embed/movie/550",
                    Behaviour::Succeed { after: ms(500), body: "<html>flix</html>" },
                ),
        );
        let resolver = resolver(transport, store);

        let resolved = resolver.resolve(MediaKind::Movie, &fight_club()).await.unwrap();
        assert_eq!(resolved.source_name, "flixhq");
    }

    #[tokio::test(start_paused = true)]
    async fn valid_cached_source_is_reused_without_racing() {
        let store = Arc::new(MemoryCacheStore::new());
        let reference = CachedStreamRef {
            source: "vidsrc".into(),
            url: "https://vidsrc.to/embed/movie/550".into(),
        };
        store
            .set_with_ttl(
                "stream:movie:550",
                &serde_json::to_string(&reference).unwrap(),
                Duration::from_secs(1800),
            )
            .await
            .unwrap();

        let transport = Arc::new(
            FakeTransport::default()
                .probe("https://vidsrc.to/embed/movie/550", 200)
                .on(
                    "https://vidsrc.to/embed/movie/550",
                    Behaviour::Succeed { after: ms(200), body: "cached" },
                ),
        );
        let resolver = resolver(Arc::clone(&transport), store);

        let resolved = resolver.resolve(MediaKind::Movie, &fight_club()).await.unwrap();
        assert!(resolved.from_cache);
        assert_eq!(resolved.source_name, "vidsrc");
        assert_eq!(transport.fetched(), ["https://vidsrc.to/embed/movie/550"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_cached_source_is_removed_before_refetch() {
        let store = Arc::new(MemoryCacheStore::new());
        let reference = CachedStreamRef {
            source: "sonix".into(),
            url: "https://sonix-movies.vercel.app/movie/550".into(),
        };
        store
            .set_with_ttl(
                "stream:movie:550",
                &serde_json::to_string(&reference).unwrap(),
                Duration::from_secs(1800),
            )
            .await
            .unwrap();

        let transport = Arc::new(
            FakeTransport::default()
                .probe("https://sonix-movies.vercel.app/movie/550", 404)
                .on(
                    "https://goojara.to/embed/550",
                    Behaviour::Succeed { after: ms(400), body: "fresh" },
                )
                .watch_key(Arc::clone(&store), "stream:movie:550"),
        );
        let resolver = resolver(Arc::clone(&transport), Arc::clone(&store));

        let resolved = resolver.resolve(MediaKind::Movie, &fight_club()).await.unwrap();

        assert_eq!(resolved.source_name, "goojara");
        assert!(!resolved.from_cache);
        assert_eq!(*transport.cache_on_first_fetch.lock().unwrap(), Some(false));
        assert_eq!(
            transport.probe_log.lock().unwrap().as_slice(),
            [reference.url.clone()]
        );

        let cached: CachedStreamRef = serde_json::from_str(
            &store.get("stream:movie:550").await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(cached.source, "goojara");
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_cached_source_is_dropped_without_probe() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set_with_ttl(
                "stream:movie:550",
                r#"{"source":"retired","url":"https://gone.example/550"}"#,
                Duration::from_secs(1800),
            )
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::default().on(
            "https://vidsrc.to/embed/movie/550",
            Behaviour::Succeed { after: ms(100), body: "ok" },
        ));
        let resolver = resolver(Arc::clone(&transport), Arc::clone(&store));

        let resolved = resolver.resolve(MediaKind::Movie, &fight_club()).await.unwrap();
        assert_eq!(resolved.source_name, "vidsrc");
        // Unknown source names are dropped without a probe.
        assert!(transport.probe_log.lock().unwrap().is_empty());
    }
}
