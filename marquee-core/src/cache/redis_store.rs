use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::{fmt, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, OnceCell},
    time::Instant,
};
use tracing::{debug, info, warn};

use super::{CacheError, CacheStore};

const SCAN_BATCH: usize = 500;

/// Upper bound on one connection attempt. Must stay below the cache
/// operation timeout so the failure is recorded.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Minimum gap between connection attempts while Redis is down.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Redis-backed store sharing one multiplexed connection manager.
///
/// The connection is established lazily. If Redis is down at startup the
/// store still builds, and every operation reports
/// [`CacheError::Unavailable`] until a later attempt connects. Once
/// connected, the manager handles reconnects itself.
#[derive(Clone)]
pub struct RedisCacheStore {
    client: redis::Client,
    conn: Arc<OnceCell<ConnectionManager>>,
    last_failure: Arc<Mutex<Option<Instant>>>,
}

impl fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

fn unavailable(op: &str, err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(format!("Redis {op} failed: {err}"))
}

impl RedisCacheStore {
    /// Builds the store and makes a first connection attempt. Only a
    /// malformed URL is an error; an unreachable server is logged and
    /// retried on later operations.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        info!("Connecting to Redis cache at {}", redis_url);

        let client = redis::Client::open(redis_url).map_err(|e| {
            CacheError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let store = Self {
            client,
            conn: Arc::new(OnceCell::new()),
            last_failure: Arc::new(Mutex::new(None)),
        };

        if let Err(err) = store.connection().await {
            warn!(error = %err, "Redis unreachable; cache reads will miss until it recovers");
        }

        Ok(store)
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn.clone());
        }

        let mut last_failure = self.last_failure.lock().await;
        // Another caller may have connected while this one waited.
        if let Some(conn) = self.conn.get() {
            return Ok(conn.clone());
        }
        if let Some(at) = *last_failure
            && at.elapsed() < RECONNECT_BACKOFF
        {
            return Err(CacheError::Unavailable(
                "Redis unreachable; waiting before reconnecting".into(),
            ));
        }

        let attempt =
            tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(self.client.clone()))
                .await;
        let conn = match attempt {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                *last_failure = Some(Instant::now());
                return Err(CacheError::Unavailable(format!(
                    "Failed to connect to Redis: {e}"
                )));
            }
            Err(_) => {
                *last_failure = Some(Instant::now());
                return Err(CacheError::Unavailable(format!(
                    "Failed to connect to Redis within {CONNECT_TIMEOUT:?}"
                )));
            }
        };

        *last_failure = None;
        info!("Successfully connected to Redis cache");
        Ok(self.conn.get_or_init(move || async move { conn }).await.clone())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| unavailable("GET", e))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| unavailable("SETEX", e))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        conn.del::<_, u64>(keys)
            .await
            .map_err(|e| unavailable("DEL", e))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        conn.exists::<_, bool>(key)
            .await
            .map_err(|e| unavailable("EXISTS", e))
    }

    async fn hash_set_many(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        conn.hset_multiple::<_, _, _, ()>(key, entries)
            .await
            .map_err(|e| unavailable("HSET", e))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let pattern = format!("{prefix}*");
        debug!("Cache DELETE pattern: {}", pattern);

        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| unavailable("SCAN", e))?;

            if !keys.is_empty() {
                removed += conn
                    .del::<_, u64>(keys)
                    .await
                    .map_err(|e| unavailable("DEL", e))?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("Deleted {} keys matching pattern: {}", removed, pattern);
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| unavailable("PING", e))
    }
}
