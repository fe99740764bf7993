//! Key/value cache seam.
//!
//! [`CacheStore`] is the raw backend contract (strings in, strings out, per
//! key TTL). [`CacheClient`] wraps a shared store with the operation
//! deadline and the typed JSON helpers every service goes through. Callers
//! never see a backend failure on the read path: unavailable, timed out and
//! corrupt entries all surface as a miss.

mod keys;
mod memory;
mod redis_store;

pub use self::keys::CacheKeys;
pub use self::memory::MemoryCacheStore;
pub use self::redis_store::RedisCacheStore;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raw backend contract. Absence is never an error; only an unreachable
/// backend is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name reported by health checks.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Atomically stores `value` under `key` with the given expiry.
    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Removes `keys`, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Writes several fields into the hash stored at `key`.
    async fn hash_set_many(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> Result<(), CacheError>;

    /// Removes every key starting with `prefix`, returning the count.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Shared handle over a [`CacheStore`] with a per-operation deadline.
#[derive(Clone)]
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    operation_timeout: Duration,
}

impl fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.store.backend())
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl CacheClient {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.operation_timeout)),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(self.store.get(key)).await
    }

    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.bounded(self.store.set_with_ttl(key, value, ttl)).await
    }

    pub async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.bounded(self.store.delete(keys)).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.bounded(self.store.exists(key)).await
    }

    pub async fn hash_set_many(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        self.bounded(self.store.hash_set_many(key, entries)).await
    }

    pub async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        self.bounded(self.store.delete_prefix(prefix)).await
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(self.store.ping()).await
    }

    /// Reads and decodes `key`. Backend failures and payloads that do not
    /// decode as `T` are reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        debug!("Cache GET: {}", key);

        let raw = match self.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                return None;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache HIT: {}", key);
                Some(value)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "corrupt cache payload; treating as miss");
                None
            }
        }
    }

    /// Encodes and stores `value`. Returns whether the write landed; a failed
    /// write is logged and otherwise ignored.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> bool {
        debug!("Cache SET: {} (TTL: {:?})", key, ttl);

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to encode cache payload");
                return false;
            }
        };

        match self.set_with_ttl(key, &encoded, ttl).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = %key, error = %err, "cache write failed");
                false
            }
        }
    }

    /// Deletes `key`, logging rather than surfacing backend failures.
    pub async fn invalidate(&self, key: &str) -> bool {
        debug!("Cache DELETE: {}", key);

        match self.delete(&[key.to_string()]).await {
            Ok(removed) => removed > 0,
            Err(err) => {
                warn!(key = %key, error = %err, "cache delete failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        name: String,
        count: u32,
    }

    fn memory_client() -> (CacheClient, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        (CacheClient::new(store.clone()), store)
    }

    #[tokio::test]
    async fn typed_round_trip_through_memory_store() {
        let (client, _) = memory_client();
        let payload = Payload {
            name: "fight club".into(),
            count: 2,
        };

        assert!(client.set_json("k", &payload, Duration::from_secs(60)).await);
        assert_eq!(client.get_json::<Payload>("k").await, Some(payload));
    }

    #[tokio::test]
    async fn corrupt_payload_reads_as_miss_and_is_left_in_place() {
        let (client, store) = memory_client();
        store
            .set_with_ttl("k", "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(client.get_json::<Payload>("k").await, None);
        assert!(client.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_backend_degrades_to_miss() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(CacheError::Unavailable("connection refused".into())));
        store
            .expect_set_with_ttl()
            .returning(|_, _, _| Err(CacheError::Unavailable("connection refused".into())));
        store.expect_backend().return_const("mock");

        let client = CacheClient::new(Arc::new(store));

        assert_eq!(client.get_json::<Payload>("k").await, None);
        assert!(
            !client
                .set_json(
                    "k",
                    &Payload {
                        name: "x".into(),
                        count: 1
                    },
                    Duration::from_secs(5)
                )
                .await
        );
    }

    #[tokio::test]
    async fn empty_delete_does_not_touch_the_backend() {
        let mut store = MockCacheStore::new();
        store.expect_delete().never();
        let client = CacheClient::new(Arc::new(store));

        assert_eq!(client.delete(&[]).await.unwrap(), 0);
    }
}
