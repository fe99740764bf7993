use async_trait::async_trait;
use dashmap::DashMap;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::time::Instant;

use super::{CacheError, CacheStore};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Writes between full sweeps of expired entries.
pub const SWEEP_EVERY: u64 = 256;

/// In-process store used when no Redis URL is configured and in tests.
///
/// Expiry is evaluated against the tokio clock, so paused-time tests can
/// advance past a TTL deterministically. Reads drop the expired key they
/// touch; every [`SWEEP_EVERY`] writes the whole map is swept so keys that
/// are never read again do not stay resident.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
    writes: AtomicU64,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn record_write(&self) {
        let written = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if written % SWEEP_EVERY == 0 {
            let swept = self.sweep_expired();
            if swept > 0 {
                tracing::debug!(swept, "swept expired cache entries");
            }
        }
    }

    /// Entries held in memory, expired or not.
    pub fn resident_len(&self) -> usize {
        self.entries.len()
    }

    fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.entries.get(key).map(|e| e.clone())?;
        if entry.is_expired(now) {
            self.entries.remove(key);
            return None;
        }
        Some(entry)
    }

    /// Remaining lifetime of `key`, if it exists and carries an expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.live(key)?;
        entry
            .expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// All fields of the hash at `key`.
    pub fn hash_entries(&self, key: &str) -> Option<HashMap<String, String>> {
        match self.live(key)?.value {
            Value::Hash(fields) => Some(fields),
            Value::Text(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live(key).and_then(|entry| match entry.value {
            Value::Text(text) => Some(text),
            Value::Hash(_) => None,
        }))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        self.record_write();
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut removed = 0;
        for key in keys {
            if self.live(key).is_some() && self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.live(key).is_some())
    }

    async fn hash_set_many(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> Result<(), CacheError> {
        let mut slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: Value::Hash(HashMap::new()),
                expires_at: None,
            });
        if !matches!(slot.value, Value::Hash(_)) || slot.is_expired(Instant::now()) {
            *slot = Entry {
                value: Value::Hash(HashMap::new()),
                expires_at: None,
            };
        }
        if let Value::Hash(fields) = &mut slot.value {
            for (field, value) in entries {
                fields.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    /// Drops expired matches too, but only counts live ones.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            if !key.starts_with(prefix) {
                return true;
            }
            if !entry.is_expired(now) {
                removed += 1;
            }
            false
        });
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
