//! Best-effort sink for watchlists synced from offline clients.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    cache::{CacheClient, CacheKeys},
    error::CatalogError,
};

pub const NO_WATCHLIST_DATA: &str = "No watchlist data provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub count: usize,
}

/// Writes opaque records into one hash, keyed by each record's `id`.
#[derive(Debug, Clone)]
pub struct WatchlistSink {
    cache: CacheClient,
}

/// Field name for a record: its `id` as a string, when present and usable.
fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

impl WatchlistSink {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    pub async fn sync(&self, body: &Value) -> Result<SyncOutcome, CatalogError> {
        let records = match body.as_array() {
            Some(records) if !records.is_empty() => records,
            _ => return Err(CatalogError::InvalidInput(NO_WATCHLIST_DATA.to_string())),
        };

        let mut fields = Vec::with_capacity(records.len());
        for record in records {
            match record_id(record) {
                Some(id) => fields.push((id, serde_json::to_string(record)?)),
                None => debug!("skipping watchlist record without id"),
            }
        }

        self.cache
            .hash_set_many(CacheKeys::WATCHLIST, &fields)
            .await?;
        info!(
            received = records.len(),
            stored = fields.len(),
            "watchlist synced"
        );

        Ok(SyncOutcome {
            success: true,
            count: records.len(),
        })
    }
}
