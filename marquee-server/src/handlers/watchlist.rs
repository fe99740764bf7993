use axum::{Json, body::Bytes, extract::State};
use serde_json::Value;
use tracing::info;

use marquee_core::watchlist::SyncOutcome;

use crate::{AppState, infra::errors::AppResult};

/// Accepts a JSON array of watchlist records. The raw body is parsed here so
/// an empty or malformed payload gets the same 400 as an empty array.
pub async fn sync_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<SyncOutcome>> {
    let records: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let outcome = state.watchlist.sync(&records).await?;
    info!(count = outcome.count, "watchlist synced");
    Ok(Json(outcome))
}
