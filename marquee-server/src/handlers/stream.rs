use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use marquee_core::{MediaKind, TitleId};

use crate::{AppState, infra::errors::AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "mediaKind", alias = "media_type", alias = "type")]
    pub media_kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub payload: String,
    pub source_name: String,
}

/// Resolves a playable source for a title. Kind defaults to movie.
pub async fn stream_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> AppResult<Json<StreamResponse>> {
    let id = TitleId::parse(&id)?;
    let kind = match query.media_kind.as_deref() {
        None | Some("") => MediaKind::Movie,
        Some(raw) => raw.parse::<MediaKind>()?,
    };

    let resolved = state.resolver.resolve(kind, &id).await?;
    info!(
        kind = %kind,
        id = %id,
        source = %resolved.source_name,
        from_cache = resolved.from_cache,
        "stream resolved"
    );

    Ok(Json(StreamResponse {
        payload: resolved.payload,
        source_name: resolved.source_name,
    }))
}
