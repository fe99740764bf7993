use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::Value;

use marquee_core::{MediaKind, detail::DetailRecord, media::parse_tmdb_id};

use crate::{
    AppState,
    infra::errors::{AppError, AppResult},
};

pub async fn detail_handler(
    State(state): State<AppState>,
    Path((media_kind, id)): Path<(String, String)>,
) -> AppResult<Json<DetailRecord>> {
    let kind = media_kind.parse::<MediaKind>()?;
    let id = parse_tmdb_id(&id)?;

    let record = state.details.get(kind, id).await?;
    Ok(Json(record))
}

pub async fn season_handler(
    State(state): State<AppState>,
    Path((media_kind, id, season)): Path<(String, String, String)>,
) -> AppResult<Json<Value>> {
    let id = tv_id(&media_kind, &id)?;
    let season = number(&season, "Invalid season number")?;

    let payload = state.episodes.season(id, season).await?;
    Ok(Json(payload))
}

pub async fn episode_handler(
    State(state): State<AppState>,
    Path((media_kind, id, season, episode)): Path<(String, String, String, String)>,
) -> AppResult<Json<Value>> {
    let id = tv_id(&media_kind, &id)?;
    let season = number(&season, "Invalid season number")?;
    let episode = number(&episode, "Invalid episode number")?;

    let payload = state.episodes.episode(id, season, episode).await?;
    Ok(Json(payload))
}

fn tv_id(media_kind: &str, id: &str) -> AppResult<u64> {
    if media_kind.parse::<MediaKind>()? != MediaKind::Tv {
        return Err(AppError::bad_request("Seasons are only available for tv"));
    }
    Ok(parse_tmdb_id(id)?)
}

fn number(raw: &str, message: &str) -> AppResult<u32> {
    raw.parse::<u32>()
        .map_err(|_| AppError::bad_request(message))
}
