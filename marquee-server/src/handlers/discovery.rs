use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use marquee_core::{
    discovery::{HeroCard, MISSING_QUERY, SearchPage, TrendingPage, parse_genre_ids},
    tmdb::SearchScope,
};

use crate::{
    AppState,
    handlers::category::PageQuery,
    infra::errors::{AppError, AppResult},
};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenreQuery {
    pub id: Option<String>,
    pub page: Option<u32>,
}

pub async fn hero_handler(State(state): State<AppState>) -> AppResult<Json<Vec<HeroCard>>> {
    let heroes = state.discovery.hero().await?;
    Ok(Json(heroes))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchPage>> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request(MISSING_QUERY))?;
    let scope = SearchScope::parse_lenient(params.search_type.as_deref());

    let page = state
        .discovery
        .search(query, scope, params.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

pub async fn genre_handler(
    State(state): State<AppState>,
    Query(params): Query<GenreQuery>,
) -> AppResult<Json<SearchPage>> {
    let genres = parse_genre_ids(params.id.as_deref())?;
    let page = state
        .discovery
        .genre(&genres, params.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

pub async fn trending_handler(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<TrendingPage>> {
    let page = state.discovery.trending(params.page.unwrap_or(1)).await?;
    Ok(Json(page))
}
