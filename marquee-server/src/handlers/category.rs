use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use marquee_core::catalog::CategoryListing;

use crate::{
    AppState,
    infra::errors::{AppError, AppResult},
};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

pub async fn category_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<CategoryListing>> {
    let category = state
        .categories
        .get(&name)
        .ok_or_else(|| AppError::bad_request("Invalid category"))?;

    let ceiling = state.listings.settings().total_pages.max(1);
    let page = query.page.unwrap_or(1).clamp(1, ceiling);

    let listing = state.listings.listing(&category, page).await?;
    Ok(Json(listing))
}
