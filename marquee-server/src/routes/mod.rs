use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{category, detail, discovery, ops, stream, watchlist},
};

/// Route templates, shared with the integration tests.
pub mod paths {
    pub const PING: &str = "/ping";
    pub const HEALTH: &str = "/health";
    pub const STREAM: &str = "/stream/{id}";
    pub const CATEGORY: &str = "/category/{name}";
    pub const DETAIL: &str = "/detail/{media_kind}/{id}";
    pub const SEASON: &str = "/detail/{media_kind}/{id}/season/{season}";
    pub const EPISODE: &str = "/detail/{media_kind}/{id}/season/{season}/episode/{episode}";
    pub const HERO: &str = "/hero";
    pub const SEARCH: &str = "/search";
    pub const GENRE: &str = "/search/genre";
    pub const TRENDING: &str = "/trending";
    pub const WATCHLIST_SYNC: &str = "/watchlist/sync";
}

/// Every public route. Layers are applied by the binary.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(paths::PING, get(ops::ping_handler))
        .route(paths::HEALTH, get(ops::health_handler))
        .route(paths::STREAM, get(stream::stream_handler))
        .route(paths::CATEGORY, get(category::category_handler))
        .route(paths::DETAIL, get(detail::detail_handler))
        .route(paths::SEASON, get(detail::season_handler))
        .route(paths::EPISODE, get(detail::episode_handler))
        .route(paths::HERO, get(discovery::hero_handler))
        .route(paths::SEARCH, get(discovery::search_handler))
        .route(paths::GENRE, get(discovery::genre_handler))
        .route(paths::TRENDING, get(discovery::trending_handler))
        .route(paths::WATCHLIST_SYNC, post(watchlist::sync_handler))
}
