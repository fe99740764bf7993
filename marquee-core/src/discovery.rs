//! Home page hero banner, free-text search, genre browse and the trending
//! listing.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    cache::{CacheClient, CacheKeys},
    catalog::PosterCard,
    error::CatalogError,
    media::MediaKind,
    tmdb::{ContentItem, DiscoverPage, DiscoverQuery, SearchScope, TmdbClient},
};

pub const FALLBACK_HERO_IMAGE: &str = "/images/sinners.webp";
pub const MISSING_QUERY: &str = "Missing search query";
pub const NO_MOVIES_FOUND: &str = "No movies found";
pub const MISSING_GENRE: &str = "Missing genre id";
pub const INVALID_GENRE: &str = "Invalid genre id";

const POSTER_SIZE: &str = "w500";
const HERO_SIZE: &str = "original";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub hero_ttl: Duration,
    pub hero_count: usize,
    pub search_ttl: Duration,
    pub fallback_image: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            hero_ttl: Duration::from_secs(30 * 60),
            hero_count: 10,
            search_ttl: Duration::from_secs(60 * 60),
            fallback_image: FALLBACK_HERO_IMAGE.to_string(),
        }
    }
}

/// Hero ids are TMDB ids, or a generated placeholder for filler slides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeroId {
    Tmdb(u64),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroCard {
    pub id: HeroId,
    pub title: String,
    pub image: String,
    pub year: Option<String>,
    pub rating: String,
    pub votes: u64,
    pub language: String,
    pub description: String,
}

impl HeroCard {
    /// Filler slide for banner position `slot`.
    fn placeholder(slot: usize, image: &str) -> Self {
        Self {
            id: HeroId::Placeholder(format!("fallback-{slot}")),
            title: "No Title".to_string(),
            image: image.to_string(),
            year: None,
            rating: "0.0".to_string(),
            votes: 0,
            language: "en".to_string(),
            description: "No description available.".to_string(),
        }
    }
}

/// Paging metadata shared by search and trending responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub has_next_page: bool,
}

impl PageInfo {
    fn of<T>(page: &DiscoverPage<T>) -> Self {
        Self {
            page: page.page,
            total_pages: page.total_pages,
            total_results: page.total_results,
            has_next_page: page.page < page.total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<PosterCard>,
    #[serde(flatten)]
    pub info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingPage {
    pub trending: Vec<PosterCard>,
    #[serde(flatten)]
    pub info: PageInfo,
}

/// Parses a genre id list such as `28` or `28,12`.
pub fn parse_genre_ids(raw: Option<&str>) -> Result<Vec<u32>, CatalogError> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CatalogError::InvalidInput(MISSING_GENRE.to_string()))?;

    raw.split(',')
        .map(|id| {
            id.trim()
                .parse::<u32>()
                .map_err(|_| CatalogError::InvalidInput(INVALID_GENRE.to_string()))
        })
        .collect()
}

/// Media kind for a search hit: TMDB's own tag when it names a title kind,
/// then the shape of the record, then the scope searched.
pub fn resolve_kind(item: &ContentItem, scope: SearchScope) -> MediaKind {
    match item.media_type.as_deref() {
        Some("movie") => return MediaKind::Movie,
        Some("tv") => return MediaKind::Tv,
        _ => {}
    }

    let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
    if present(&item.title) && present(&item.release_date) {
        MediaKind::Movie
    } else if present(&item.name) && present(&item.first_air_date) {
        MediaKind::Tv
    } else {
        match scope {
            SearchScope::Tv => MediaKind::Tv,
            SearchScope::Movie | SearchScope::Multi => MediaKind::Movie,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Discovery {
    tmdb: TmdbClient,
    cache: CacheClient,
    image_base: String,
    settings: DiscoverySettings,
}

impl Discovery {
    pub fn new(
        tmdb: TmdbClient,
        cache: CacheClient,
        image_base: impl Into<String>,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            tmdb,
            cache,
            image_base: image_base.into().trim_end_matches('/').to_string(),
            settings,
        }
    }

    fn poster_cards(
        &self,
        items: Vec<ContentItem>,
        kind_of: impl Fn(&ContentItem) -> MediaKind,
    ) -> Vec<PosterCard> {
        items
            .into_iter()
            .filter_map(|item| {
                let path = item.poster_path.as_deref().filter(|p| !p.is_empty())?;
                let image = format!("{}/{}{}", self.image_base, POSTER_SIZE, path);
                Some(PosterCard::new(&item, kind_of(&item), image))
            })
            .collect()
    }

    /// Random popular movies with a backdrop, padded with placeholders up to
    /// the configured count.
    pub async fn hero(&self) -> Result<Vec<HeroCard>, CatalogError> {
        if let Some(cached) = self.cache.get_json::<Vec<HeroCard>>(CacheKeys::HERO).await {
            return Ok(cached);
        }

        let popular = self
            .tmdb
            .popular(MediaKind::Movie, 1)
            .await
            .map_err(CatalogError::Upstream)?;
        if popular.results.is_empty() {
            warn!("popular movies came back empty");
            return Err(CatalogError::NotFound(NO_MOVIES_FOUND.to_string()));
        }

        let mut candidates: Vec<ContentItem> = popular
            .results
            .into_iter()
            .filter(|movie| {
                movie.backdrop_path.as_deref().is_some_and(|p| !p.is_empty())
                    && !movie.display_title().is_empty()
            })
            .collect();
        candidates.shuffle(&mut rand::rng());
        candidates.truncate(self.settings.hero_count);

        let mut heroes: Vec<HeroCard> = candidates
            .into_iter()
            .map(|movie| HeroCard {
                id: HeroId::Tmdb(movie.id),
                title: movie.display_title().to_string(),
                image: format!(
                    "{}/{}{}",
                    self.image_base,
                    HERO_SIZE,
                    movie.backdrop_path.as_deref().unwrap_or_default()
                ),
                year: movie.year(),
                rating: format!("{:.1}", movie.vote_average.unwrap_or(0.0)),
                votes: movie.vote_count.unwrap_or(0),
                language: movie.original_language.clone().unwrap_or_default(),
                description: movie.overview.clone().unwrap_or_default(),
            })
            .collect();

        let filled = heroes.len();
        let missing = self.settings.hero_count.saturating_sub(filled);
        if missing > 0 {
            debug!(missing, "padding hero banner with placeholders");
        }
        heroes.extend(
            (filled..self.settings.hero_count)
                .map(|slot| HeroCard::placeholder(slot, &self.settings.fallback_image)),
        );

        self.cache
            .set_json(CacheKeys::HERO, &heroes, self.settings.hero_ttl)
            .await;
        Ok(heroes)
    }

    pub async fn search(
        &self,
        query: &str,
        scope: SearchScope,
        page: u32,
    ) -> Result<SearchPage, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidInput(MISSING_QUERY.to_string()));
        }
        let page = page.max(1);
        let key = CacheKeys::search(scope.as_str(), query, page);
        if let Some(cached) = self.cache.get_json::<SearchPage>(&key).await {
            return Ok(cached);
        }

        let upstream = self
            .tmdb
            .search(scope, query, page)
            .await
            .map_err(CatalogError::Upstream)?;
        let info = PageInfo::of(&upstream);
        let response = SearchPage {
            results: self.poster_cards(upstream.results, |item| resolve_kind(item, scope)),
            info,
        };

        self.cache
            .set_json(&key, &response, self.settings.search_ttl)
            .await;
        Ok(response)
    }

    /// Popular movies carrying every genre in `genres`.
    pub async fn genre(&self, genres: &[u32], page: u32) -> Result<SearchPage, CatalogError> {
        if genres.is_empty() {
            return Err(CatalogError::InvalidInput(MISSING_GENRE.to_string()));
        }
        let page = page.max(1);
        let ids = genres
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let key = CacheKeys::genre(&ids, page);
        if let Some(cached) = self.cache.get_json::<SearchPage>(&key).await {
            return Ok(cached);
        }

        let upstream = self
            .tmdb
            .discover(MediaKind::Movie, &DiscoverQuery::genre(genres, page))
            .await
            .map_err(CatalogError::Upstream)?;
        let info = PageInfo::of(&upstream);
        let response = SearchPage {
            results: self.poster_cards(upstream.results, |_| MediaKind::Movie),
            info,
        };

        self.cache
            .set_json(&key, &response, self.settings.search_ttl)
            .await;
        Ok(response)
    }

    pub async fn trending(&self, page: u32) -> Result<TrendingPage, CatalogError> {
        let page = page.max(1);
        let key = CacheKeys::trending(page);
        if let Some(cached) = self.cache.get_json::<TrendingPage>(&key).await {
            return Ok(cached);
        }

        let upstream = self
            .tmdb
            .trending_movies_today(page)
            .await
            .map_err(CatalogError::Upstream)?;
        let info = PageInfo::of(&upstream);
        let response = TrendingPage {
            trending: self.poster_cards(upstream.results, |_| MediaKind::Movie),
            info,
        };

        self.cache
            .set_json(&key, &response, self.settings.search_ttl)
            .await;
        Ok(response)
    }
}
