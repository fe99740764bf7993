use crate::media::{MediaKind, TitleId};

/// Builders for every cache key namespace in use.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeys;

impl CacheKeys {
    pub const WATCHLIST: &'static str = "watchlist:offline";
    pub const HERO: &'static str = "home:hero";

    pub fn stream(kind: MediaKind, id: &TitleId) -> String {
        format!("stream:{kind}:{id}")
    }

    pub fn top_rated(category: &str) -> String {
        format!("{category}:topRated")
    }

    pub fn new_releases(category: &str) -> String {
        format!("{category}:newReleases")
    }

    pub fn popular_page(category: &str, page: u32) -> String {
        format!("{category}:popular:page:{page}")
    }

    pub fn detail(kind: MediaKind, id: u64) -> String {
        format!("{kind}:details:{id}")
    }

    pub fn season(id: u64, season: u32) -> String {
        format!("tv:details:{id}:season:{season}")
    }

    pub fn episode(id: u64, season: u32, episode: u32) -> String {
        format!("tv:details:{id}:season:{season}:episode:{episode}")
    }

    pub fn search(search_type: &str, query: &str, page: u32) -> String {
        format!("search:{search_type}:{query}:page:{page}")
    }

    pub fn genre(genres: &str, page: u32) -> String {
        format!("genre:{genres}:page:{page}")
    }

    pub fn trending(page: u32) -> String {
        format!("trending:day:page:{page}")
    }
}
