use serde::{Deserialize, Serialize};

use crate::tmdb::{
    CastMember, ContentItem, CreditsPayload, DetailPayload, DiscoverPage, Genre, Keyword,
    KeywordsPayload, ReviewsPayload, Video, VideosPayload,
};

const LIST_LIMIT: usize = 8;

/// Full per-title bundle served by `GET /detail/{kind}/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: u64,
    pub title: String,
    pub rating: f64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub overview: String,
    pub release_date: String,
    pub runtime: Option<u32>,
    pub language: Option<String>,
    pub genres: Vec<Genre>,
    pub keywords: Vec<Keyword>,
    pub trailer: Option<Video>,
    pub reviews_count: u64,
    pub main_cast: Vec<CastMember>,
    pub recommendations: Vec<ContentItem>,
    pub similar: Vec<ContentItem>,
    pub adult: bool,
    pub vote_count: u64,
}

/// Secondary lookups; `None` means that facet failed.
#[derive(Debug, Default)]
pub struct Facets {
    pub videos: Option<VideosPayload>,
    pub reviews: Option<ReviewsPayload>,
    pub credits: Option<CreditsPayload>,
    pub recommendations: Option<DiscoverPage<ContentItem>>,
    pub similar: Option<DiscoverPage<ContentItem>>,
    pub keywords: Option<KeywordsPayload>,
}

fn top(page: Option<DiscoverPage<ContentItem>>) -> Vec<ContentItem> {
    page.map(|page| page.results.into_iter().take(LIST_LIMIT).collect())
        .unwrap_or_default()
}

impl DetailRecord {
    pub fn assemble(primary: DetailPayload, facets: Facets) -> Self {
        let trailer = facets.videos.and_then(|videos| {
            videos
                .results
                .into_iter()
                .find(|video| video.video_type == "Trailer" && video.site == "YouTube")
        });
        let main_cast = facets
            .credits
            .map(|credits| credits.cast.into_iter().take(LIST_LIMIT).collect())
            .unwrap_or_default();

        let title = primary
            .title
            .filter(|t| !t.is_empty())
            .or(primary.name)
            .unwrap_or_default();
        let release_date = primary
            .release_date
            .filter(|d| !d.is_empty())
            .or(primary.first_air_date)
            .unwrap_or_default();
        let runtime = primary
            .runtime
            .or_else(|| primary.episode_run_time.first().copied());
        let rating = primary
            .vote_average
            .map(|v| (v * 100.0).round() / 100.0)
            .unwrap_or(0.0);

        Self {
            id: primary.id,
            title,
            rating,
            poster_path: primary.poster_path,
            backdrop_path: primary.backdrop_path,
            overview: primary.overview.unwrap_or_default(),
            release_date,
            runtime,
            language: primary.original_language,
            genres: primary.genres,
            keywords: facets
                .keywords
                .map(|k| k.keywords)
                .unwrap_or_default(),
            trailer,
            reviews_count: facets.reviews.map(|r| r.total_results).unwrap_or(0),
            main_cast,
            recommendations: top(facets.recommendations),
            similar: top(facets.similar),
            adult: primary.adult,
            vote_count: primary.vote_count.unwrap_or(0),
        }
    }
}
