use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoverPage<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

fn first_page() -> u32 {
    1
}

/// A title as it appears in TMDB list endpoints (discover, popular,
/// search, recommendations). Movies carry `title`/`release_date`, series
/// carry `name`/`first_air_date`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentItem {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl ContentItem {
    /// `title`, else `name`, else empty.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.name.as_deref())
            .unwrap_or("")
    }

    /// Four-digit year from whichever release date is present.
    pub fn year(&self) -> Option<String> {
        self.release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.first_air_date.as_deref())
            .and_then(|date| date.get(..4))
            .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }

    /// Vote average rendered with one decimal.
    pub fn rating(&self) -> Option<String> {
        self.vote_average.map(|v| format!("{v:.1}"))
    }
}

/// Ordering requested from the discover endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCriterion {
    Popularity,
    Rating,
    ReleaseDate,
}

impl SortCriterion {
    pub fn sort_by(&self, kind: MediaKind) -> String {
        match self {
            SortCriterion::Popularity => "popularity.desc".to_string(),
            SortCriterion::Rating => "vote_average.desc".to_string(),
            SortCriterion::ReleaseDate => format!("{}.desc", kind.release_date_field()),
        }
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

/// One discover call: a page for a single origin partition.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    pub sort: SortCriterion,
    pub page: u32,
    pub origin_country: Option<String>,
    pub min_votes: Option<u32>,
    pub released_after: Option<NaiveDate>,
    pub released_before: Option<NaiveDate>,
    pub with_genres: Vec<u32>,
    pub without_genres: Vec<u32>,
}

impl DiscoverQuery {
    /// Popular titles tagged with every one of `genres`.
    pub fn genre(genres: &[u32], page: u32) -> Self {
        Self {
            sort: SortCriterion::Popularity,
            page,
            origin_country: None,
            min_votes: None,
            released_after: None,
            released_before: None,
            with_genres: genres.to_vec(),
            without_genres: Vec::new(),
        }
    }

    pub fn to_params(&self, kind: MediaKind) -> Vec<(String, String)> {
        let date_field = kind.release_date_field();
        let mut params = vec![
            ("sort_by".to_string(), self.sort.sort_by(kind)),
            ("include_adult".to_string(), "false".to_string()),
            ("page".to_string(), self.page.max(1).to_string()),
        ];
        if let Some(country) = &self.origin_country {
            params.push(("with_origin_country".to_string(), country.clone()));
        }
        if let Some(votes) = self.min_votes {
            params.push(("vote_count.gte".to_string(), votes.to_string()));
        }
        if let Some(after) = self.released_after {
            params.push((format!("{date_field}.gte"), after.format("%Y-%m-%d").to_string()));
        }
        if let Some(before) = self.released_before {
            params.push((format!("{date_field}.lte"), before.format("%Y-%m-%d").to_string()));
        }
        if !self.with_genres.is_empty() {
            params.push(("with_genres".to_string(), join_ids(&self.with_genres)));
        }
        if !self.without_genres.is_empty() {
            params.push(("without_genres".to_string(), join_ids(&self.without_genres)));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Keyword {
    pub id: u64,
    pub name: String,
}

/// Primary `/{kind}/{id}` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailPayload {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub adult: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Video {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideosPayload {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewsPayload {
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub character: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditsPayload {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

/// Movies list keywords under `keywords`, series under `results`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordsPayload {
    #[serde(default, alias = "results")]
    pub keywords: Vec<Keyword>,
}
