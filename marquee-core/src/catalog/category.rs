use chrono::{Datelike, NaiveDate};
use std::{fmt, sync::Arc};

use crate::{
    media::MediaKind,
    tmdb::{ContentItem, SortCriterion},
};

/// Genres dropped from every listing (documentary, TV movie).
pub const EXCLUDED_GENRES: [u32; 2] = [99, 10770];

/// Upstream slice of a category: one origin country, or the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    Global,
    Country(String),
}

impl Partition {
    pub fn country(code: &str) -> Self {
        Partition::Country(code.to_string())
    }

    pub fn origin_country(&self) -> Option<String> {
        match self {
            Partition::Global => None,
            Partition::Country(code) => Some(code.clone()),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Global => f.write_str("global"),
            Partition::Country(code) => f.write_str(code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField {
    Poster,
    Backdrop,
}

/// Which artwork a category shows and at what TMDB size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStyle {
    pub field: ImageField,
    pub size: String,
}

impl ImageStyle {
    pub fn new(field: ImageField, size: &str) -> Self {
        Self {
            field,
            size: size.to_string(),
        }
    }

    pub fn path<'a>(&self, item: &'a ContentItem) -> Option<&'a str> {
        let path = match self.field {
            ImageField::Poster => item.poster_path.as_deref(),
            ImageField::Backdrop => item.backdrop_path.as_deref(),
        };
        path.filter(|p| !p.trim().is_empty())
    }

    pub fn url(&self, image_base: &str, item: &ContentItem) -> Option<String> {
        self.path(item)
            .map(|path| format!("{}/{}{}", image_base.trim_end_matches('/'), self.size, path))
    }
}

/// Lower bound on release date for a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    /// Released on or after January 1st of the given year.
    SinceYear(i32),
    /// Released within the trailing number of years.
    TrailingYears(u32),
}

impl Recency {
    pub fn lower_bound(&self, today: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Recency::SinceYear(year) => NaiveDate::from_ymd_opt(year, 1, 1),
            Recency::TrailingYears(years) => {
                let year = today.year() - years as i32;
                today
                    .with_year(year)
                    .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), 28))
            }
        }
    }
}

/// Query shape of one listing slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceQuery {
    pub sort: SortCriterion,
    pub min_votes: Option<u32>,
    pub recency: Option<Recency>,
    /// Upstream pages merged into a fixed (non-paginated) slice.
    pub pages: u32,
}

impl SliceQuery {
    pub fn new(sort: SortCriterion) -> Self {
        Self {
            sort,
            min_votes: None,
            recency: None,
            pages: 1,
        }
    }

    pub fn min_votes(mut self, votes: u32) -> Self {
        self.min_votes = Some(votes);
        self
    }

    pub fn recency(mut self, recency: Recency) -> Self {
        self.recency = Some(recency);
        self
    }

    pub fn pages(mut self, pages: u32) -> Self {
        self.pages = pages.max(1);
        self
    }
}

/// A region/language grouping served by the category listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub name: String,
    pub partitions: Vec<Partition>,
    pub kinds: Vec<MediaKind>,
    pub image: ImageStyle,
    pub excluded_genres: Vec<u32>,
    pub top_rated: SliceQuery,
    pub new_releases: SliceQuery,
    pub popular: SliceQuery,
}

impl CategoryDefinition {
    pub fn mixes_kinds(&self) -> bool {
        self.kinds.len() > 1
    }
}

fn countries(codes: &[&str]) -> Vec<Partition> {
    codes.iter().map(|code| Partition::country(code)).collect()
}

/// The categories served out of the box.
pub fn builtin_categories() -> Vec<CategoryDefinition> {
    use SortCriterion::{Popularity, Rating, ReleaseDate};
    let both = vec![MediaKind::Movie, MediaKind::Tv];

    vec![
        CategoryDefinition {
            name: "hollywood".into(),
            partitions: countries(&["US", "GB", "CA", "AU", "NZ", "IE"]),
            kinds: vec![MediaKind::Movie],
            image: ImageStyle::new(ImageField::Backdrop, "w780"),
            excluded_genres: EXCLUDED_GENRES.to_vec(),
            top_rated: SliceQuery::new(Rating)
                .min_votes(1000)
                .recency(Recency::SinceYear(2000)),
            new_releases: SliceQuery::new(ReleaseDate)
                .min_votes(100)
                .recency(Recency::TrailingYears(2)),
            popular: SliceQuery::new(Popularity).min_votes(1000),
        },
        CategoryDefinition {
            name: "bollywood".into(),
            partitions: countries(&["IN", "PK"]),
            kinds: both.clone(),
            image: ImageStyle::new(ImageField::Backdrop, "w780"),
            excluded_genres: EXCLUDED_GENRES.to_vec(),
            top_rated: SliceQuery::new(Rating).min_votes(10).pages(5),
            new_releases: SliceQuery::new(ReleaseDate)
                .min_votes(10)
                .recency(Recency::TrailingYears(2))
                .pages(5),
            popular: SliceQuery::new(Popularity).min_votes(10),
        },
        CategoryDefinition {
            name: "asian".into(),
            partitions: countries(&["KR", "JP", "CN", "HK", "TW", "TH", "PH", "SG"]),
            kinds: both.clone(),
            image: ImageStyle::new(ImageField::Backdrop, "w780"),
            excluded_genres: EXCLUDED_GENRES.to_vec(),
            top_rated: SliceQuery::new(Rating)
                .min_votes(90)
                .recency(Recency::SinceYear(2000)),
            new_releases: SliceQuery::new(ReleaseDate)
                .min_votes(90)
                .recency(Recency::TrailingYears(2)),
            popular: SliceQuery::new(Popularity).min_votes(90),
        },
        CategoryDefinition {
            name: "nollywood".into(),
            partitions: countries(&["NG"]),
            kinds: both,
            image: ImageStyle::new(ImageField::Poster, "w500"),
            excluded_genres: EXCLUDED_GENRES.to_vec(),
            top_rated: SliceQuery::new(Rating).min_votes(3),
            new_releases: SliceQuery::new(ReleaseDate)
                .min_votes(2)
                .recency(Recency::TrailingYears(1)),
            popular: SliceQuery::new(Popularity).min_votes(2),
        },
        CategoryDefinition {
            name: "all".into(),
            partitions: vec![Partition::Global],
            kinds: vec![MediaKind::Movie],
            image: ImageStyle::new(ImageField::Poster, "w780"),
            excluded_genres: EXCLUDED_GENRES.to_vec(),
            top_rated: SliceQuery::new(Rating).min_votes(1000),
            new_releases: SliceQuery::new(ReleaseDate).recency(Recency::TrailingYears(1)),
            popular: SliceQuery::new(Popularity),
        },
    ]
}

/// Named lookup over the configured categories.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Arc<CategoryDefinition>>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(builtin_categories())
    }
}

impl CategoryCatalog {
    pub fn new(categories: Vec<CategoryDefinition>) -> Self {
        Self {
            categories: categories.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<CategoryDefinition>> {
        self.categories
            .iter()
            .find(|category| category.name == name)
            .cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.name.as_str())
    }
}
