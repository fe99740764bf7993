use chrono::{NaiveDate, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{
    aggregate::{AggregationFetcher, TaggedItem},
    card::PosterCard,
    category::{CategoryDefinition, SliceQuery},
};
use crate::{
    cache::{CacheClient, CacheKeys},
    error::CatalogError,
};

pub const CATALOG_UNAVAILABLE: &str = "Catalog temporarily unavailable.";

/// Tunables for category listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSettings {
    pub listing_ttl: Duration,
    pub negative_ttl: Duration,
    pub sample_size: usize,
    pub total_pages: u32,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            listing_ttl: Duration::from_secs(60 * 60),
            negative_ttl: Duration::from_secs(5 * 60),
            sample_size: 12,
            total_pages: 1000,
        }
    }
}

/// Response body of `GET /category/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListing {
    pub top_rated: Vec<PosterCard>,
    pub new_releases: Vec<PosterCard>,
    pub popular: Vec<PosterCard>,
    pub page: u32,
    pub total_pages: u32,
}

/// How a slice was obtained for the current request.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceOutcome {
    Cached(Vec<PosterCard>),
    Fresh(Vec<PosterCard>),
    /// Upstream failed; an empty entry was written with the negative TTL.
    Failed,
}

impl SliceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SliceOutcome::Failed)
    }

    pub fn into_cards(self) -> Vec<PosterCard> {
        match self {
            SliceOutcome::Cached(cards) | SliceOutcome::Fresh(cards) => cards,
            SliceOutcome::Failed => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Sampling {
    Sampled,
    Full,
}

/// Per-slice cache keys and TTLs around the [`AggregationFetcher`].
#[derive(Debug, Clone)]
pub struct CategoryCachePolicy {
    fetcher: AggregationFetcher,
    cache: CacheClient,
    settings: ListingSettings,
}

impl CategoryCachePolicy {
    pub fn new(fetcher: AggregationFetcher, cache: CacheClient, settings: ListingSettings) -> Self {
        Self {
            fetcher,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ListingSettings {
        &self.settings
    }

    pub async fn listing(
        &self,
        category: &CategoryDefinition,
        page: u32,
    ) -> Result<CategoryListing, CatalogError> {
        let page = page.max(1);
        let today = Utc::now().date_naive();

        let (top_rated, new_releases, popular) = tokio::join!(
            self.top_rated(category, today),
            self.new_releases(category, today),
            self.popular(category, page, today),
        );

        if top_rated.is_failed() && new_releases.is_failed() && popular.is_failed() {
            return Err(CatalogError::Unavailable(CATALOG_UNAVAILABLE.to_string()));
        }

        Ok(CategoryListing {
            top_rated: top_rated.into_cards(),
            new_releases: new_releases.into_cards(),
            popular: popular.into_cards(),
            page,
            total_pages: self.settings.total_pages,
        })
    }

    pub async fn top_rated(&self, category: &CategoryDefinition, today: NaiveDate) -> SliceOutcome {
        let key = CacheKeys::top_rated(&category.name);
        let pages: Vec<u32> = (1..=category.top_rated.pages).collect();
        self.slice(&key, category, &category.top_rated, &pages, today, Sampling::Sampled)
            .await
    }

    pub async fn new_releases(&self, category: &CategoryDefinition, today: NaiveDate) -> SliceOutcome {
        let key = CacheKeys::new_releases(&category.name);
        let pages: Vec<u32> = (1..=category.new_releases.pages).collect();
        self.slice(&key, category, &category.new_releases, &pages, today, Sampling::Sampled)
            .await
    }

    pub async fn popular(&self, category: &CategoryDefinition, page: u32, today: NaiveDate) -> SliceOutcome {
        let key = CacheKeys::popular_page(&category.name, page);
        self.slice(&key, category, &category.popular, &[page], today, Sampling::Full)
            .await
    }

    async fn slice(
        &self,
        key: &str,
        category: &CategoryDefinition,
        slice: &SliceQuery,
        pages: &[u32],
        today: NaiveDate,
        sampling: Sampling,
    ) -> SliceOutcome {
        if let Some(cards) = self.cache.get_json::<Vec<PosterCard>>(key).await {
            return SliceOutcome::Cached(cards);
        }

        match self.fetcher.fetch(category, slice, pages, today).await {
            Ok(items) => {
                let items = match sampling {
                    Sampling::Sampled => sample(items, self.settings.sample_size),
                    Sampling::Full => items,
                };
                let cards = self.fetcher.to_cards(category, &items);
                self.cache
                    .set_json(key, &cards, self.settings.listing_ttl)
                    .await;
                SliceOutcome::Fresh(cards)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "aggregation failed; caching empty slice");
                let empty: [PosterCard; 0] = [];
                if self
                    .cache
                    .set_json(key, &empty, self.settings.negative_ttl)
                    .await
                {
                    info!(key = %key, ttl = ?self.settings.negative_ttl, "negative cache entry written");
                }
                SliceOutcome::Failed
            }
        }
    }
}

/// Uniform random subset of at most `count` items.
fn sample(mut items: Vec<TaggedItem>, count: usize) -> Vec<TaggedItem> {
    items.shuffle(&mut rand::rng());
    items.truncate(count);
    items
}
