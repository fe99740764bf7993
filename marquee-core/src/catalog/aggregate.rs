use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::{
    card::PosterCard,
    category::{CategoryDefinition, Partition, SliceQuery},
};
use crate::{
    media::MediaKind,
    tmdb::{ContentItem, DiscoverQuery, ProviderError, SortCriterion, TmdbClient},
};

/// An upstream item tagged with the sub-query that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedItem {
    pub item: ContentItem,
    pub kind: MediaKind,
    pub partition: Partition,
}

/// One discover call in an aggregation fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub partition: Partition,
    pub kind: MediaKind,
    pub query: DiscoverQuery,
}

/// Fans a slice out over a category's partitions and kinds and merges the
/// results.
#[derive(Debug, Clone)]
pub struct AggregationFetcher {
    tmdb: TmdbClient,
    image_base: String,
}

impl AggregationFetcher {
    pub fn new(tmdb: TmdbClient, image_base: impl Into<String>) -> Self {
        Self {
            tmdb,
            image_base: image_base.into(),
        }
    }

    pub fn image_base(&self) -> &str {
        &self.image_base
    }

    /// Sub-queries in traversal order: partition, then kind, then page.
    pub fn plan(
        category: &CategoryDefinition,
        slice: &SliceQuery,
        pages: &[u32],
        today: NaiveDate,
    ) -> Vec<SubQuery> {
        let released_after = slice.recency.and_then(|r| r.lower_bound(today));
        let released_before = (slice.sort == SortCriterion::ReleaseDate).then_some(today);

        let mut plan = Vec::with_capacity(category.partitions.len() * category.kinds.len());
        for partition in &category.partitions {
            for &kind in &category.kinds {
                for &page in pages {
                    plan.push(SubQuery {
                        partition: partition.clone(),
                        kind,
                        query: DiscoverQuery {
                            sort: slice.sort,
                            page,
                            origin_country: partition.origin_country(),
                            min_votes: slice.min_votes,
                            released_after,
                            released_before,
                            with_genres: Vec::new(),
                            without_genres: category.excluded_genres.clone(),
                        },
                    });
                }
            }
        }
        plan
    }

    /// Runs every sub-query concurrently and waits for all of them. Any
    /// failure fails the call; otherwise the merged items are stripped of
    /// entries without artwork and then deduplicated.
    pub async fn fetch(
        &self,
        category: &CategoryDefinition,
        slice: &SliceQuery,
        pages: &[u32],
        today: NaiveDate,
    ) -> Result<Vec<TaggedItem>, ProviderError> {
        let plan = Self::plan(category, slice, pages, today);
        let calls = plan
            .iter()
            .map(|sub| self.tmdb.discover(sub.kind, &sub.query));
        let settled = join_all(calls).await;

        let mut merged = Vec::new();
        let mut first_error = None;
        for (sub, result) in plan.into_iter().zip(settled) {
            match result {
                Ok(page) => merged.extend(page.results.into_iter().map(|item| TaggedItem {
                    item,
                    kind: sub.kind,
                    partition: sub.partition.clone(),
                })),
                Err(err) => {
                    warn!(
                        category = %category.name,
                        partition = %sub.partition,
                        kind = %sub.kind,
                        page = sub.query.page,
                        error = %err,
                        "discover sub-query failed"
                    );
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let raw = merged.len();
        // Imageless copies must not claim an identity before a renderable one.
        merged.retain(|tagged| category.image.path(&tagged.item).is_some());
        let items = dedupe(merged, category.mixes_kinds());
        debug!(
            category = %category.name,
            raw,
            kept = items.len(),
            "aggregated discover results"
        );
        Ok(items)
    }

    pub fn to_cards(&self, category: &CategoryDefinition, items: &[TaggedItem]) -> Vec<PosterCard> {
        items
            .iter()
            .filter_map(|tagged| {
                category
                    .image
                    .url(&self.image_base, &tagged.item)
                    .map(|image| PosterCard::new(&tagged.item, tagged.kind, image))
            })
            .collect()
    }
}

/// Keeps the first occurrence of each identity: `(id, kind)` when the
/// listing mixes kinds, otherwise `id` alone.
pub fn dedupe(items: Vec<TaggedItem>, mixed_kinds: bool) -> Vec<TaggedItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|tagged| {
            let kind = mixed_kinds.then_some(tagged.kind);
            seen.insert((tagged.item.id, kind))
        })
        .collect()
}
