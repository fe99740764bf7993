//! Category listings: parallel discover fan-out, merged into poster cards
//! and cached per slice.

pub mod aggregate;
pub mod card;
pub mod category;
pub mod listing;

pub use aggregate::{AggregationFetcher, TaggedItem, dedupe};
pub use card::PosterCard;
pub use category::{
    CategoryCatalog, CategoryDefinition, ImageField, ImageStyle, Partition, Recency, SliceQuery,
    builtin_categories,
};
pub use listing::{
    CATALOG_UNAVAILABLE, CategoryCachePolicy, CategoryListing, ListingSettings, SliceOutcome,
};
