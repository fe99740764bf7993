//! # Marquee Core
//!
//! Core library for the Marquee catalog service: resolving playable stream
//! sources and aggregating TMDB metadata behind a shared cache.
//!
//! ## Overview
//!
//! - **Stream resolution**: races independent source adapters in tiers and
//!   remembers the winner, revalidating it before reuse
//! - **Category listings**: parallel discover queries across origin
//!   countries and media kinds, merged, deduplicated and sampled
//! - **Detail records**: stale-while-revalidate title bundles assembled from
//!   one mandatory lookup plus best-effort facets
//! - **Discovery**: hero banner, search and trending listings
//!
//! ## Architecture
//!
//! - [`cache`]: key/value store seam with Redis and in-memory backends
//! - [`sources`]: source adapter registry and stream transport
//! - [`resolver`]: tiered racing stream resolver
//! - [`tmdb`]: TMDB transport and typed client
//! - [`catalog`]: aggregation fetcher and category cache policy
//! - [`detail`]: detail record, season and episode caches
//! - [`discovery`]: hero, search and trending
//! - [`watchlist`]: offline watchlist sink

pub mod cache;
pub mod catalog;
pub mod detail;
pub mod discovery;
pub mod error;
pub mod media;
pub mod resolver;
pub mod sources;
pub mod tmdb;
pub mod watchlist;

pub use error::{CatalogError, Result};
pub use media::{MediaKind, TitleId};
