//! # Marquee Server
//!
//! Axum surface over [`marquee_core`]: stream resolution, category
//! listings, title details, discovery and the offline watchlist sink.
//!
//! The binary in `main.rs` loads configuration, wires the services through
//! [`infra::startup`] and serves [`routes::create_api_router`]. Integration
//! tests build the same router over an in-memory cache and fake upstreams.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
