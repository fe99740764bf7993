//! Configuration for the Marquee server.
//!
//! Values are resolved from, in order of precedence: environment variables
//! (after loading an optional `.env`), a TOML file, then built-in defaults.
//! Command-line overrides are applied by the binary on top of the result.

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    CacheConfig, CatalogConfig, Config, ConfigMetadata, CorsConfig, RedisConfig,
    ResolverConfig, ServerConfig, SourcesConfig, TmdbConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
