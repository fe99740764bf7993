use marquee_core::{
    catalog::ListingSettings,
    detail::DetailSettings,
    discovery::DiscoverySettings,
    resolver::ResolverSettings,
    sources::{RegistryError, SourceDefinition, SourceRegistry},
};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: Option<RedisConfig>,
    pub cache: CacheConfig,
    pub tmdb: TmdbConfig,
    pub resolver: ResolverConfig,
    pub catalog: CatalogConfig,
    pub sources: SourcesConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub operation_timeout: Duration,
}

#[derive(Clone)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_base: String,
    pub language: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("image_base", &self.image_base)
            .field("language", &self.language)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub adapter_timeout: Duration,
    pub probe_timeout: Duration,
    pub stream_ttl: Duration,
}

impl ResolverConfig {
    pub fn settings(&self) -> ResolverSettings {
        ResolverSettings {
            adapter_timeout: self.adapter_timeout,
            probe_timeout: self.probe_timeout,
            stream_ttl: self.stream_ttl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub listing_ttl: Duration,
    pub negative_ttl: Duration,
    pub sample_size: usize,
    pub total_pages: u32,
    pub detail_freshness: Duration,
    pub detail_retention: Duration,
    pub hero_ttl: Duration,
    pub hero_count: usize,
    pub search_ttl: Duration,
}

impl CatalogConfig {
    pub fn listing_settings(&self) -> ListingSettings {
        ListingSettings {
            listing_ttl: self.listing_ttl,
            negative_ttl: self.negative_ttl,
            sample_size: self.sample_size,
            total_pages: self.total_pages,
        }
    }

    pub fn detail_settings(&self) -> DetailSettings {
        DetailSettings {
            freshness: self.detail_freshness,
            retention: self.detail_retention,
        }
    }

    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            hero_ttl: self.hero_ttl,
            hero_count: self.hero_count,
            search_ttl: self.search_ttl,
            ..DiscoverySettings::default()
        }
    }
}

/// Stream source catalog: either the built-in list or the one from the
/// configuration file.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub definitions: Vec<SourceDefinition>,
    pub allowed_domains: Vec<String>,
    pub from_file: bool,
}

impl SourcesConfig {
    pub fn registry(&self) -> Result<SourceRegistry, RegistryError> {
        SourceRegistry::from_definitions(&self.definitions, &self.allowed_domains)
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// An empty list is treated as "any origin".
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|origin| origin.trim() == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
