use marquee_core::{
    cache::DEFAULT_OPERATION_TIMEOUT,
    sources::{RegistryError, builtin_definitions},
    tmdb::{TMDB_IMAGE_BASE, TMDB_V3_BASE},
};
use once_cell::sync::Lazy;
use std::{fs, path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::{
    models::{
        CacheConfig, CatalogConfig, Config, ConfigMetadata, CorsConfig,
        RedisConfig, ResolverConfig, ServerConfig, SourcesConfig, TmdbConfig,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("marquee.toml"),
        PathBuf::from("config/marquee.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env_config = EnvConfig::gather();

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = compose_config(
            file_config,
            env_config,
            config_path,
            env_file_loaded,
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        }

        if source.is_empty() {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        debug!(path = %path.display(), ?provenance, "reading configuration file");

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No marquee.toml detected; using environment variables and defaults",
            "Create marquee.toml or point MARQUEE_CONFIG_PATH at one",
        );
    }

    let FileConfig {
        server: file_server,
        redis: file_redis,
        cache: file_cache,
        tmdb: file_tmdb,
        resolver: file_resolver,
        catalog: file_catalog,
        sources: file_sources,
        cors: file_cors,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(3000),
    };

    let redis = env
        .redis_url
        .or_else(|| file_redis.map(|r| r.url))
        .filter(|url| !url.trim().is_empty())
        .map(|url| {
            parse_url("redis.url", &url)?;
            Ok::<_, ConfigLoadError>(RedisConfig { url })
        })
        .transpose()?;

    let cache = CacheConfig {
        operation_timeout: parse_duration(
            "cache.operation_timeout",
            file_cache.operation_timeout,
            DEFAULT_OPERATION_TIMEOUT,
        )?,
    };

    let tmdb_base_url = env
        .tmdb_base_url
        .or(file_tmdb.base_url)
        .unwrap_or_else(|| TMDB_V3_BASE.to_string());
    parse_url("tmdb.base_url", &tmdb_base_url)?;
    let image_base = file_tmdb
        .image_base
        .unwrap_or_else(|| TMDB_IMAGE_BASE.to_string());
    parse_url("tmdb.image_base", &image_base)?;

    let tmdb = TmdbConfig {
        api_key: env
            .tmdb_api_key
            .or(file_tmdb.api_key)
            .filter(|key| !key.trim().is_empty()),
        base_url: tmdb_base_url,
        image_base,
        language: file_tmdb.language.unwrap_or_else(|| "en-US".to_string()),
        request_timeout: parse_duration(
            "tmdb.request_timeout",
            file_tmdb.request_timeout,
            Duration::from_secs(10),
        )?,
    };

    let resolver = ResolverConfig {
        adapter_timeout: parse_duration(
            "resolver.adapter_timeout",
            file_resolver.adapter_timeout,
            Duration::from_secs(8),
        )?,
        probe_timeout: parse_duration(
            "resolver.probe_timeout",
            file_resolver.probe_timeout,
            Duration::from_secs(3),
        )?,
        stream_ttl: parse_duration(
            "resolver.stream_ttl",
            file_resolver.stream_ttl,
            Duration::from_secs(30 * 60),
        )?,
    };

    let catalog = CatalogConfig {
        listing_ttl: parse_duration(
            "catalog.listing_ttl",
            file_catalog.listing_ttl,
            Duration::from_secs(60 * 60),
        )?,
        negative_ttl: parse_duration(
            "catalog.negative_ttl",
            file_catalog.negative_ttl,
            Duration::from_secs(5 * 60),
        )?,
        sample_size: file_catalog.sample_size.unwrap_or(12),
        total_pages: file_catalog.total_pages.unwrap_or(1000),
        detail_freshness: parse_duration(
            "catalog.detail_freshness",
            file_catalog.detail_freshness,
            Duration::from_secs(2 * 60 * 60),
        )?,
        detail_retention: parse_duration(
            "catalog.detail_retention",
            file_catalog.detail_retention,
            Duration::from_secs(24 * 60 * 60),
        )?,
        hero_ttl: parse_duration(
            "catalog.hero_ttl",
            file_catalog.hero_ttl,
            Duration::from_secs(30 * 60),
        )?,
        hero_count: file_catalog.hero_count.unwrap_or(10),
        search_ttl: parse_duration(
            "catalog.search_ttl",
            file_catalog.search_ttl,
            Duration::from_secs(60 * 60),
        )?,
    };

    let from_file = file_sources.adapters.is_some();
    let sources = SourcesConfig {
        definitions: file_sources.adapters.unwrap_or_else(builtin_definitions),
        allowed_domains: env
            .source_allowed_domains
            .or(file_sources.allowed_domains)
            .unwrap_or_default(),
        from_file,
    };
    // Reject a malformed source catalog at startup rather than per request.
    sources.registry()?;

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .or(file_cors.allowed_origins)
            .unwrap_or_default(),
    };

    let metadata = ConfigMetadata {
        config_path,
        env_file_loaded,
    };

    let config = Config {
        server,
        redis,
        cache,
        tmdb,
        resolver,
        catalog,
        sources,
        cors,
        metadata,
    };

    warnings.extend(validation::collect_warnings(&config));

    Ok((config, warnings))
}

fn parse_duration(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(value) => humantime::parse_duration(value.trim()).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                field,
                value,
                source,
            }
        }),
        None => Ok(default),
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigLoadError> {
    Url::parse(raw.trim()).map_err(|source| ConfigLoadError::InvalidUrl {
        field,
        value: raw.to_string(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid URL '{value}' for {field}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid stream source configuration: {0}")]
    InvalidSource(#[from] RegistryError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn is_empty(&self) -> bool {
        self.explicit.is_none() && self.env.is_none() && self.default.is_none()
    }

    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}
