use super::models::Config;

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Non-fatal checks on a composed configuration.
pub fn collect_warnings(config: &Config) -> ConfigWarnings {
    let mut warnings = ConfigWarnings::default();

    if config.redis.is_none() {
        warnings.push_with_hint(
            "REDIS_URL not configured; using the in-process memory cache",
            "Cached listings, stream sources and watchlists are lost on restart and not shared between instances",
        );
    }

    if config.tmdb.api_key.is_none() {
        warnings.push_with_hint(
            "TMDB_API_KEY not configured; catalog, detail and discovery requests will fail upstream",
            "Set TMDB_API_KEY or add api_key to the [tmdb] section",
        );
    }

    if config.catalog.negative_ttl >= config.catalog.listing_ttl {
        warnings.push(
            "catalog.negative_ttl is not shorter than catalog.listing_ttl; failed slices stay empty as long as good ones",
        );
    }

    if config.catalog.detail_retention < config.catalog.detail_freshness {
        warnings.push_with_hint(
            "catalog.detail_retention is shorter than catalog.detail_freshness",
            "Stale detail records expire before they can be served and refreshed",
        );
    }

    if config.resolver.probe_timeout > config.resolver.adapter_timeout {
        warnings.push("resolver.probe_timeout exceeds resolver.adapter_timeout");
    }

    if config.sources.allowed_domains.is_empty() {
        warnings.push_with_hint(
            "No source domain allowlist configured; every configured source host is accepted",
            "Set SOURCE_ALLOWED_DOMAINS or sources.allowed_domains",
        );
    }

    if config.cors.is_wildcard_included() {
        warnings.push("CORS allows any origin");
    }

    warnings
}
