//! Stream source adapters.
//!
//! A [`SourceRegistry`] holds an immutable, ordered catalog of
//! [`SourceAdapter`]s split into primary and fallback tiers per media kind.
//! Adapters are pure configuration: they know how to address a title and how
//! to judge a response, nothing else.

mod builtin;
mod transport;

pub use self::builtin::builtin_definitions;
pub use self::transport::{
    ReqwestStreamTransport, SourceResponse, SourceTarget, StreamTransport,
    TransportError,
};

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, sync::Arc};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::media::{MediaKind, TitleId};

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Fallback,
}

impl Tier {
    pub const ORDER: [Tier; 2] = [Tier::Primary, Tier::Fallback];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Primary => f.write_str("primary"),
            Tier::Fallback => f.write_str("fallback"),
        }
    }
}

/// Declarative description of one source, as written in configuration.
///
/// `path` is appended to `base_url` after substituting `{kind}` and `{id}`.
/// A source only serves the media kinds it names a tier for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub name: String,
    pub base_url: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tv: Option<Tier>,
}

impl SourceDefinition {
    pub fn tier_for(&self, kind: MediaKind) -> Option<Tier> {
        match kind {
            MediaKind::Movie => self.movie,
            MediaKind::Tv => self.tv,
        }
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("source name must not be empty")]
    EmptyName,
    #[error("duplicate source name '{0}'")]
    DuplicateName(String),
    #[error("source '{name}' has an invalid base URL '{base_url}'")]
    InvalidBaseUrl { name: String, base_url: String },
    #[error("source '{name}' path must reference {{id}}")]
    MissingIdPlaceholder { name: String },
    #[error("source '{name}' host '{host}' is not in the allowed domain list")]
    DisallowedDomain { name: String, host: String },
}

/// Whether `host` equals an allowed domain or is a subdomain of one. An
/// empty allowlist admits everything.
pub fn host_allowed(host: &str, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return true;
    }
    let host = host.to_ascii_lowercase();
    allowed_domains.iter().any(|domain| {
        let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    })
}

/// One upstream stream source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAdapter {
    name: String,
    base_url: String,
    path: String,
}

impl SourceAdapter {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path: path.into().trim_start_matches('/').to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("User-Agent".to_string(), BROWSER_USER_AGENT.to_string()),
            ("Referer".to_string(), self.base_url.clone()),
        ]
    }

    /// Request for `id` of the given kind.
    pub fn build_request(&self, kind: MediaKind, id: &TitleId) -> SourceTarget {
        let path = self
            .path
            .replace("{kind}", kind.as_str())
            .replace("{id}", id.as_str());
        self.target_for_url(format!("{}/{}", self.base_url, path))
    }

    /// Request for a URL previously produced by this adapter.
    pub fn target_for_url(&self, url: impl Into<String>) -> SourceTarget {
        SourceTarget {
            url: url.into(),
            headers: self.headers(),
        }
    }

    /// Judges a raw response. Anything but a 2xx with a non-empty body is a
    /// failure; an unexpected content type is only noted.
    pub fn classify(&self, response: &SourceResponse) -> Result<(), TransportError> {
        if !(200..300).contains(&response.status) {
            return Err(TransportError::Status(response.status));
        }
        if response.body.trim().is_empty() {
            return Err(TransportError::Rejected("empty body".into()));
        }
        if let Some(content_type) = response.content_type.as_deref()
            && !content_type.contains("html")
        {
            debug!(
                source = %self.name,
                content_type = %content_type,
                "source answered with non-HTML content"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct TierSet {
    primary: Vec<Arc<SourceAdapter>>,
    fallback: Vec<Arc<SourceAdapter>>,
}

impl TierSet {
    fn tier(&self, tier: Tier) -> &[Arc<SourceAdapter>] {
        match tier {
            Tier::Primary => &self.primary,
            Tier::Fallback => &self.fallback,
        }
    }

    fn push(&mut self, tier: Tier, adapter: Arc<SourceAdapter>) {
        match tier {
            Tier::Primary => self.primary.push(adapter),
            Tier::Fallback => self.fallback.push(adapter),
        }
    }
}

/// Process-wide, immutable catalog of stream sources.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    movie: TierSet,
    tv: TierSet,
}

impl SourceRegistry {
    /// Registry over the built-in source catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for definition in builtin_definitions() {
            registry.insert(&definition);
        }
        registry
    }

    /// Builds a registry from definitions in declaration order, rejecting
    /// malformed entries and hosts outside `allowed_domains`.
    pub fn from_definitions(
        definitions: &[SourceDefinition],
        allowed_domains: &[String],
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut registry = Self::default();

        for definition in definitions {
            let name = definition.name.trim();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if !seen.insert(name.to_string()) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }

            let host = Url::parse(&definition.base_url)
                .ok()
                .filter(|url| matches!(url.scheme(), "http" | "https"))
                .and_then(|_| definition.host())
                .ok_or_else(|| RegistryError::InvalidBaseUrl {
                    name: name.to_string(),
                    base_url: definition.base_url.clone(),
                })?;

            if !definition.path.contains("{id}") {
                return Err(RegistryError::MissingIdPlaceholder {
                    name: name.to_string(),
                });
            }

            if !host_allowed(&host, allowed_domains) {
                return Err(RegistryError::DisallowedDomain {
                    name: name.to_string(),
                    host,
                });
            }

            registry.insert(definition);
        }

        Ok(registry)
    }

    fn insert(&mut self, definition: &SourceDefinition) {
        let adapter = Arc::new(SourceAdapter::new(
            definition.name.trim(),
            definition.base_url.clone(),
            definition.path.clone(),
        ));
        for kind in MediaKind::ALL {
            if let Some(tier) = definition.tier_for(kind) {
                self.kind_mut(kind).push(tier, Arc::clone(&adapter));
            }
        }
    }

    fn kind(&self, kind: MediaKind) -> &TierSet {
        match kind {
            MediaKind::Movie => &self.movie,
            MediaKind::Tv => &self.tv,
        }
    }

    fn kind_mut(&mut self, kind: MediaKind) -> &mut TierSet {
        match kind {
            MediaKind::Movie => &mut self.movie,
            MediaKind::Tv => &mut self.tv,
        }
    }

    pub fn adapters_for(&self, kind: MediaKind, tier: Tier) -> &[Arc<SourceAdapter>] {
        self.kind(kind).tier(tier)
    }

    /// Looks up an adapter serving `kind` by name, in either tier.
    pub fn find(&self, kind: MediaKind, name: &str) -> Option<Arc<SourceAdapter>> {
        Tier::ORDER
            .iter()
            .flat_map(|tier| self.adapters_for(kind, *tier))
            .find(|adapter| adapter.name() == name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(adapters: &[Arc<SourceAdapter>]) -> Vec<&str> {
        adapters.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn builtin_catalog_tiers() {
        let registry = SourceRegistry::builtin();

        assert_eq!(
            names(registry.adapters_for(MediaKind::Movie, Tier::Primary)),
            ["sonix", "vidsrc"]
        );
        assert_eq!(
            names(registry.adapters_for(MediaKind::Movie, Tier::Fallback)),
            ["goojara", "flixhq"]
        );
        assert_eq!(
            names(registry.adapters_for(MediaKind::Tv, Tier::Primary)),
            ["sonix", "asiaflix"]
        );
        assert_eq!(
            names(registry.adapters_for(MediaKind::Tv, Tier::Fallback)),
            ["dramacool", "zoro"]
        );
    }

    #[test]
    fn requests_substitute_kind_and_id() {
        let registry = SourceRegistry::builtin();
        let id = TitleId::parse("550").unwrap();

        let vidsrc = registry.find(MediaKind::Movie, "vidsrc").unwrap();
        let target = vidsrc.build_request(MediaKind::Movie, &id);
        assert_eq!(target.url, "https://vidsrc.to/embed/movie/550");
        assert!(
            target
                .headers
                .contains(&("Referer".to_string(), "https://vidsrc.to".to_string()))
        );

        let zoro = registry.find(MediaKind::Tv, "zoro").unwrap();
        assert_eq!(
            zoro.build_request(MediaKind::Tv, &id).url,
            "https://zoro.to/embed/550"
        );
        assert!(registry.find(MediaKind::Movie, "zoro").is_none());
    }

    #[test]
    fn classifier_requires_success_and_body() {
        let adapter = SourceAdapter::new("x", "https://x.example", "embed/{id}");
        let ok = SourceResponse {
            status: 200,
            content_type: Some("text/html".into()),
            body: "<html></html>".into(),
        };
        assert!(adapter.classify(&ok).is_ok());

        let not_found = SourceResponse {
            status: 404,
            ..ok.clone()
        };
        assert!(matches!(
            adapter.classify(&not_found),
            Err(TransportError::Status(404))
        ));

        let empty = SourceResponse {
            body: "  ".into(),
            ..ok.clone()
        };
        assert!(adapter.classify(&empty).is_err());

        let json = SourceResponse {
            content_type: Some("application/json".into()),
            body: "{}".into(),
            ..ok
        };
        assert!(adapter.classify(&json).is_ok());
    }

    #[test]
    fn definitions_are_validated_against_allowlist() {
        let defs = vec![SourceDefinition {
            name: "mirror".into(),
            base_url: "https://mirror.vidsrc.to".into(),
            path: "embed/{kind}/{id}".into(),
            movie: Some(Tier::Primary),
            tv: None,
        }];

        let allowed = vec!["vidsrc.to".to_string()];
        let registry = SourceRegistry::from_definitions(&defs, &allowed).unwrap();
        assert_eq!(registry.adapters_for(MediaKind::Movie, Tier::Primary).len(), 1);
        assert!(registry.adapters_for(MediaKind::Tv, Tier::Primary).is_empty());

        let blocked = vec!["example.org".to_string()];
        assert_eq!(
            SourceRegistry::from_definitions(&defs, &blocked).unwrap_err(),
            RegistryError::DisallowedDomain {
                name: "mirror".into(),
                host: "mirror.vidsrc.to".into()
            }
        );
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        let good = SourceDefinition {
            name: "a".into(),
            base_url: "https://a.example".into(),
            path: "{id}".into(),
            movie: Some(Tier::Primary),
            tv: None,
        };

        let duplicate = vec![good.clone(), good.clone()];
        assert!(matches!(
            SourceRegistry::from_definitions(&duplicate, &[]),
            Err(RegistryError::DuplicateName(_))
        ));

        let bad_url = vec![SourceDefinition {
            base_url: "ftp://a.example".into(),
            ..good.clone()
        }];
        assert!(matches!(
            SourceRegistry::from_definitions(&bad_url, &[]),
            Err(RegistryError::InvalidBaseUrl { .. })
        ));

        let no_id = vec![SourceDefinition {
            path: "embed".into(),
            ..good
        }];
        assert!(matches!(
            SourceRegistry::from_definitions(&no_id, &[]),
            Err(RegistryError::MissingIdPlaceholder { .. })
        ));
    }

    #[test]
    fn allowlist_matches_exact_hosts_and_subdomains() {
        let allowed = vec!["vidsrc.to".to_string()];
        assert!(host_allowed("vidsrc.to", &allowed));
        assert!(host_allowed("cdn.vidsrc.to", &allowed));
        assert!(!host_allowed("evilvidsrc.to", &allowed));
        assert!(host_allowed("anything.example", &[]));
    }
}
