use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::CatalogError;

/// Kind of title as understood by TMDB and the stream sources.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Movie, MediaKind::Tv];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    /// Discover filter field carrying the release date for this kind.
    pub fn release_date_field(&self) -> &'static str {
        match self {
            MediaKind::Movie => "primary_release_date",
            MediaKind::Tv => "first_air_date",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            _ => Err(CatalogError::InvalidInput("Invalid media type".into())),
        }
    }
}

/// Opaque title identifier accepted by the stream resolver.
///
/// Restricted to ASCII letters, digits, `-` and `_` so it can be embedded in
/// cache keys and source URLs without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleId(String);

impl TitleId {
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(CatalogError::InvalidInput("Invalid ID format".into()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a numeric TMDB id from a path segment.
pub fn parse_tmdb_id(raw: &str) -> Result<u64, CatalogError> {
    raw.parse::<u64>()
        .map_err(|_| CatalogError::InvalidInput("Invalid ID format".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_ids_accept_slug_characters_only() {
        assert!(TitleId::parse("550").is_ok());
        assert!(TitleId::parse("tt0137523").is_ok());
        assert!(TitleId::parse("one-piece_2023").is_ok());

        for bad in ["", "550/../etc", "a b", "id?x=1", "ép"] {
            assert!(TitleId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn media_kind_round_trips_through_strings() {
        for kind in MediaKind::ALL {
            assert_eq!(kind.as_str().parse::<MediaKind>().unwrap(), kind);
        }
        assert!("anime".parse::<MediaKind>().is_err());
        assert!("Movie".parse::<MediaKind>().is_err());
    }

    #[test]
    fn tmdb_ids_must_be_numeric() {
        assert_eq!(parse_tmdb_id("1399").unwrap(), 1399);
        assert!(parse_tmdb_id("13a9").is_err());
    }
}
