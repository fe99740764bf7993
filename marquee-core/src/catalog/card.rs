use serde::{Deserialize, Serialize};

use crate::{media::MediaKind, tmdb::ContentItem};

/// A listing entry as rendered by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterCard {
    pub id: u64,
    pub title: String,
    pub image: String,
    pub year: Option<String>,
    pub rating: Option<String>,
    pub media_type: MediaKind,
}

impl PosterCard {
    /// Maps an upstream item. Callers only pass items with a resolved image.
    pub fn new(item: &ContentItem, kind: MediaKind, image: String) -> Self {
        Self {
            id: item.id,
            title: item.display_title().to_string(),
            image,
            year: item.year(),
            rating: item.rating(),
            media_type: kind,
        }
    }
}
