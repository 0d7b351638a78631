use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single podcast episode as served by the catalog.
///
/// Immutable once fetched; only `details` is late-populated, by
/// `get_show_with_details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    /// Catalog identifier (a GUID string)
    pub id: String,
    /// Sequence number, unique across the catalog. Used for ordering,
    /// pagination and cache keys.
    pub show_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<DateTime<Utc>>,
    /// URL of the episode audio; episodes without audio cannot be played
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp3_url: Option<String>,
    /// Detail payload, populated on demand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ShowDetails>,
}

impl Show {
    /// Episode description with HTML entities decoded, for display
    pub fn clean_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(|d| html_escape::decode_html_entities(d).trim().to_string())
    }

    /// Whether this episode carries a playable audio URL
    pub fn has_audio(&self) -> bool {
        self.mp3_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Detail payload of a show, only present after an explicit details fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowDetails {
    #[serde(default)]
    pub guests: Vec<Guest>,
    #[serde(default)]
    pub links: Vec<ShowLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowLink {
    pub title: String,
    pub url: String,
}
