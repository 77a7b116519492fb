use serde::{Deserialize, Serialize};

/// Feed-level metadata, replaced wholesale on every successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastChannel {
    pub title: String,
    pub description: String,
    pub image: String,
    pub language: String,
    pub link: String,
    pub last_build_date: String,
    pub copyright: String,
    pub author: String,
}

/// Episode kind from `itunes:episodeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeType {
    #[default]
    Full,
    Trailer,
    Bonus,
}

impl EpisodeType {
    /// Maps a feed value onto the three known tags.
    ///
    /// Returns `None` for anything else so the caller decides how to coerce it.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "trailer" => Some(Self::Trailer),
            "bonus" => Some(Self::Bonus),
            _ => None,
        }
    }
}

/// A single normalized episode as served to the UI.
///
/// Optional fields are omitted from the JSON when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastEpisode {
    /// Feed GUID, or a date+title slug when the feed has none.
    pub id: String,
    pub title: String,
    pub description: String,
    pub pub_date: String,
    pub duration: String,
    /// Direct audio URL (redirector prefix already stripped).
    pub audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<i64>,
    pub episode_type: EpisodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// HTML fragment: `content:encoded`, falling back to the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_notes: Option<String>,
}

/// Channel plus episodes sorted newest first. This is the cached unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastData {
    pub channel: PodcastChannel,
    pub episodes: Vec<PodcastEpisode>,
}
