use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Media type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

/// Normalized metadata for one external id
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub kind: MediaKind,
    /// Localized title when one was found, else the provider's title
    pub display_title: String,
    pub original_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Provider-internal id (TMDB id of the movie or the series)
    pub external_series_id: u64,
}

/// Episode details, used to enrich the display title
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeInfo {
    pub season_number: u32,
    pub episode_number: u32,
    pub episode_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_date: Option<NaiveDate>,
}

/// Parsed inbound content id: `tt<digits>` or `tt<digits>:<season>:<episode>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub imdb_id: String,
    /// Present only when both season and episode parse as positive integers
    pub episode: Option<(u32, u32)>,
}

impl StreamRequest {
    /// Parse a player-supplied id. Returns `None` for ids this addon does not serve.
    pub fn parse(id: &str) -> Option<Self> {
        let mut parts = id.split(':');
        let imdb_id = parts.next()?;

        let digits = imdb_id.strip_prefix("tt")?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let season = parts.next().and_then(parse_positive);
        let episode = parts.next().and_then(parse_positive);

        Some(Self {
            imdb_id: imdb_id.to_string(),
            episode: season.zip(episode),
        })
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}
