//! Metadata resolver backed by the TMDB API
//!
//! Maps an IMDB id to a normalized [`MediaInfo`], preferring a localized
//! title, and looks up episode details for series requests.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::TmdbConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{EpisodeInfo, MediaInfo, MediaKind};
use crate::services::http::send_text;

lazy_static! {
    /// Letters that only show up in Hungarian titles
    static ref LOCALIZED_CHARS: Regex = Regex::new(r"(?i)[áéíóöőúüű]").unwrap();
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    movie_results: Vec<FoundMovie>,
    #[serde(default)]
    tv_results: Vec<FoundSeries>,
    #[serde(default)]
    tv_episode_results: Vec<FoundEpisode>,
}

#[derive(Debug, Deserialize)]
struct FoundMovie {
    id: u64,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FoundSeries {
    id: u64,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FoundEpisode {
    show_id: u64,
}

/// Localized details; movies use title/original_title, series name/original_name
#[derive(Debug, Deserialize)]
struct LocalizedDetails {
    #[serde(alias = "name")]
    title: Option<String>,
    #[serde(alias = "original_name")]
    original_title: Option<String>,
    #[serde(alias = "first_air_date")]
    release_date: Option<String>,
}

/// Movies list alternatives under `titles`, series under `results`
#[derive(Debug, Deserialize)]
struct AlternativeTitles {
    #[serde(default, alias = "results")]
    titles: Vec<AlternativeTitle>,
}

#[derive(Debug, Deserialize)]
struct AlternativeTitle {
    #[serde(default)]
    iso_3166_1: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct EpisodeResponse {
    name: Option<String>,
    episode_number: u32,
    season_number: u32,
    air_date: Option<String>,
}

/// Year of a `YYYY-MM-DD` date, `None` for empty or malformed dates
fn extract_year(date: Option<&str>) -> Option<i32> {
    date.and_then(parse_date).map(|d| d.year())
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

// ============================================================================
// Client
// ============================================================================

pub struct TmdbClient {
    http: Client,
    config: TmdbConfig,
}

impl TmdbClient {
    pub fn new(http: Client, config: TmdbConfig) -> Self {
        Self { http, config }
    }

    /// Build an endpoint URL; the API key rides along on every call
    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> PipelineResult<Url> {
        let raw = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw)
            .map_err(|e| PipelineError::Format(format!("bad TMDB URL {}: {}", raw, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.config.api_key);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> PipelineResult<T> {
        let url = self.endpoint(path, params)?;
        debug!(path, "TMDB request");

        let text = send_text(self.http.get(url).header("Accept", "application/json")).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolve an IMDB id. Any failure is logged and reported as not-found.
    pub async fn resolve(&self, imdb_id: &str) -> Option<MediaInfo> {
        match self.try_resolve(imdb_id).await {
            Ok(info) => {
                info!(
                    imdb_id,
                    title = %info.display_title,
                    year = ?info.year,
                    kind = %info.kind,
                    "TMDB metadata resolved"
                );
                Some(info)
            }
            Err(e) => {
                warn!(imdb_id, error = %e, "TMDB lookup failed");
                None
            }
        }
    }

    /// Movie match first, then series, then an orphaned episode's parent series
    async fn try_resolve(&self, imdb_id: &str) -> PipelineResult<MediaInfo> {
        let found: FindResponse = self
            .get(&format!("/find/{}", imdb_id), &[("external_source", "imdb_id")])
            .await?;

        if let Some(movie) = found.movie_results.into_iter().next() {
            debug!(tmdb_id = movie.id, "found movie");
            let localized = self.localized_title(MediaKind::Movie, movie.id).await;

            return Ok(MediaInfo {
                kind: MediaKind::Movie,
                original_title: movie.original_title.unwrap_or_else(|| movie.title.clone()),
                display_title: localized.unwrap_or(movie.title),
                year: extract_year(movie.release_date.as_deref()),
                external_series_id: movie.id,
            });
        }

        if let Some(series) = found.tv_results.into_iter().next() {
            debug!(tmdb_id = series.id, "found series");
            let localized = self.localized_title(MediaKind::Series, series.id).await;

            return Ok(MediaInfo {
                kind: MediaKind::Series,
                original_title: series.original_name.unwrap_or_else(|| series.name.clone()),
                display_title: localized.unwrap_or(series.name),
                year: extract_year(series.first_air_date.as_deref()),
                external_series_id: series.id,
            });
        }

        if let Some(episode) = found.tv_episode_results.into_iter().next() {
            let series_id = episode.show_id;
            debug!(tmdb_id = series_id, "found episode, loading parent series");

            let details: LocalizedDetails = self
                .get(
                    &format!("/tv/{}", series_id),
                    &[("language", self.config.language.as_str())],
                )
                .await?;
            let name = details
                .title
                .clone()
                .ok_or_else(|| PipelineError::Format("series without a name".to_string()))?;
            let localized = self.localized_title(MediaKind::Series, series_id).await;

            return Ok(MediaInfo {
                kind: MediaKind::Series,
                original_title: details.original_title.unwrap_or_else(|| name.clone()),
                display_title: localized.unwrap_or(name),
                year: extract_year(details.release_date.as_deref()),
                external_series_id: series_id,
            });
        }

        Err(PipelineError::NotFound(format!(
            "No results found for IMDB ID: {}",
            imdb_id
        )))
    }

    /// Best-effort localized title; failures are logged and swallowed
    async fn localized_title(&self, kind: MediaKind, tmdb_id: u64) -> Option<String> {
        match self.try_localized_title(kind, tmdb_id).await {
            Ok(title) => title,
            Err(e) => {
                warn!(tmdb_id, error = %e, "localized title lookup failed");
                None
            }
        }
    }

    async fn try_localized_title(&self, kind: MediaKind, tmdb_id: u64) -> PipelineResult<Option<String>> {
        let base = match kind {
            MediaKind::Movie => format!("/movie/{}", tmdb_id),
            MediaKind::Series => format!("/tv/{}", tmdb_id),
        };

        // A failed details call only means no localized field; alternatives still apply
        match self
            .get::<LocalizedDetails>(&base, &[("language", self.config.language.as_str())])
            .await
        {
            Ok(details) => {
                if let Some(title) = details.title.filter(|t| !t.is_empty()) {
                    if details.original_title.as_deref() != Some(title.as_str()) {
                        debug!(title = %title, "found localized title");
                        return Ok(Some(title));
                    }
                }
            }
            Err(e) => debug!(tmdb_id, error = %e, "localized details unavailable"),
        }

        let alternatives: AlternativeTitles = self
            .get(&format!("{}/alternative_titles", base), &[])
            .await?;
        let region = self.config.region.as_str();
        let localized = alternatives
            .titles
            .into_iter()
            .filter(|alt| !alt.title.trim().is_empty())
            .find(|alt| alt.iso_3166_1 == region || LOCALIZED_CHARS.is_match(&alt.title))
            .map(|alt| alt.title);

        if let Some(ref title) = localized {
            debug!(title = %title, "found localized alternative title");
        }
        Ok(localized)
    }

    /// Episode details; any transport or status error yields `None`
    pub async fn resolve_episode(&self, series_id: u64, season: u32, episode: u32) -> Option<EpisodeInfo> {
        let path = format!("/tv/{}/season/{}/episode/{}", series_id, season, episode);

        match self.get::<EpisodeResponse>(&path, &[]).await {
            Ok(ep) => Some(EpisodeInfo {
                season_number: ep.season_number,
                episode_number: ep.episode_number,
                episode_title: ep.name.unwrap_or_default(),
                air_date: ep.air_date.as_deref().and_then(parse_date),
            }),
            Err(e) => {
                warn!(series_id, season, episode, error = %e, "TMDB episode lookup failed");
                None
            }
        }
    }
}
