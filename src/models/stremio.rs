//! Stremio addon protocol types (manifest and stream responses)

use serde::Serialize;
use std::collections::BTreeMap;

use super::SubtitleTrack;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestBehaviorHints {
    pub configurable: bool,
    pub configuration_required: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub logo: String,
    pub background: String,
    pub resources: Vec<String>,
    pub types: Vec<String>,
    pub catalogs: Vec<serde_json::Value>,
    pub id_prefixes: Vec<String>,
    pub behavior_hints: ManifestBehaviorHints,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProxyHeaders {
    pub request: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBehaviorHints {
    pub proxy_headers: ProxyHeaders,
    pub not_web_ready: bool,
}

/// One entry of a `/stream` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StremioStream {
    pub name: String,
    pub title: String,
    pub url: String,
    pub subtitles: Vec<SubtitleTrack>,
    pub behavior_hints: StreamBehaviorHints,
}

#[derive(Debug, Default, Serialize)]
pub struct StreamsResponse {
    pub streams: Vec<StremioStream>,
}

impl StreamsResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}
