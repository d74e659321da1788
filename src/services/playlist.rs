//! HLS master playlist expansion
//!
//! Turns a master playlist URL into concrete variant streams, labelled by
//! resolution or bandwidth, in playlist order.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::{Host, Url};

use crate::models::{ContainerKind, StreamVariant};
use crate::services::http::send_text;

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";
/// Label for an unexpanded master playlist
pub const AUTO_QUALITY: &str = "auto";
/// Session query parameter carried from master to variants
const SESSION_PARAM: &str = "v";

lazy_static! {
    /// Attribute list entries: KEY=value or KEY="quoted value"
    static ref ATTR_REGEX: Regex = Regex::new(r#"([A-Z0-9-]+)=("[^"]*"|[^,]*)"#).unwrap();
    static ref RESOLUTION_REGEX: Regex = Regex::new(r"^(\d+)x(\d+)$").unwrap();
}

/// Where a master playlist is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClass {
    /// Literal IP address
    Ip,
    /// The provider's own stream domain, never forwarded
    ProviderDomain,
    Foreign,
}

pub fn classify_host(url: &Url, stream_domain: &str) -> HostClass {
    match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => HostClass::Ip,
        Some(Host::Domain(host)) => {
            let host = host.to_lowercase();
            let domain = stream_domain.to_lowercase();
            if host == domain || host.ends_with(&format!(".{}", domain)) {
                HostClass::ProviderDomain
            } else {
                HostClass::Foreign
            }
        }
        None => HostClass::Foreign,
    }
}

/// Attributes of one `#EXT-X-STREAM-INF` line
fn parse_stream_inf(line: &str) -> HashMap<String, String> {
    let list = line
        .strip_prefix(STREAM_INF_TAG)
        .map(|rest| rest.trim_start_matches(':'))
        .unwrap_or_default();

    ATTR_REGEX
        .captures_iter(list)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_uppercase();
            let value = caps.get(2)?.as_str().trim_matches('"').to_string();
            Some((key, value))
        })
        .collect()
}

pub fn quality_from_height(height: u32) -> String {
    match height {
        h if h >= 2160 => "2160p".to_string(),
        h if h >= 1440 => "1440p".to_string(),
        h if h >= 1080 => "1080p".to_string(),
        h if h >= 720 => "720p".to_string(),
        h if h >= 480 => "480p".to_string(),
        h => format!("{}p", h),
    }
}

pub fn quality_from_bandwidth(bandwidth: u64) -> String {
    let label = match bandwidth {
        b if b >= 6_000_000 => "2160p",
        b if b >= 3_500_000 => "1440p",
        b if b >= 2_000_000 => "1080p",
        b if b >= 1_000_000 => "720p",
        b if b >= 600_000 => "480p",
        _ => "360p",
    };
    label.to_string()
}

/// Resolution wins over bandwidth; neither gives "auto"
fn quality_label(attrs: &HashMap<String, String>) -> String {
    if let Some(height) = attrs
        .get("RESOLUTION")
        .and_then(|r| RESOLUTION_REGEX.captures(r))
        .and_then(|caps| caps.get(2)?.as_str().parse().ok())
    {
        return quality_from_height(height);
    }

    attrs
        .get("BANDWIDTH")
        .and_then(|b| b.parse().ok())
        .map(quality_from_bandwidth)
        .unwrap_or_else(|| AUTO_QUALITY.to_string())
}

/// Resolve a variant URI against the master, carrying the session param over
fn variant_url(uri: &str, master: &Url) -> Url {
    let mut url = master.join(uri).unwrap_or_else(|_| master.clone());

    let session = master
        .query_pairs()
        .find(|(key, _)| key == SESSION_PARAM)
        .map(|(_, value)| value.into_owned());
    let has_session = url.query_pairs().any(|(key, _)| key == SESSION_PARAM);

    if let (Some(value), false) = (session, has_session) {
        url.query_pairs_mut().append_pair(SESSION_PARAM, &value);
    }
    url
}

/// Parse the variant streams of a master playlist, in source order
pub fn parse_master(text: &str, master: &Url) -> Vec<StreamVariant> {
    let mut variants = Vec::new();
    let mut pending: Option<HashMap<String, String>> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(STREAM_INF_TAG) {
            pending = Some(parse_stream_inf(line));
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        // URI line: belongs to the preceding STREAM-INF, if any
        if let Some(attrs) = pending.take() {
            variants.push(StreamVariant {
                url: variant_url(line, master).to_string(),
                quality_label: quality_label(&attrs),
                container_kind: ContainerKind::Hls,
            });
        }
    }

    variants
}

fn unexpanded(master_url: &str) -> Vec<StreamVariant> {
    vec![StreamVariant {
        url: master_url.to_string(),
        quality_label: AUTO_QUALITY.to_string(),
        container_kind: ContainerKind::Hls,
    }]
}

pub struct PlaylistExpander {
    http: Client,
    provider_base_url: String,
    stream_domain: String,
    user_agent: String,
}

impl PlaylistExpander {
    pub fn new(http: Client, provider_base_url: &str, stream_domain: &str, user_agent: &str) -> Self {
        Self {
            http,
            provider_base_url: provider_base_url.trim_end_matches('/').to_string(),
            stream_domain: stream_domain.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Variants to forward for a master playlist. Provider-domain masters
    /// yield nothing; failures fall back to the master itself as "auto".
    pub async fn expand(&self, master_url: &str) -> Vec<StreamVariant> {
        let master = match Url::parse(master_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = master_url, error = %e, "unparseable master URL, forwarding as is");
                return unexpanded(master_url);
            }
        };

        let referer = match classify_host(&master, &self.stream_domain) {
            HostClass::ProviderDomain => {
                info!(host = master.host_str().unwrap_or(""), "skipping provider-hosted master");
                return Vec::new();
            }
            HostClass::Ip => self.provider_base_url.clone(),
            HostClass::Foreign => master.origin().ascii_serialization(),
        };

        let text = match send_text(
            self.http
                .get(master.as_str())
                .header("User-Agent", &self.user_agent)
                .header("Referer", &referer)
                .header("Origin", &referer),
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(url = master_url, error = %e, "master fetch failed, forwarding master");
                return unexpanded(master_url);
            }
        };

        let variants = parse_master(&text, &master);
        if variants.is_empty() {
            debug!(url = master_url, "no variants in master, forwarding master");
            return unexpanded(master_url);
        }

        info!(count = variants.len(), "expanded master playlist");
        variants
    }
}
