//! Stremio protocol shaping: addon manifest and `/stream` entries

use std::collections::BTreeMap;

use crate::config::Config;
use crate::models::{
    DecoderKind, Manifest, ManifestBehaviorHints, ProxyHeaders, StreamBehaviorHints,
    StreamBundle, StremioStream,
};

pub const ADDON_ID: &str = "streamapp.magyarfilmeksorozatok.hdmozi";
pub const ADDON_NAME: &str = "HDMozi→RPM Magyar";

pub fn manifest() -> Manifest {
    Manifest {
        id: ADDON_ID.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: ADDON_NAME.to_string(),
        description: "Magyar filmek és sorozatok a HDMozi oldalról, RPM Share lejátszóval"
            .to_string(),
        logo: "https://dl.stremio.com/addon-logo.png".to_string(),
        background: "https://dl.stremio.com/addon-background.jpg".to_string(),
        resources: vec!["stream".to_string()],
        types: vec!["movie".to_string(), "series".to_string()],
        catalogs: Vec::new(),
        id_prefixes: vec!["tt".to_string()],
        behavior_hints: ManifestBehaviorHints {
            configurable: false,
            configuration_required: false,
        },
    }
}

/// Request headers a player needs to fetch streams from `decoder`
fn playback_headers(decoder: DecoderKind, config: &Config) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    match decoder {
        DecoderKind::Primary => {
            let base = config.rpm.base_url.trim_end_matches('/');
            headers.insert("User-Agent".to_string(), config.rpm.user_agent.clone());
            headers.insert("Referer".to_string(), format!("{}/", base));
            headers.insert("Origin".to_string(), base.to_string());
        }
        DecoderKind::Secondary => {
            headers.insert("User-Agent".to_string(), config.site.user_agent.clone());
            headers.insert("Referer".to_string(), config.videa.referer.clone());
        }
    }
    headers
}

/// One stream entry per variant, in bundle order
pub fn to_streams(bundle: &StreamBundle, config: &Config) -> Vec<StremioStream> {
    let headers = playback_headers(bundle.decoder, config);

    bundle
        .variants
        .iter()
        .map(|variant| StremioStream {
            name: ADDON_NAME.to_string(),
            title: format!("🇭🇺 {} • {}", bundle.title, variant.quality_label),
            url: variant.url.clone(),
            subtitles: bundle.subtitles.clone(),
            behavior_hints: StreamBehaviorHints {
                proxy_headers: ProxyHeaders {
                    request: headers.clone(),
                },
                not_web_ready: !variant.is_directly_embeddable(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerKind, StreamVariant, SubtitleTrack};

    fn variant(url: &str, quality: &str, kind: ContainerKind) -> StreamVariant {
        StreamVariant {
            url: url.to_string(),
            quality_label: quality.to_string(),
            container_kind: kind,
        }
    }

    #[test]
    fn test_manifest_shape() {
        let json = serde_json::to_value(manifest()).unwrap();
        assert_eq!(json["id"], ADDON_ID);
        assert_eq!(json["resources"], serde_json::json!(["stream"]));
        assert_eq!(json["types"], serde_json::json!(["movie", "series"]));
        assert_eq!(json["idPrefixes"], serde_json::json!(["tt"]));
        assert_eq!(json["catalogs"], serde_json::json!([]));
        assert_eq!(json["behaviorHints"]["configurable"], false);
    }

    #[test]
    fn test_primary_streams_carry_provider_headers() {
        let config = Config::for_mock("https://rpm.example");
        let bundle = StreamBundle {
            title: "Dűne (2021)".to_string(),
            decoder: DecoderKind::Primary,
            variants: vec![
                variant("http://1.2.3.4/1080.m3u8", "1080p", ContainerKind::Hls),
                variant("http://1.2.3.4/720.m3u8", "720p", ContainerKind::Hls),
            ],
            subtitles: vec![SubtitleTrack {
                url: "https://rpm.example/sub.vtt".to_string(),
                language_code: "hun".to_string(),
            }],
        };

        let streams = to_streams(&bundle, &config);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].title, "🇭🇺 Dűne (2021) • 1080p");
        assert_eq!(streams[1].url, "http://1.2.3.4/720.m3u8");

        let json = serde_json::to_value(&streams[0]).unwrap();
        let request = &json["behaviorHints"]["proxyHeaders"]["request"];
        assert_eq!(request["Referer"], "https://rpm.example/");
        assert_eq!(request["Origin"], "https://rpm.example");
        assert_eq!(json["behaviorHints"]["notWebReady"], false);
        assert_eq!(json["subtitles"][0]["lang"], "hun");
    }

    #[test]
    fn test_web_player_stream_not_web_ready() {
        let config = Config::for_mock("https://rpm.example");
        let bundle = StreamBundle {
            title: "Film".to_string(),
            decoder: DecoderKind::Secondary,
            variants: vec![variant(
                "https://videa.hu/player?v=abc&platform=mobile",
                "auto",
                ContainerKind::Web,
            )],
            subtitles: Vec::new(),
        };

        let streams = to_streams(&bundle, &config);
        assert!(streams[0].behavior_hints.not_web_ready);
        let request = &streams[0].behavior_hints.proxy_headers.request;
        assert_eq!(request.get("Referer").map(String::as_str), Some("https://videa.hu/"));
        assert!(!request.contains_key("Origin"));
    }
}
