//! Strategy 3: probe the site's own dynamic player loader
//!
//! Content pages load their player through a WordPress AJAX call keyed by
//! post id and player option number. This replays those calls and inspects
//! each response for a playable source.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::patterns::find_videa_id;
use super::{ExtractionStrategy, GenericRescan, ProviderPatterns, TargetPage};
use crate::config::SiteConfig;
use crate::error::PipelineResult;
use crate::models::PlayableSource;
use crate::services::http::send_text;

/// Player options tried when the page lists none
const DEFAULT_PLAYER_OPTIONS: [u32; 5] = [1, 2, 3, 4, 5];

lazy_static! {
    /// Post id conventions, most specific first
    static ref POST_ID_PATTERNS: Vec<Regex> = vec![
        Regex::new(r#"data-post\s*=\s*['"](\d+)['"]"#).unwrap(),
        Regex::new(r#"post_id['"]\s*:\s*['"]*(\d+)"#).unwrap(),
        Regex::new(r#""post"\s*:\s*(\d+)"#).unwrap(),
        Regex::new(r#"postid['"]\s*:\s*['"]*(\d+)"#).unwrap(),
        Regex::new(r"wp-post-(\d+)").unwrap(),
    ];

    static ref LOADER_CONFIG_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)var\s+dtAjax\s*=\s*(\{[\s\S]*?\})\s*;").unwrap(),
        Regex::new(r"(?i)dtAjax\s*=\s*(\{[\s\S]*?\})").unwrap(),
    ];

    static ref PLAYER_TYPE_REGEX: Regex =
        Regex::new(r#"(?i)player-option[^>]*data-type=['"](\w+)['"]"#).unwrap();
    static ref PLAYER_OPTION_REGEX: Regex = Regex::new(r"player-option-(\d+)").unwrap();
    static ref DATA_NUME_REGEX: Regex = Regex::new(r#"(?i)data-nume=['"](\d+)['"]"#).unwrap();
}

/// Inline `dtAjax` loader configuration
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct LoaderConfig {
    /// admin-ajax endpoint, often relative
    pub url: Option<String>,
    /// REST endpoint
    pub player_api: Option<String>,
    /// "admin_ajax" or "rest_api"
    pub play_method: Option<String>,
}

impl LoaderConfig {
    fn prefers_admin(&self) -> bool {
        self.play_method
            .as_deref()
            .map_or(false, |m| m.to_lowercase().contains("admin"))
    }
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    embed_url: Option<String>,
}

pub fn find_post_id(html: &str) -> Option<String> {
    POST_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse the inline loader config; escaped slashes are unescaped first
pub fn parse_loader_config(html: &str) -> Option<LoaderConfig> {
    let raw = LOADER_CONFIG_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))?
        .get(1)?
        .as_str()
        .replace("\\/", "/");

    match serde_json::from_str(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            debug!(error = %e, "unparseable dtAjax block");
            None
        }
    }
}

/// Player option numbers listed on the page, ascending and deduplicated
pub fn player_numbers(html: &str) -> Vec<u32> {
    let found: BTreeSet<u32> = PLAYER_OPTION_REGEX
        .captures_iter(html)
        .chain(DATA_NUME_REGEX.captures_iter(html))
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect();

    if found.is_empty() {
        DEFAULT_PLAYER_OPTIONS.to_vec()
    } else {
        found.into_iter().collect()
    }
}

/// Loader content type: `tv` on episode pages unless an option says otherwise
pub fn player_type(page: &TargetPage) -> String {
    PLAYER_TYPE_REGEX
        .captures(&page.html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| {
            if page.url.contains("/episodes/") {
                "tv".to_string()
            } else {
                "movie".to_string()
            }
        })
}

pub struct DooPlayerProbe {
    http: Client,
    site: SiteConfig,
    patterns: Arc<ProviderPatterns>,
    rescan: Arc<GenericRescan>,
}

impl DooPlayerProbe {
    pub fn new(
        http: Client,
        site: SiteConfig,
        patterns: Arc<ProviderPatterns>,
        rescan: Arc<GenericRescan>,
    ) -> Self {
        Self {
            http,
            site,
            patterns,
            rescan,
        }
    }

    fn base_url(&self) -> &str {
        self.site.base_url.trim_end_matches('/')
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        if href.starts_with("//") {
            return format!("https:{}", href);
        }
        Url::parse(self.base_url())
            .and_then(|base| base.join(href))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string())
    }

    /// admin-ajax when the config prefers it, else the REST endpoint, else
    /// the conventional admin-ajax path
    pub fn endpoint(&self, config: &LoaderConfig) -> String {
        let chosen = match (&config.url, &config.player_api) {
            (Some(admin), _) if config.prefers_admin() => Some(admin),
            (_, Some(rest)) => Some(rest),
            _ => None,
        };

        match chosen {
            Some(url) => self.absolutize(url),
            None => format!("{}/wp-admin/admin-ajax.php", self.base_url()),
        }
    }

    async fn request_option(
        &self,
        endpoint: &str,
        page: &TargetPage,
        post_id: &str,
        nume: u32,
        kind: &str,
    ) -> PipelineResult<String> {
        let nume = nume.to_string();
        let form = [
            ("action", "doo_player_ajax"),
            ("post", post_id),
            ("nume", nume.as_str()),
            ("type", kind),
        ];

        send_text(
            self.http
                .post(endpoint)
                .header("User-Agent", &self.site.user_agent)
                .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
                .header("Accept-Language", "hu-HU,hu;q=0.9,en-US;q=0.8,en;q=0.7")
                .header("Origin", self.base_url())
                .header("Referer", &page.url)
                .header("X-Requested-With", "XMLHttpRequest")
                .form(&form),
        )
        .await
    }

    /// Look through one loader response for a playable source
    async fn inspect_response(&self, body: &str) -> Option<PlayableSource> {
        if let Ok(PlayerResponse {
            embed_url: Some(embed),
        }) = serde_json::from_str::<PlayerResponse>(body)
        {
            debug!(embed = %embed, "loader returned embed URL");
            if let Some(id) = find_videa_id(&embed) {
                return Some(PlayableSource::secondary(id));
            }
        }

        if let Some(id) = self.patterns.fragment_id(body) {
            return Some(PlayableSource::primary(id));
        }

        if let Some(id) = self.rescan.find(body).await {
            return Some(PlayableSource::primary(id));
        }

        find_videa_id(body).map(PlayableSource::secondary)
    }

    /// One GET against the REST endpoint, re-scanned generically
    async fn rest_fallback(&self, rest: &str, page: &TargetPage) -> Option<PlayableSource> {
        let endpoint = self.absolutize(rest);
        debug!(endpoint = %endpoint, "falling back to REST player endpoint");

        let body = match send_text(self.http.get(&endpoint).header("Referer", &page.url)).await {
            Ok(body) => body,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "REST player fallback failed");
                return None;
            }
        };

        self.rescan.find(&body).await.map(PlayableSource::primary)
    }
}

#[async_trait]
impl ExtractionStrategy for DooPlayerProbe {
    fn name(&self) -> &'static str {
        "dynamic_loader"
    }

    async fn attempt(&self, page: &TargetPage) -> Option<PlayableSource> {
        let Some(post_id) = find_post_id(&page.html) else {
            debug!(url = %page.url, "no post id for dynamic loader");
            return None;
        };

        let config = parse_loader_config(&page.html).unwrap_or_default();
        let endpoint = self.endpoint(&config);
        let kind = player_type(page);
        let options = player_numbers(&page.html);
        debug!(post_id = %post_id, endpoint = %endpoint, kind = %kind, ?options, "probing dynamic loader");

        for nume in options {
            match self.request_option(&endpoint, page, &post_id, nume, &kind).await {
                Ok(body) => {
                    if let Some(source) = self.inspect_response(&body).await {
                        debug!(nume, "player option yielded a source");
                        return Some(source);
                    }
                }
                Err(e) => warn!(nume, error = %e, "player option request failed"),
            }
        }

        match &config.player_api {
            Some(rest) if config.play_method.is_none() || config.prefers_admin() => {
                self.rest_fallback(rest, page).await
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    use crate::services::extractor::test_support::{provider_patterns, FakeVerifier};
    use crate::services::http::build_client;

    fn probe(base: &str, verifier: Arc<FakeVerifier>) -> DooPlayerProbe {
        let patterns = Arc::new(provider_patterns());
        let rescan = Arc::new(GenericRescan::new(patterns.clone(), verifier, 8));
        DooPlayerProbe::new(
            build_client(Duration::from_secs(5)).unwrap(),
            SiteConfig {
                base_url: base.to_string(),
                user_agent: "test-agent".to_string(),
            },
            patterns,
            rescan,
        )
    }

    fn page_html(loader: &str) -> String {
        format!(
            r#"<html><body class="wp-post-999">
            <ul id="playeroptionsul">
              <li id="player-option-1" class="dooplay_player_option" data-type="movie" data-post="4521" data-nume="1"></li>
              <li id="player-option-2" class="dooplay_player_option" data-type="movie" data-post="4521" data-nume="2"></li>
            </ul>
            <script>var dtAjax = {};</script>
            </body></html>"#,
            loader
        )
    }

    #[test]
    fn test_page_parsing() {
        let html = page_html(r#"{"url":"\/wp-admin\/admin-ajax.php","play_method":"admin_ajax"}"#);

        assert_eq!(find_post_id(&html).as_deref(), Some("4521"));
        assert_eq!(player_numbers(&html), vec![1, 2]);
        assert_eq!(
            parse_loader_config(&html),
            Some(LoaderConfig {
                url: Some("/wp-admin/admin-ajax.php".to_string()),
                player_api: None,
                play_method: Some("admin_ajax".to_string()),
            })
        );

        assert_eq!(player_numbers("<div></div>"), vec![1, 2, 3, 4, 5]);
        assert!(find_post_id("<div></div>").is_none());
    }

    #[test]
    fn test_player_type() {
        let episode = TargetPage::new("https://hdmozi.hu/episodes/dark-1x1/", "<div></div>");
        assert_eq!(player_type(&episode), "tv");

        let movie = TargetPage::new("https://hdmozi.hu/movies/heat/", "<div></div>");
        assert_eq!(player_type(&movie), "movie");

        let overridden = TargetPage::new(
            "https://hdmozi.hu/movies/heat/",
            r#"<li class="player-option" data-type="TV">"#,
        );
        assert_eq!(player_type(&overridden), "tv");
    }

    #[test]
    fn test_endpoint_choice() {
        let p = probe("https://hdmozi.hu", Arc::new(FakeVerifier::default()));

        let admin = LoaderConfig {
            url: Some("/wp-admin/admin-ajax.php".to_string()),
            player_api: Some("https://hdmozi.hu/wp-json/dooplayer/v2/".to_string()),
            play_method: Some("admin_ajax".to_string()),
        };
        assert_eq!(p.endpoint(&admin), "https://hdmozi.hu/wp-admin/admin-ajax.php");

        let rest = LoaderConfig {
            play_method: Some("rest_api".to_string()),
            ..admin
        };
        assert_eq!(p.endpoint(&rest), "https://hdmozi.hu/wp-json/dooplayer/v2/");

        assert_eq!(
            p.endpoint(&LoaderConfig::default()),
            "https://hdmozi.hu/wp-admin/admin-ajax.php"
        );
    }

    #[tokio::test]
    async fn test_json_embed_yields_secondary() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/wp-admin/admin-ajax.php")
            .match_header("x-requested-with", "XMLHttpRequest")
            .match_body(Matcher::Regex("nume=1".to_string()))
            .with_status(200)
            .with_body(r#"{"embed_url":"","type":false}"#)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/wp-admin/admin-ajax.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("action=doo_player_ajax".to_string()),
                Matcher::Regex("post=4521".to_string()),
                Matcher::Regex("nume=2".to_string()),
                Matcher::Regex("type=movie".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"embed_url":"https:\/\/videa.hu\/player?v=AbCdEf123","type":"iframe"}"#)
            .create_async()
            .await;

        let html = page_html(r#"{"url":"\/wp-admin\/admin-ajax.php","play_method":"admin_ajax"}"#);
        let page = TargetPage::new(format!("{}/movies/heat/", server.url()), html);
        let source = probe(&server.url(), Arc::new(FakeVerifier::default()))
            .attempt(&page)
            .await;

        assert_eq!(source, Some(PlayableSource::secondary("AbCdEf123")));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_provider_fragment_in_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/wp-admin/admin-ajax.php")
            .with_status(200)
            .with_body(r#"<iframe class="metaframe" src="https://rpmshare.rpmstream.live/#q1w2e"></iframe>"#)
            .create_async()
            .await;

        let html = page_html(r#"{"play_method":"admin_ajax"}"#);
        let page = TargetPage::new(format!("{}/movies/heat/", server.url()), html);
        let source = probe(&server.url(), Arc::new(FakeVerifier::default()))
            .attempt(&page)
            .await;

        assert_eq!(source, Some(PlayableSource::primary("q1w2e")));
    }

    #[tokio::test]
    async fn test_rest_fallback_after_failed_options() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/wp-admin/admin-ajax.php")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;
        let rest = server
            .mock("GET", "/wp-json/dooplayer/v2/")
            .with_status(200)
            .with_body(r#"<div data-rpm-id="Rr77t"></div>"#)
            .create_async()
            .await;

        let loader = format!(
            r#"{{"url":"\/wp-admin\/admin-ajax.php","player_api":"{}\/wp-json\/dooplayer\/v2\/","play_method":"admin_ajax"}}"#,
            server.url()
        );
        let page = TargetPage::new(format!("{}/movies/heat/", server.url()), page_html(&loader));
        let verifier = Arc::new(FakeVerifier::accepting(&["Rr77t"]));
        let source = probe(&server.url(), verifier).attempt(&page).await;

        assert_eq!(source, Some(PlayableSource::primary("Rr77t")));
        rest.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_post_id_makes_no_requests() {
        let page = TargetPage::new("https://hdmozi.hu/movies/heat/", "<div>nincs lejátszó</div>");
        let source = probe("http://127.0.0.1:9", Arc::new(FakeVerifier::default()))
            .attempt(&page)
            .await;
        assert!(source.is_none());
    }
}
