//! Embedded-player extractor
//!
//! Loads a content page and runs an ordered cascade of strategies over it,
//! stopping at the first one that yields a [`PlayableSource`]. Episode pages
//! that 404 are recovered through year-less and series-page lookups first.

pub mod dooplayer;
pub mod domain_sweep;
pub mod embed_scan;
pub mod generic;
pub mod patterns;
pub mod static_scan;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::error::PipelineResult;
use crate::models::PlayableSource;
use crate::services::http::{send_text, ACCEPT_HTML};
use crate::services::metrics;
use crate::services::site::slug::{episode_url, series_url, strip_trailing_year, tvshow_url};

pub use dooplayer::DooPlayerProbe;
pub use domain_sweep::DomainSweep;
pub use embed_scan::EmbedScan;
pub use generic::GenericRescan;
pub use patterns::ProviderPatterns;
pub use static_scan::StaticScan;

/// How many corrected URLs a 404 may lead to before giving up
const MAX_RECOVERY_HOPS: usize = 3;

lazy_static! {
    static ref EPISODE_PATH_REGEX: Regex = Regex::new(r"/episodes/([^/]+)-(\d+)x(\d+)/?$").unwrap();
}

/// A fetched content page
#[derive(Debug, Clone)]
pub struct TargetPage {
    pub url: String,
    pub html: String,
}

impl TargetPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// One way of recovering a playable source from a page
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Label used in logs and metrics
    fn name(&self) -> &'static str;

    async fn attempt(&self, page: &TargetPage) -> Option<PlayableSource>;
}

/// Speculative check that a candidate id is known to the delivery provider
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> bool;
}

pub struct Extractor {
    http: Client,
    site: SiteConfig,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Extractor {
    /// Standard cascade: static frame scan, provider sweep, third-party
    /// embed scan, dynamic loader probe, generic re-scan
    pub fn new(
        http: Client,
        site: SiteConfig,
        patterns: ProviderPatterns,
        verifier: Arc<dyn SourceVerifier>,
        max_verify_candidates: usize,
    ) -> Self {
        let patterns = Arc::new(patterns);
        let rescan = Arc::new(GenericRescan::new(
            patterns.clone(),
            verifier,
            max_verify_candidates,
        ));

        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(StaticScan::new(patterns.clone())),
            Box::new(DomainSweep::new(patterns.clone())),
            Box::new(EmbedScan),
            Box::new(DooPlayerProbe::new(
                http.clone(),
                site.clone(),
                patterns,
                rescan.clone(),
            )),
            Box::new(GenericRescanStrategy(rescan)),
        ];

        Self::with_strategies(http, site, strategies)
    }

    pub fn with_strategies(
        http: Client,
        site: SiteConfig,
        strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Self {
        Self {
            http,
            site,
            strategies,
        }
    }

    /// Load `url` (recovering episode 404s) and run the cascade over it
    pub async fn extract(&self, url: &str) -> Option<PlayableSource> {
        let page = self.load_page(url).await?;
        self.run_strategies(&page).await
    }

    /// Run strategies in order, first hit wins
    pub async fn run_strategies(&self, page: &TargetPage) -> Option<PlayableSource> {
        for strategy in &self.strategies {
            debug!(strategy = strategy.name(), url = %page.url, "trying extraction strategy");
            if let Some(source) = strategy.attempt(page).await {
                info!(strategy = strategy.name(), source = %source, "playable source found");
                metrics::record_extractor_hit(strategy.name());
                return Some(source);
            }
        }

        warn!(url = %page.url, "no playable source on page");
        None
    }

    async fn fetch_page(&self, url: &str) -> PipelineResult<String> {
        send_text(
            self.http
                .get(url)
                .header("User-Agent", &self.site.user_agent)
                .header("Accept", ACCEPT_HTML),
        )
        .await
    }

    /// Fetch the page, following episode corrections on 404
    async fn load_page(&self, url: &str) -> Option<TargetPage> {
        let mut visited = HashSet::new();
        let mut next = url.to_string();

        for _ in 0..=MAX_RECOVERY_HOPS {
            let current = next;
            visited.insert(current.clone());

            match self.fetch_page(&current).await {
                Ok(html) => {
                    debug!(url = %current, bytes = html.len(), "fetched content page");
                    return Some(TargetPage::new(current, html));
                }
                Err(e) if e.is_http_not_found() => {
                    warn!(url = %current, "content page not found, trying corrected episode URL");
                    next = self.recover_episode_url(&current).await?;
                    if visited.contains(&next) {
                        warn!(url = %next, "episode correction leads back to a missing page");
                        return None;
                    }
                }
                Err(e) => {
                    warn!(url = %current, error = %e, "failed to fetch content page");
                    return None;
                }
            }
        }

        warn!(url, "gave up on episode URL corrections");
        None
    }

    /// Corrected URL for an episode page that 404'd: the year-less episode
    /// if it exists, else an episode link found on a series page
    async fn recover_episode_url(&self, url: &str) -> Option<String> {
        let caps = EPISODE_PATH_REGEX.captures(url)?;
        let slug = caps.get(1)?.as_str();
        let season: u32 = caps.get(2)?.as_str().parse().ok()?;
        let episode: u32 = caps.get(3)?.as_str().parse().ok()?;

        let base = self.site.base_url.trim_end_matches('/');
        let slug_no_year = strip_trailing_year(slug);
        let has_year = slug_no_year != slug;

        if has_year {
            let candidate = episode_url(base, &slug_no_year, season, episode);
            debug!(url = %candidate, "trying episode without year");
            if self.fetch_page(&candidate).await.is_ok() {
                return Some(candidate);
            }
        }

        let mut series_pages = vec![tvshow_url(base, slug), series_url(base, slug)];
        if has_year {
            series_pages.push(tvshow_url(base, &slug_no_year));
            series_pages.push(series_url(base, &slug_no_year));
        }

        // Links may zero-pad season and episode
        let link_regex = |s: &str| {
            Regex::new(&format!(
                r"(?i)/episodes/{}-0*{}x0*{}/",
                regex::escape(s),
                season,
                episode
            ))
            .ok()
        };
        let link_patterns = [link_regex(&slug_no_year)?, link_regex(slug)?];

        for page_url in series_pages {
            debug!(url = %page_url, "scanning series page for episode link");
            let Ok(html) = self.fetch_page(&page_url).await else {
                continue;
            };

            if let Some(link) = link_patterns.iter().find_map(|re| re.find(&html)) {
                return Some(format!("{}{}", base, link.as_str()));
            }
        }

        None
    }
}

/// The generic re-scan as the last cascade step
pub struct GenericRescanStrategy(pub Arc<GenericRescan>);

#[async_trait]
impl ExtractionStrategy for GenericRescanStrategy {
    fn name(&self) -> &'static str {
        "generic_rescan"
    }

    async fn attempt(&self, page: &TargetPage) -> Option<PlayableSource> {
        self.0.find(&page.html).await.map(PlayableSource::primary)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::time::Duration;

    use crate::services::http::build_client;

    fn extractor(base: &str, verifier: Arc<FakeVerifier>) -> Extractor {
        Extractor::new(
            build_client(Duration::from_secs(5)).unwrap(),
            SiteConfig {
                base_url: base.to_string(),
                user_agent: "test-agent".to_string(),
            },
            provider_patterns(),
            verifier,
            8,
        )
    }

    #[tokio::test]
    async fn test_static_frame_short_circuits() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/movies/heat/")
            .with_status(200)
            .with_body(
                r#"<iframe src="//rpmshare.rpmstream.live/#k6nwn"></iframe>
                   <iframe src="https://videa.hu/player?v=Abcdef12"></iframe>"#,
            )
            .create_async()
            .await;

        let verifier = Arc::new(FakeVerifier::default());
        let source = extractor(&server.url(), verifier.clone())
            .extract(&format!("{}/movies/heat/", server.url()))
            .await;

        assert_eq!(source, Some(PlayableSource::primary("k6nwn")));
        assert!(verifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_embed_scan_yields_secondary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/movies/heat/")
            .with_status(200)
            .with_body(r#"<iframe src="https://videa.hu/player?v=Abcdef12&autoplay=1"></iframe>"#)
            .create_async()
            .await;

        let source = extractor(&server.url(), Arc::new(FakeVerifier::default()))
            .extract(&format!("{}/movies/heat/", server.url()))
            .await;
        assert_eq!(source, Some(PlayableSource::secondary("Abcdef12")));
    }

    #[tokio::test]
    async fn test_episode_404_recovers_without_year() {
        let mut server = mockito::Server::new_async().await;
        let missing = server
            .mock("GET", "/episodes/alien-fold-2025-1x1/")
            .with_status(404)
            .create_async()
            .await;
        let found = server
            .mock("GET", "/episodes/alien-fold-1x1/")
            .with_status(200)
            .with_body(r#"<iframe src="https://rpmshare.rpmstream.live/#ep11x"></iframe>"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let source = extractor(&server.url(), Arc::new(FakeVerifier::default()))
            .extract(&format!("{}/episodes/alien-fold-2025-1x1/", server.url()))
            .await;

        assert_eq!(source, Some(PlayableSource::primary("ep11x")));
        missing.assert_async().await;
        found.assert_async().await;
    }

    #[tokio::test]
    async fn test_episode_404_recovers_from_series_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/episodes/dark-2x3/")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/tvshows/dark/")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/series/dark/")
            .with_status(200)
            .with_body(r#"<a href="https://hdmozi.hu/episodes/dark-02x03/">S2E3</a>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/episodes/dark-02x03/")
            .with_status(200)
            .with_body(r#"<iframe src="https://rpmshare.rpmstream.live/#drk23"></iframe>"#)
            .create_async()
            .await;

        let source = extractor(&server.url(), Arc::new(FakeVerifier::default()))
            .extract(&format!("{}/episodes/dark-2x3/", server.url()))
            .await;
        assert_eq!(source, Some(PlayableSource::primary("drk23")));
    }

    #[tokio::test]
    async fn test_episode_correction_loop_stops() {
        let mut server = mockito::Server::new_async().await;
        let missing = server
            .mock("GET", "/episodes/dark-2x3/")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/tvshows/dark/")
            .with_status(200)
            .with_body(r#"<a href="/episodes/dark-2x3/">S2E3</a>"#)
            .create_async()
            .await;

        let source = extractor(&server.url(), Arc::new(FakeVerifier::default()))
            .extract(&format!("{}/episodes/dark-2x3/", server.url()))
            .await;
        assert!(source.is_none());
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_episode_404_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/movies/nope/")
            .with_status(404)
            .create_async()
            .await;

        let source = extractor(&server.url(), Arc::new(FakeVerifier::default()))
            .extract(&format!("{}/movies/nope/", server.url()))
            .await;
        assert!(source.is_none());
    }
}
