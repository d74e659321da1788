//! Target page resolver for the HDMozi content site
//!
//! Finds the content page for a title through the site search, scored
//! against the requested metadata, and falls back to a constructed slug URL
//! whenever search is unavailable or inconclusive.

pub mod search;
pub mod slug;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SiteConfig;
use crate::error::PipelineResult;
use crate::models::{MediaInfo, MediaKind};
use crate::services::http::{send_text, ACCEPT_HTML};
use search::{
    best_candidate, derive_series_slug, parse_search_results, slug_covers_title, CandidatePage,
    MIN_ACCEPT_SCORE,
};

pub struct PageResolver {
    http: Client,
    config: SiteConfig,
}

impl PageResolver {
    pub fn new(http: Client, config: SiteConfig) -> Self {
        Self { http, config }
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Resolve the content page URL for a title. `None` only when no URL can
    /// be built at all (title slugifies to nothing).
    pub async fn resolve(&self, info: &MediaInfo, episode: Option<(u32, u32)>) -> Option<String> {
        let candidates = match self.search(&info.display_title).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(title = %info.display_title, error = %e, "site search failed, using constructed URL");
                return self.construct(info, episode);
            }
        };

        let Some((best, score)) = best_candidate(&candidates, info) else {
            info!(title = %info.display_title, "no search results, using constructed URL");
            return self.construct(info, episode);
        };

        if score < MIN_ACCEPT_SCORE {
            info!(title = %info.display_title, best = %best.url, score, "no good search match, using constructed URL");
            return self.construct(info, episode);
        }

        let url = match (info.kind, episode) {
            (MediaKind::Series, Some((season, ep))) => match self.refine_episode(best, info, season, ep) {
                Some(url) => url,
                None => return self.construct(info, episode),
            },
            _ => self.absolutize(&best.url),
        };

        info!(url = %url, score, "resolved content page via search");
        Some(url)
    }

    /// Run the site search for `title`
    pub async fn search(&self, title: &str) -> PipelineResult<Vec<CandidatePage>> {
        let url = format!("{}/?s={}", self.base_url(), urlencoding::encode(title));
        debug!(url = %url, "site search");

        let html = send_text(
            self.http
                .get(&url)
                .header("User-Agent", &self.config.user_agent)
                .header("Accept", ACCEPT_HTML),
        )
        .await?;

        let candidates = parse_search_results(&html);
        debug!(count = candidates.len(), "parsed search results");
        Ok(candidates)
    }

    /// Episode URL built from the series slug of a search hit, when the slug
    /// actually names the requested title
    fn refine_episode(&self, best: &CandidatePage, info: &MediaInfo, season: u32, episode: u32) -> Option<String> {
        let series_slug = derive_series_slug(&best.url)?;

        if !slug_covers_title(&series_slug, &info.display_title) {
            warn!(
                slug = %series_slug,
                title = %info.display_title,
                "search slug does not match title words"
            );
            return None;
        }

        Some(slug::episode_url(self.base_url(), &series_slug, season, episode))
    }

    fn construct(&self, info: &MediaInfo, episode: Option<(u32, u32)>) -> Option<String> {
        let url = slug::construct_url(self.base_url(), info, episode);
        if url.is_none() {
            warn!(title = %info.display_title, "title has no usable slug");
        }
        url
    }

    /// Search hits are usually absolute; relative ones are joined to the site base
    fn absolutize(&self, href: &str) -> String {
        Url::parse(self.base_url())
            .and_then(|base| base.join(href))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string())
    }
}
