//! Strategy 2: provider host mentioned anywhere, swept with id patterns

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{ExtractionStrategy, ProviderPatterns, TargetPage};
use crate::models::PlayableSource;

pub struct DomainSweep {
    patterns: Arc<ProviderPatterns>,
}

impl DomainSweep {
    pub fn new(patterns: Arc<ProviderPatterns>) -> Self {
        Self { patterns }
    }
}

#[async_trait]
impl ExtractionStrategy for DomainSweep {
    fn name(&self) -> &'static str {
        "domain_sweep"
    }

    async fn attempt(&self, page: &TargetPage) -> Option<PlayableSource> {
        if !self.patterns.mentions_provider(&page.html) {
            return None;
        }

        debug!(host = self.patterns.authority(), "provider host present in page");
        self.patterns
            .sweep_id(&page.html)
            .map(PlayableSource::primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor::test_support::provider_patterns;

    async fn sweep(html: &str) -> Option<PlayableSource> {
        DomainSweep::new(Arc::new(provider_patterns()))
            .attempt(&TargetPage::new("https://hdmozi.hu/movies/x/", html))
            .await
    }

    #[tokio::test]
    async fn test_json_escaped_embed() {
        let html = r#"<script>var player = {"src":"https:\/\/rpmshare.rpmstream.live\/#w8kq2"};</script>"#;
        assert_eq!(sweep(html).await, Some(PlayableSource::primary("w8kq2")));
    }

    #[tokio::test]
    async fn test_link_outside_iframe() {
        let html = r#"<a data-src="https://rpmshare.rpmstream.live/#Zq81m">Lejátszás</a>"#;
        assert_eq!(sweep(html).await, Some(PlayableSource::primary("Zq81m")));
    }

    #[tokio::test]
    async fn test_placeholders_only() {
        let html = "rpmshare.rpmstream.live/#000000 rpmshare.rpmstream.live/#111111";
        assert!(sweep(html).await.is_none());
    }

    #[tokio::test]
    async fn test_host_absent() {
        assert!(sweep(r#"<div id="k6nwn"></div>"#).await.is_none());
    }
}
