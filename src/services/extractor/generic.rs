//! Generic HTML re-scan with speculative verification
//!
//! Collects every plausible id from broad patterns and free-standing tokens,
//! then asks the verifier about each in order. The costliest strategy, so it
//! runs last and verifies a bounded number of candidates.

use std::sync::Arc;
use tracing::{debug, info};

use super::{ProviderPatterns, SourceVerifier};

pub struct GenericRescan {
    patterns: Arc<ProviderPatterns>,
    verifier: Arc<dyn SourceVerifier>,
    max_candidates: usize,
}

impl GenericRescan {
    pub fn new(
        patterns: Arc<ProviderPatterns>,
        verifier: Arc<dyn SourceVerifier>,
        max_candidates: usize,
    ) -> Self {
        Self {
            patterns,
            verifier,
            max_candidates,
        }
    }

    /// First candidate in `html` the verifier accepts
    pub async fn find(&self, html: &str) -> Option<String> {
        let candidates = self.patterns.rescan_candidates(html);
        debug!(
            found = candidates.len(),
            checking = candidates.len().min(self.max_candidates),
            "generic re-scan candidates"
        );

        for candidate in candidates.into_iter().take(self.max_candidates) {
            if self.verifier.verify(&candidate).await {
                info!(id = %candidate, "candidate verified");
                return Some(candidate);
            }
            debug!(id = %candidate, "candidate rejected");
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor::test_support::{provider_patterns, FakeVerifier};

    fn rescan(verifier: Arc<FakeVerifier>, limit: usize) -> GenericRescan {
        GenericRescan::new(Arc::new(provider_patterns()), verifier, limit)
    }

    #[tokio::test]
    async fn test_first_verified_candidate_wins() {
        let html = r#"<div data-rpm-id="aaaa1"></div><script>{"video_id":"bbbb2"}</script>"#;
        let verifier = Arc::new(FakeVerifier::accepting(&["bbbb2"]));

        let found = rescan(verifier.clone(), 8).find(html).await;
        assert_eq!(found.as_deref(), Some("bbbb2"));
        assert_eq!(verifier.calls(), vec!["aaaa1", "bbbb2"]);
    }

    #[tokio::test]
    async fn test_candidate_cap() {
        let html = "x1aaa x2bbb x3ccc x4ddd x5eee";
        let verifier = Arc::new(FakeVerifier::accepting(&["x5eee"]));

        let found = rescan(verifier.clone(), 3).find(html).await;
        assert!(found.is_none());
        assert_eq!(verifier.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_nothing_to_verify() {
        let verifier = Arc::new(FakeVerifier::default());
        let found = rescan(verifier.clone(), 8).find("<p>ok</p>").await;
        assert!(found.is_none());
        assert!(verifier.calls().is_empty());
    }
}
