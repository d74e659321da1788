//! Strategy 1: provider player frame in the static markup

use async_trait::async_trait;
use std::sync::Arc;

use super::{ExtractionStrategy, ProviderPatterns, TargetPage};
use crate::models::PlayableSource;

pub struct StaticScan {
    patterns: Arc<ProviderPatterns>,
}

impl StaticScan {
    pub fn new(patterns: Arc<ProviderPatterns>) -> Self {
        Self { patterns }
    }
}

#[async_trait]
impl ExtractionStrategy for StaticScan {
    fn name(&self) -> &'static str {
        "static_scan"
    }

    async fn attempt(&self, page: &TargetPage) -> Option<PlayableSource> {
        self.patterns
            .frame_id(&page.html)
            .or_else(|| self.patterns.src_fragment(&page.html))
            .map(PlayableSource::primary)
    }
}
