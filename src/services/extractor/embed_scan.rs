//! Third-party player (Videa) embedded directly in the page

use async_trait::async_trait;

use super::patterns::find_videa_id;
use super::{ExtractionStrategy, TargetPage};
use crate::models::PlayableSource;

pub struct EmbedScan;

#[async_trait]
impl ExtractionStrategy for EmbedScan {
    fn name(&self) -> &'static str {
        "embed_scan"
    }

    async fn attempt(&self, page: &TargetPage) -> Option<PlayableSource> {
        find_videa_id(&page.html).map(PlayableSource::secondary)
    }
}
