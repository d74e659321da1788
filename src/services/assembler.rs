//! Stream assembler: playable source to stream bundle

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::VideaConfig;
use crate::error::PipelineResult;
use crate::models::{ContainerKind, PlayableSource, StreamBundle, StreamVariant, SubtitleTrack};
use crate::services::playlist::{PlaylistExpander, AUTO_QUALITY};
use crate::services::rpm::{RpmClient, StreamData};

pub struct StreamAssembler {
    rpm: Arc<RpmClient>,
    playlists: PlaylistExpander,
    videa: VideaConfig,
}

impl StreamAssembler {
    pub fn new(rpm: Arc<RpmClient>, playlists: PlaylistExpander, videa: VideaConfig) -> Self {
        Self {
            rpm,
            playlists,
            videa,
        }
    }

    /// Build the bundle for `source`; the title is left for the caller
    pub async fn assemble(&self, source: &PlayableSource) -> PipelineResult<StreamBundle> {
        let (variants, subtitles) = match source {
            PlayableSource::Secondary { embed_id } => {
                (vec![self.web_player_variant(embed_id)], Vec::new())
            }
            PlayableSource::Primary { token } => self.provider_streams(token).await?,
        };

        Ok(StreamBundle {
            title: String::new(),
            decoder: source.decoder(),
            variants,
            subtitles,
        })
    }

    /// Single web-player variant, no decryption involved
    fn web_player_variant(&self, embed_id: &str) -> StreamVariant {
        let url = format!(
            "{}?v={}&platform=mobile",
            self.videa.player_url.trim_end_matches('?'),
            urlencoding::encode(embed_id)
        );
        debug!(url = %url, "web player stream");

        StreamVariant {
            url,
            quality_label: AUTO_QUALITY.to_string(),
            container_kind: ContainerKind::Web,
        }
    }

    async fn provider_streams(
        &self,
        video_id: &str,
    ) -> PipelineResult<(Vec<StreamVariant>, Vec<SubtitleTrack>)> {
        let session = self.rpm.open_session(video_id).await?;
        let data = self.rpm.fetch_stream_data(&session).await?;

        // Provider-hosted `hls` playlists are never forwarded; only the master
        let variants = match data.source.as_deref() {
            Some(master) => self.playlists.expand(master).await,
            None => Vec::new(),
        };
        let subtitles = self.subtitles(&data);

        info!(
            video_id,
            variants = variants.len(),
            subtitles = subtitles.len(),
            "assembled provider streams"
        );
        Ok((variants, subtitles))
    }

    /// Forced subtitle `path#lang`, absolutized against the provider base
    fn subtitles(&self, data: &StreamData) -> Vec<SubtitleTrack> {
        let Some(forced) = data
            .subtitle
            .as_ref()
            .and_then(|s| s.forced.as_deref())
            .filter(|f| !f.is_empty())
        else {
            return Vec::new();
        };

        let (path, lang) = match forced.split_once('#') {
            Some((path, lang)) if !lang.is_empty() => (path, lang.to_string()),
            Some((path, _)) => (path, self.rpm.config().subtitle_lang.clone()),
            None => (forced, self.rpm.config().subtitle_lang.clone()),
        };

        vec![SubtitleTrack {
            url: format!("{}{}", self.rpm.base_url(), path),
            language_code: lang,
        }]
    }
}
