//! Resolution pipeline
//!
//! metadata → content page → playable source → stream bundle, strictly in
//! that order. Discovery stages report misses as `None`; only the final
//! stages surface errors.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{EpisodeInfo, MediaInfo, MediaKind, PlayableSource, StreamBundle};
use crate::services::assembler::StreamAssembler;
use crate::services::extractor::{Extractor, ProviderPatterns, SourceVerifier};
use crate::services::http::build_client;
use crate::services::playlist::PlaylistExpander;
use crate::services::rpm::RpmClient;
use crate::services::site::PageResolver;
use crate::services::tmdb::TmdbClient;

pub struct Pipeline {
    metadata: TmdbClient,
    pages: PageResolver,
    extractor: Extractor,
    assembler: StreamAssembler,
    deadline: Duration,
}

impl Pipeline {
    pub fn new(
        metadata: TmdbClient,
        pages: PageResolver,
        extractor: Extractor,
        assembler: StreamAssembler,
        deadline: Duration,
    ) -> Self {
        Self {
            metadata,
            pages,
            extractor,
            assembler,
            deadline,
        }
    }

    /// Wire every component from `config` around one shared HTTP client
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = build_client(config.http_timeout())?;

        let rpm = Arc::new(
            RpmClient::new(http.clone(), config.rpm.clone())
                .context("Invalid RPM key or IV")?,
        );
        let patterns = ProviderPatterns::from_base_url(&config.rpm.base_url)
            .context("Failed to build provider patterns")?;
        let verifier: Arc<dyn SourceVerifier> = rpm.clone();

        let extractor = Extractor::new(
            http.clone(),
            config.site.clone(),
            patterns,
            verifier,
            config.max_verify_candidates,
        );
        let playlists = PlaylistExpander::new(
            http.clone(),
            &config.rpm.base_url,
            &config.rpm.stream_domain,
            &config.rpm.user_agent,
        );

        Ok(Self::new(
            TmdbClient::new(http.clone(), config.tmdb.clone()),
            PageResolver::new(http, config.site.clone()),
            extractor,
            StreamAssembler::new(rpm, playlists, config.videa.clone()),
            config.request_deadline(),
        ))
    }

    /// Resolve an IMDB id (plus optional season/episode) to a titled bundle
    pub async fn resolve(
        &self,
        imdb_id: &str,
        episode: Option<(u32, u32)>,
    ) -> PipelineResult<StreamBundle> {
        timeout(self.deadline, self.run(imdb_id, episode))
            .await
            .map_err(|_| PipelineError::DeadlineExceeded(self.deadline))?
    }

    /// Assemble a known source directly, skipping discovery
    pub async fn assemble(&self, source: &PlayableSource) -> PipelineResult<StreamBundle> {
        timeout(self.deadline, self.assembler.assemble(source))
            .await
            .map_err(|_| PipelineError::DeadlineExceeded(self.deadline))?
    }

    async fn run(&self, imdb_id: &str, episode: Option<(u32, u32)>) -> PipelineResult<StreamBundle> {
        let media = self
            .metadata
            .resolve(imdb_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(format!("no metadata for {}", imdb_id)))?;

        // Episode details only for series with both numbers present
        let episode_info = match (media.kind, episode) {
            (MediaKind::Series, Some((season, number))) => {
                self.metadata
                    .resolve_episode(media.external_series_id, season, number)
                    .await
            }
            _ => None,
        };
        let page_episode = match media.kind {
            MediaKind::Series => episode,
            MediaKind::Movie => None,
        };

        let page_url = self
            .pages
            .resolve(&media, page_episode)
            .await
            .ok_or_else(|| {
                PipelineError::NotFound(format!("no content page for {}", media.display_title))
            })?;
        info!(imdb_id, url = %page_url, "content page resolved");

        let source = match self.extractor.extract(&page_url).await {
            Some(source) => source,
            None => {
                warn!(imdb_id, url = %page_url, "no playable source on page");
                return Err(PipelineError::NotFound(format!(
                    "no playable source on {}",
                    page_url
                )));
            }
        };
        info!(imdb_id, source = %source, "playable source extracted");

        let bundle = self.assembler.assemble(&source).await?;
        Ok(bundle.with_title(compose_title(&media, episode_info.as_ref())))
    }
}

/// `"{title} S{s}E{e} - {episode}"` for resolved episodes, else
/// `"{title} ({year})"`, else the bare title
pub fn compose_title(media: &MediaInfo, episode: Option<&EpisodeInfo>) -> String {
    match (media.kind, episode) {
        (MediaKind::Series, Some(ep)) => format!(
            "{} S{}E{} - {}",
            media.display_title, ep.season_number, ep.episode_number, ep.episode_title
        ),
        _ => match media.year {
            Some(year) => format!("{} ({})", media.display_title, year),
            None => media.display_title.clone(),
        },
    }
}
