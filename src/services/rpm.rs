//! RPM Share delivery API client
//!
//! Both endpoints answer with hex-encoded AES ciphertext of a JSON document.
//! `info` maps a video id to its player record; `video` returns the stream
//! description (master playlist, subtitles).

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::RpmConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::services::cipher::{RpmCipher, TokenPayload};
use crate::services::extractor::SourceVerifier;
use crate::services::http::send_text;

/// Shortest body still considered encrypted stream data
const MIN_CIPHERTEXT_LEN: usize = 100;
const PLAYER_WIDTH: u32 = 1920;
const PLAYER_HEIGHT: u32 = 1080;

lazy_static! {
    static ref HEX_BODY_REGEX: Regex = Regex::new(r"(?i)^[0-9a-f\s]+$").unwrap();
}

/// Decrypted `info` record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    /// String or number depending on the video
    #[serde(default)]
    pub player_id: Option<serde_json::Value>,
}

impl VideoInfo {
    pub fn has_title(&self) -> bool {
        self.title.as_deref().map_or(false, |t| !t.trim().is_empty())
    }

    pub fn player_id(&self) -> Option<String> {
        match self.player_id.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtitleInfo {
    /// `path#lang`
    #[serde(default)]
    pub forced: Option<String>,
}

/// Decrypted `video` record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamData {
    /// Provider-hosted HLS playlist
    #[serde(default)]
    pub hls: Option<String>,
    /// Master playlist URL
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub subtitle: Option<SubtitleInfo>,
}

/// Video id plus the player token some endpoint variants validate
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub video_id: String,
    pub title: Option<String>,
    pub player_id: Option<String>,
    pub token: Option<String>,
}

pub struct RpmClient {
    http: Client,
    config: RpmConfig,
    cipher: RpmCipher,
}

impl RpmClient {
    pub fn new(http: Client, config: RpmConfig) -> PipelineResult<Self> {
        let cipher = RpmCipher::new(&config.key_hex, config.iv.as_bytes())?;
        Ok(Self {
            http,
            config,
            cipher,
        })
    }

    pub fn config(&self) -> &RpmConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// GET an endpoint with the provider's own player as referrer
    async fn get_encrypted(&self, url: &str, video_id: &str) -> PipelineResult<String> {
        send_text(
            self.http
                .get(url)
                .header("User-Agent", &self.config.user_agent)
                .header("Referer", format!("{}/#{}", self.base_url(), video_id)),
        )
        .await
    }

    pub async fn get_video_info(&self, video_id: &str) -> PipelineResult<VideoInfo> {
        let url = format!(
            "{}/api/v1/info?id={}",
            self.base_url(),
            urlencoding::encode(video_id)
        );
        let body = self.get_encrypted(&url, video_id).await?;
        let plain = self.cipher.decrypt(&body)?;
        Ok(serde_json::from_str(&plain)?)
    }

    /// Player token for `player_id`, referred by the provider base
    pub fn player_token(&self, player_id: &str) -> PipelineResult<String> {
        self.cipher.encrypt_token(&TokenPayload {
            id: player_id.to_string(),
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            referrer: self.base_url().to_string(),
        })
    }

    /// Look the video up and prepare its player token
    pub async fn open_session(&self, video_id: &str) -> PipelineResult<PlayerSession> {
        let info = self.get_video_info(video_id).await?;
        let player_id = info.player_id();
        let token = player_id
            .as_deref()
            .map(|id| self.player_token(id))
            .transpose()?;

        info!(
            video_id,
            title = info.title.as_deref().unwrap_or(""),
            player_id = player_id.as_deref().unwrap_or(""),
            "opened player session"
        );

        Ok(PlayerSession {
            video_id: video_id.to_string(),
            title: info.title,
            player_id,
            token,
        })
    }

    /// Fetch and decrypt the stream description. A body that is not hex
    /// ciphertext is a format error, checked before any decryption.
    pub async fn fetch_stream_data(&self, session: &PlayerSession) -> PipelineResult<StreamData> {
        let url = format!(
            "{}/api/v1/video?id={}&w={}&h={}&r=",
            self.base_url(),
            urlencoding::encode(&session.video_id),
            PLAYER_WIDTH,
            PLAYER_HEIGHT
        );
        let body = self.get_encrypted(&url, &session.video_id).await?;

        let trimmed = body.trim();
        if trimmed.len() < MIN_CIPHERTEXT_LEN || !HEX_BODY_REGEX.is_match(trimmed) {
            return Err(PipelineError::Format(format!(
                "video response is not encrypted data ({} chars)",
                trimmed.len()
            )));
        }

        let plain = self.cipher.decrypt(trimmed)?;
        let data: StreamData = serde_json::from_str(&plain)?;

        if data.hls.is_none() && data.source.is_none() {
            return Err(PipelineError::Format(
                "no stream URLs in video response".to_string(),
            ));
        }

        debug!(
            video_id = %session.video_id,
            has_source = data.source.is_some(),
            has_subtitle = data.subtitle.is_some(),
            "decrypted stream data"
        );
        Ok(data)
    }
}

#[async_trait]
impl SourceVerifier for RpmClient {
    async fn verify(&self, token: &str) -> bool {
        match self.get_video_info(token).await {
            Ok(info) => info.has_title(),
            Err(e) if e.is_transport() => {
                warn!(id = token, error = %e, "provider unreachable while verifying candidate");
                false
            }
            Err(e) => {
                debug!(id = token, error = %e, "candidate id not known to provider");
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use mockito::Matcher;

    use crate::config::Config;
    use crate::services::http::build_client;

    fn client(server_url: &str) -> RpmClient {
        let config = Config::for_mock(server_url);
        RpmClient::new(build_client(config.http_timeout()).unwrap(), config.rpm).unwrap()
    }

    fn session(video_id: &str) -> PlayerSession {
        PlayerSession {
            video_id: video_id.to_string(),
            title: None,
            player_id: None,
            token: None,
        }
    }

    #[tokio::test]
    async fn test_info_and_session_token() {
        let mut server = mockito::Server::new_async().await;
        let info = mock_encrypted(
            &mut server,
            "info",
            "k6nwn",
            r#"{"title":"Heat (1995)","playerId":"p-77"}"#,
        )
        .await;

        let rpm = client(&server.url());
        let session = rpm.open_session("k6nwn").await.unwrap();

        assert_eq!(session.title.as_deref(), Some("Heat (1995)"));
        assert_eq!(session.player_id.as_deref(), Some("p-77"));
        let token = session.token.unwrap();
        let expected = format!(r#"{{"id":"p-77","w":1920,"h":1080,"r":"{}"}}"#, server.url());
        assert_eq!(cipher(rpm.config()).decrypt(&token).unwrap(), expected);
        info.assert_async().await;
    }

    #[test]
    fn test_numeric_player_id() {
        let info: VideoInfo = serde_json::from_str(r#"{"title":"X","playerId":1234}"#).unwrap();
        assert_eq!(info.player_id().as_deref(), Some("1234"));

        let empty: VideoInfo = serde_json::from_str(r#"{"title":""}"#).unwrap();
        assert!(!empty.has_title());
        assert!(empty.player_id().is_none());
    }

    #[tokio::test]
    async fn test_verifier_requires_title() {
        let mut server = mockito::Server::new_async().await;
        mock_encrypted(&mut server, "info", "good1", r#"{"title":"Film"}"#).await;
        mock_encrypted(&mut server, "info", "blank", r#"{"title":""}"#).await;

        let rpm = client(&server.url());
        assert!(rpm.verify("good1").await);
        assert!(!rpm.verify("blank").await);
        // Unmatched id: mock server answers 501
        assert!(!rpm.verify("other").await);
    }

    #[tokio::test]
    async fn test_stream_data_decrypts() {
        let mut server = mockito::Server::new_async().await;
        mock_encrypted(
            &mut server,
            "video",
            "k6nwn",
            r#"{"hls":"https://x.rpmstream.live/hls/master.m3u8","source":"http://185.1.2.3/master.m3u8?v=9","subtitle":{"forced":"/sub/k6nwn.vtt#hun"}}"#,
        )
        .await;

        let data = client(&server.url())
            .fetch_stream_data(&session("k6nwn"))
            .await
            .unwrap();
        assert_eq!(data.source.as_deref(), Some("http://185.1.2.3/master.m3u8?v=9"));
        assert_eq!(
            data.subtitle.and_then(|s| s.forced).as_deref(),
            Some("/sub/k6nwn.vtt#hun")
        );
    }

    #[tokio::test]
    async fn test_short_or_non_hex_body_is_format_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/video")
            .match_query(Matcher::UrlEncoded("id".into(), "short".into()))
            .with_status(200)
            .with_body("00ff00ff")
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/video")
            .match_query(Matcher::UrlEncoded("id".into(), "plain".into()))
            .with_status(200)
            .with_body(format!("<html>{}</html>", "ab".repeat(80)))
            .create_async()
            .await;

        let rpm = client(&server.url());
        for id in ["short", "plain"] {
            let err = rpm.fetch_stream_data(&session(id)).await.unwrap_err();
            assert!(matches!(err, PipelineError::Format(_)), "{}: {:?}", id, err);
        }
    }

    #[tokio::test]
    async fn test_stream_data_without_urls_is_format_error() {
        let mut server = mockito::Server::new_async().await;
        mock_encrypted(
            &mut server,
            "video",
            "empty",
            r#"{"subtitle":{"forced":"/sub/a.vtt#hun"},"padding":"make the ciphertext long enough"}"#,
        )
        .await;

        let err = client(&server.url())
            .fetch_stream_data(&session("empty"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Format(_)));
    }
}
