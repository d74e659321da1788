//! Pipeline error taxonomy
//!
//! Discovery stages (metadata, page resolution, extraction) treat these as
//! soft and fall back; only the final stage surfaces them to the route layer.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Network-level failure (connect, TLS, body read, client timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload did not have the expected shape
    #[error("Format error: {0}")]
    Format(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Request deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl PipelineError {
    /// True for transport-class failures (network or non-2xx)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }

    /// True when the upstream answered 404
    pub fn is_http_not_found(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 404, .. })
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(format!("JSON parse error: {}", err))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
