//! Shared outbound HTTP plumbing

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Browser-like Accept header for HTML pages
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Build the one client every upstream call goes through.
/// Each call is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .gzip(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("Failed to create HTTP client")
}

/// Send a request and return the body text, mapping non-2xx to `HttpStatus`
pub async fn send_text(request: RequestBuilder) -> PipelineResult<String> {
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        debug!(status = status.as_u16(), url = %url, "upstream returned error status");
        return Err(PipelineError::HttpStatus {
            status: status.as_u16(),
            url,
        });
    }

    Ok(response.text().await?)
}
