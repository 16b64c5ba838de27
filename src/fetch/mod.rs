// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::PipelineError;

const USER_AGENT: &str = concat!("nse-api/", env!("CARGO_PKG_VERSION"));

/// Shared client for upstream requests. Timeouts are set per request.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("building HTTP client")
}

/// GET `url` and return its body. Every failure here is an upstream failure.
#[instrument(level = "debug", skip(client, url), fields(url = %url))]
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<String, PipelineError> {
    debug!(timeout_ms = timeout.as_millis() as u64, "fetching page");
    let body = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!(bytes = body.len(), "page fetched");
    Ok(body)
}
