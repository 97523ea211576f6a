//! Storefront fetcher

use anyhow::{Context, Result};
use async_trait::async_trait;
use liquidfn_harness::Fetcher;
use tracing::debug;

/// Plain GET against the storefront. Non-2xx bodies are returned as-is:
/// the platform's error pages are what the render-retry logic classifies.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("liquidfn/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?;
        debug!(status = %response.status(), "fetched {}", url);
        response.text().await.context("reading response body")
    }
}
