//! Shopify Admin REST client

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Default Admin API version
pub const DEFAULT_API_VERSION: &str = "2023-10";

/// Thin wrapper around the Admin REST API of one shop
#[derive(Clone)]
pub struct ShopifyClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ShopifyClient {
    /// Create a client for `shop` (e.g. `demo.myshopify.com`)
    pub fn new(shop: &str, token: &str, api_version: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            base_url: admin_base_url(shop, api_version),
            token: token.to_string(),
        })
    }

    /// Base URL all paths are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.request(Method::GET, path).query(query);
        self.send_json(request, path).await
    }

    /// POST a JSON body to `path`
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.request(Method::POST, path).json(body);
        self.send_json(request, path).await
    }

    /// PUT a JSON body to `path`
    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.request(Method::PUT, path).json(body);
        self.send_json(request, path).await
    }

    /// DELETE `path` with query parameters
    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let request = self.request(Method::DELETE, path).query(query);
        self.send(request, path).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .header("X-Shopify-Access-Token", &self.token)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("requesting {path}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{path} returned {status}: {}", body.trim());
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
        self.send(request, path)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding response from {path}"))
    }
}

fn admin_base_url(shop: &str, api_version: &str) -> String {
    let shop = shop
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{shop}/admin/api/{api_version}")
}
