//! Theme asset deployer
//!
//! Maps the harness fixtures onto a Shopify theme:
//! - hosting page: page with handle `<base>` and template suffix `<base>`
//! - snippet under test: `snippets/<base>.liquid`
//! - render targets: `templates/page.<base>-<suffix>.liquid`

use anyhow::{Context, Result};
use async_trait::async_trait;
use liquidfn_harness::{AssetDeployer, PageRef};
use rand::Rng;
use regex::{NoExpand, Regex};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::ShopifyClient;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 11;

#[derive(Debug, Deserialize)]
struct PageList {
    pages: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    page: PageRef,
}

/// Deploys fixtures as assets of one theme
pub struct ThemeAssets {
    client: ShopifyClient,
    theme_id: u64,
    base_name: String,
    render_tag: Regex,
}

impl ThemeAssets {
    pub fn new(client: ShopifyClient, theme_id: u64, base_name: impl Into<String>) -> Result<Self> {
        let render_tag = Regex::new(r#"render\s+('|")[a-zA-Z0-9_-]+('|")"#)
            .context("compiling render tag pattern")?;
        Ok(Self {
            client,
            theme_id,
            base_name: base_name.into(),
            render_tag,
        })
    }

    fn assets_path(&self) -> String {
        format!("themes/{}/assets.json", self.theme_id)
    }

    fn snippet_key(&self) -> String {
        format!("snippets/{}.liquid", self.base_name)
    }

    fn template_key(&self, suffix: &str) -> String {
        format!("templates/page.{}-{}.liquid", self.base_name, suffix)
    }

    /// Page template body: no layout, and the first `render '...'` tag
    /// pointed at the deployed snippet
    pub fn render_target_body(&self, template: &str) -> String {
        let body = format!("{{%- layout none -%}}{template}");
        let replacement = format!("render '{}'", self.base_name);
        self.render_tag
            .replace(&body, NoExpand(&replacement))
            .into_owned()
    }

    async fn put_asset(&self, key: &str, value: &str) -> Result<()> {
        let body = json!({ "asset": { "key": key, "value": value } });
        let _: Value = self
            .client
            .put(&self.assets_path(), &body)
            .await
            .with_context(|| format!("uploading {key}"))?;
        Ok(())
    }
}

/// Random lowercase base-36 suffix
pub fn suffix_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

#[async_trait]
impl AssetDeployer for ThemeAssets {
    async fn create_page(&self) -> Result<PageRef> {
        let existing: PageList = self
            .client
            .get("pages.json", &[("fields", "handle,id")])
            .await
            .context("listing pages")?;

        if let Some(page) = existing.pages.into_iter().find(|p| p.handle == self.base_name) {
            debug!("Reusing page {}", page);
            return Ok(page);
        }

        let body = json!({
            "page": {
                "title": self.base_name,
                "handle": self.base_name,
                "body_html": "Used for testing Liquid snippets.",
                "template_suffix": self.base_name,
                "published": true,
            }
        });
        let created: PageEnvelope = self
            .client
            .post("pages.json", &body)
            .await
            .context("creating page")?;
        info!("Created page {}", created.page);
        Ok(created.page)
    }

    async fn create_snippet(&self, source: &str) -> Result<()> {
        self.put_asset(&self.snippet_key(), source).await
    }

    async fn create_render_target(&self, template: &str) -> Result<String> {
        let suffix = suffix_id();
        let key = self.template_key(&suffix);
        self.put_asset(&key, &self.render_target_body(template)).await?;
        debug!("Deployed render target {}", key);
        Ok(suffix)
    }

    async fn delete_render_target(&self, suffix: &str) -> Result<()> {
        let key = self.template_key(suffix);
        self.client
            .delete(&self.assets_path(), &[("asset[key]", key.as_str())])
            .await
            .with_context(|| format!("deleting {key}"))
    }
}
