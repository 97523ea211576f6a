//! CLI configuration file

use anyhow::{Context, Result};
use liquidfn_harness::HarnessConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::client::DEFAULT_API_VERSION;

/// Contents of `liquidfn.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub harness: HarnessConfig,
    pub shopify: ShopifyConfig,
}

/// Admin API access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopifyConfig {
    /// Theme the fixtures are deployed into
    pub theme_id: Option<u64>,

    /// Admin API access token
    pub access_token: Option<String>,

    /// Admin API version
    pub api_version: String,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            theme_id: None,
            access_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}
