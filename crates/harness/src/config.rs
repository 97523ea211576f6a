//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Base name shared by the hosting page, the snippet and every render target
pub const DEFAULT_BASE_NAME: &str = "liquid-fn-test";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Shop domain, e.g. `example.myshopify.com`
    pub shop: String,

    /// Base name for the page, snippet and render targets
    pub base_name: String,

    /// Directory holding `<entry>.liquid` and `<entry>.yaml`
    pub tests_dir: PathBuf,

    /// Render-retry settings
    pub render: RenderConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            shop: String::new(),
            base_name: DEFAULT_BASE_NAME.to_string(),
            tests_dir: PathBuf::from("tests"),
            render: RenderConfig::default(),
        }
    }
}

/// Render-retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Delay before the first fetch, to let the deployment propagate
    pub delay_ms: u64,

    /// Deadline for each fetch (None = wait indefinitely)
    pub timeout_ms: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            timeout_ms: None,
        }
    }
}

impl RenderConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl HarnessConfig {
    /// Check the values a run cannot start without
    pub fn validate(&self) -> HarnessResult<()> {
        if self.shop.trim().is_empty() {
            return Err(HarnessError::Config("shop must not be empty".into()));
        }
        if self.base_name.trim().is_empty() {
            return Err(HarnessError::Config("base_name must not be empty".into()));
        }
        Ok(())
    }

    /// Public URL serving the render target with the given suffix
    pub fn render_url(&self, suffix: &str) -> String {
        format!(
            "https://{}/pages/{base}?view={base}-{}",
            self.shop,
            suffix,
            base = self.base_name
        )
    }

    /// Path to the declarative case for `entry`
    pub fn case_path(&self, entry: &str) -> PathBuf {
        self.tests_dir.join(format!("{entry}.yaml"))
    }
}
