//! Collaborators the engine drives but does not implement
//!
//! The remote platform is reached only through these traits: deploying and
//! deleting assets, fetching rendered output, and loading the snippet source
//! under test. Implementations for the real platform live in the CLI crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to the hosting page deployed during setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: u64,
    pub handle: String,
}

impl std::fmt::Display for PageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.handle, self.id)
    }
}

/// Deploys and removes the remote artifacts a run needs
#[async_trait]
pub trait AssetDeployer: Send + Sync {
    /// Ensure the hosting page exists
    async fn create_page(&self) -> anyhow::Result<PageRef>;

    /// Create or replace the snippet under test
    async fn create_snippet(&self, source: &str) -> anyhow::Result<()>;

    /// Deploy a uniquely-suffixed render target holding `template`;
    /// returns the suffix
    async fn create_render_target(&self, template: &str) -> anyhow::Result<String>;

    /// Delete the render target with the given suffix
    async fn delete_render_target(&self, suffix: &str) -> anyhow::Result<()>;
}

/// Plain HTTP GET returning the body as text
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String>;
}

/// Loads the snippet source for a test entry
#[async_trait]
pub trait TemplateLoader: Send + Sync {
    async fn load(&self, entry: &str) -> anyhow::Result<String>;
}

/// Reads `<dir>/<entry>.liquid` from the local filesystem
#[derive(Debug, Clone)]
pub struct FsTemplateLoader {
    dir: PathBuf,
}

impl FsTemplateLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, entry: &str) -> PathBuf {
        self.dir.join(format!("{entry}.liquid"))
    }
}

#[async_trait]
impl TemplateLoader for FsTemplateLoader {
    async fn load(&self, entry: &str) -> anyhow::Result<String> {
        use anyhow::Context;

        let path = self.path_for(entry);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}
