//! Error types for the harness

use std::time::Duration;
use thiserror::Error;

use crate::lifecycle::Phase;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Unable to load template source for '{entry}': {error:#}")]
    TemplateLoad { entry: String, error: anyhow::Error },

    #[error("Unable to setup test: {0:#}")]
    Setup(anyhow::Error),

    #[error("Deploying render target failed: {0:#}")]
    Deploy(anyhow::Error),

    #[error("Fetching {url} failed: {error:#}")]
    Fetch { url: String, error: anyhow::Error },

    #[error("Fetching {url} timed out after {timeout:?}")]
    FetchTimeout { url: String, timeout: Duration },

    #[error("Unable to teardown test: {} render target(s) left behind ({})", .failed.len(), describe_failed(.failed))]
    TeardownIncomplete {
        deleted: Vec<String>,
        failed: Vec<(String, String)>,
    },

    #[error("Deleted {} render target(s) but a teardown observer failed: {error}", .deleted.len())]
    TeardownObserver {
        deleted: Vec<String>,
        error: liquidfn_common::Error,
    },

    #[error("Test case failed: {0:#}")]
    Case(anyhow::Error),

    #[error("Event bus error: {0}")]
    Bus(#[from] liquidfn_common::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn describe_failed(failed: &[(String, String)]) -> String {
    failed
        .iter()
        .map(|(suffix, error)| format!("{suffix}: {error}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl HarnessError {
    /// Render targets a failed teardown still managed to delete
    pub fn deleted_targets(&self) -> &[String] {
        match self {
            HarnessError::TeardownIncomplete { deleted, .. }
            | HarnessError::TeardownObserver { deleted, .. } => deleted,
            _ => &[],
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
