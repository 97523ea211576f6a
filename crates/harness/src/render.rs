//! Render-retry controller
//!
//! Deploys a render target, waits for it to propagate, then fetches what the
//! remote renderer produced. The platform occasionally answers with its
//! generic HTML shell instead of the snippet output; such a response is
//! retried once, immediately. A second miss resolves to
//! [`UNEXPECTED_HTML`] so the caller's equality assertion simply fails.

use liquidfn_common::{Event, EventBus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{HarnessConfig, RenderConfig};
use crate::deploy::{AssetDeployer, Fetcher};
use crate::error::{HarnessError, HarnessResult};

/// Marker of the platform's generic HTML shell
pub const HTML_MARKER: &str = "<!doctype html>";

/// Result returned when the retry also hit the HTML shell
pub const UNEXPECTED_HTML: &str = "Response returned unexpected HTML.";

/// Fetches retried after the first one
pub const MAX_RETRIES: u8 = 1;

/// Suffixes of every render target deployed during a run.
///
/// Shared between the lifecycle, which tears them down, and the renderer,
/// which records each suffix as soon as its deployment succeeds.
#[derive(Debug, Clone, Default)]
pub struct TargetLedger {
    suffixes: Arc<Mutex<Vec<String>>>,
}

impl TargetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, suffix: impl Into<String>) {
        self.suffixes.lock().push(suffix.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.suffixes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.suffixes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.lock().is_empty()
    }
}

/// How a render resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Snippet output was returned
    Clean,
    /// Both attempts hit the HTML shell; `text` holds [`UNEXPECTED_HTML`]
    UnexpectedHtml,
}

/// Output of one render call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Render {
    pub suffix: String,
    pub text: String,
    pub attempts: u8,
    pub status: RenderStatus,
}

/// Whether `text` is the platform's HTML shell rather than snippet output
pub fn is_html_miss(text: &str) -> bool {
    text.contains(HTML_MARKER)
}

/// Drives the deploy → wait → fetch → classify → retry protocol
#[derive(Clone)]
pub struct Renderer {
    config: Arc<HarnessConfig>,
    deployer: Arc<dyn AssetDeployer>,
    fetcher: Arc<dyn Fetcher>,
    bus: Arc<EventBus>,
    ledger: TargetLedger,
}

impl Renderer {
    pub fn new(
        config: Arc<HarnessConfig>,
        deployer: Arc<dyn AssetDeployer>,
        fetcher: Arc<dyn Fetcher>,
        bus: Arc<EventBus>,
        ledger: TargetLedger,
    ) -> Self {
        Self {
            config,
            deployer,
            fetcher,
            bus,
            ledger,
        }
    }

    /// Render `template` with the configured delay and deadline
    pub async fn render(&self, template: &str) -> HarnessResult<Option<Render>> {
        self.render_with(template, &self.config.render).await
    }

    /// Render `template`.
    ///
    /// Returns `Ok(None)` when the render target could not be deployed
    /// (`render:failure` has been published). Fetch errors and deadline
    /// expiry propagate; HTML misses never do.
    pub async fn render_with(
        &self,
        template: &str,
        options: &RenderConfig,
    ) -> HarnessResult<Option<Render>> {
        let delay = options.delay();
        self.bus.publish(Event::RenderStart {
            template: template.to_string(),
            delay,
        })?;

        let suffix = match self.deployer.create_render_target(template).await {
            Ok(suffix) => suffix,
            Err(e) => {
                warn!("Render target deployment failed: {:#}", e);
                self.bus.publish(Event::RenderFailure {
                    template: template.to_string(),
                    error: HarnessError::Deploy(e).to_string(),
                })?;
                return Ok(None);
            }
        };
        self.ledger.record(suffix.clone());
        self.bus.publish(Event::RenderSuffix {
            template: template.to_string(),
            suffix: suffix.clone(),
        })?;

        tokio::time::sleep(delay).await;

        let url = self.config.render_url(&suffix);
        for attempt in 0..=MAX_RETRIES {
            let text = self.fetch(&url, options.timeout()).await?;

            if !is_html_miss(&text) {
                debug!(suffix = %suffix, attempt, "render resolved");
                self.bus.publish(Event::RenderEnd {
                    suffix: suffix.clone(),
                    text: text.clone(),
                })?;
                return Ok(Some(Render {
                    suffix,
                    text,
                    attempts: attempt + 1,
                    status: RenderStatus::Clean,
                }));
            }

            if attempt < MAX_RETRIES {
                debug!(suffix = %suffix, "HTML response, retrying");
                self.bus.publish(Event::RenderRetry {
                    suffix: suffix.clone(),
                })?;
            }
        }

        warn!(suffix = %suffix, "Render still returned HTML after retry");
        self.bus.publish(Event::RenderRetryFailure {
            suffix: suffix.clone(),
        })?;
        self.bus.publish(Event::RenderEnd {
            suffix: suffix.clone(),
            text: String::new(),
        })?;

        Ok(Some(Render {
            suffix,
            text: UNEXPECTED_HTML.to_string(),
            attempts: MAX_RETRIES + 1,
            status: RenderStatus::UnexpectedHtml,
        }))
    }

    async fn fetch(&self, url: &str, deadline: Option<Duration>) -> HarnessResult<String> {
        let request = self.fetcher.fetch_text(url);
        let result = match deadline {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| HarnessError::FetchTimeout {
                    url: url.to_string(),
                    timeout,
                })?,
            None => request.await,
        };

        result.map_err(|error| HarnessError::Fetch {
            url: url.to_string(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_detection() {
        assert!(is_html_miss("<!doctype html><html><body>404</body></html>"));
        assert!(!is_html_miss("1.3"));
        assert!(!is_html_miss(""));
    }

    #[test]
    fn test_ledger_is_shared_between_clones() {
        let ledger = TargetLedger::new();
        let other = ledger.clone();
        other.record("abc");
        ledger.record("def");
        assert_eq!(ledger.snapshot(), vec!["abc", "def"]);
        assert_eq!(other.len(), 2);
    }
}
