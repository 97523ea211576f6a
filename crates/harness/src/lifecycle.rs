//! Test lifecycle controller
//!
//! A [`TestRun`] owns everything scoped to one run (bus, tracker, render
//! target ledger) and walks it through
//! `Idle → SettingUp → Running → TearingDown → Done`. `Failed` is absorbing
//! and reachable from every phase.
//!
//! Setup failure aborts the run. A failing test case still gets its render
//! targets torn down; the failure is handed back as data.

use async_trait::async_trait;
use futures::future::join_all;
use liquidfn_common::{tracker, Event, EventBus, HandlerId, SharedTracker, Tracker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::context::TestContext;
use crate::deploy::{AssetDeployer, Fetcher, PageRef, TemplateLoader};
use crate::error::{HarnessError, HarnessResult};
use crate::presenter::Presenter;
use crate::render::{Renderer, TargetLedger};

/// Lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    SettingUp,
    Running,
    TearingDown,
    Done,
    Failed,
}

impl Phase {
    /// Whether `self → next` is a legal step
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (Failed, _) => false,
            (_, Failed) => true,
            (Idle, SettingUp)
            | (SettingUp, Running)
            | (Running, TearingDown)
            | (TearingDown, Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::SettingUp => write!(f, "setting_up"),
            Phase::Running => write!(f, "running"),
            Phase::TearingDown => write!(f, "tearing_down"),
            Phase::Done => write!(f, "done"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// Test-case defined logic executed in the `Running` phase
#[async_trait]
pub trait TestCase: Send + Sync {
    /// Render scenarios and assert on their output
    async fn run(&self, ctx: &mut TestContext) -> anyhow::Result<()>;
}

/// External collaborators a run drives
#[derive(Clone)]
pub struct Collaborators {
    pub deployer: Arc<dyn AssetDeployer>,
    pub fetcher: Arc<dyn Fetcher>,
    pub loader: Arc<dyn TemplateLoader>,
}

/// Fixtures deployed by setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub page: PageRef,
}

/// Render targets removed by teardown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub deleted: Vec<String>,
}

/// What the `Running` phase produced
#[derive(Debug)]
pub enum RunOutcome {
    /// The test case returned normally; teardown is still pending
    Completed,
    /// The test case failed; teardown has already been attempted
    Aborted {
        error: HarnessError,
        teardown: HarnessResult<TeardownReport>,
    },
}

/// Summary of a full setup → run → teardown pass
#[derive(Debug, Default)]
pub struct RunReport {
    pub run_error: Option<HarnessError>,
    pub teardown_error: Option<HarnessError>,
    pub deleted: Vec<String>,
}

impl RunReport {
    /// No run or teardown error (assertion failures do not count)
    pub fn is_clean(&self) -> bool {
        self.run_error.is_none() && self.teardown_error.is_none()
    }
}

/// One run of one test entry
pub struct TestRun {
    entry: String,
    config: Arc<HarnessConfig>,
    collaborators: Collaborators,
    bus: Arc<EventBus>,
    tracker: SharedTracker,
    ledger: TargetLedger,
    phase: Phase,
    run_failed: bool,
    tracking: Option<HandlerId>,
}

impl TestRun {
    pub fn new(entry: impl Into<String>, config: HarnessConfig, collaborators: Collaborators) -> Self {
        Self {
            entry: entry.into(),
            config: Arc::new(config),
            collaborators,
            bus: Arc::new(EventBus::new()),
            tracker: Tracker::shared(),
            ledger: TargetLedger::new(),
            phase: Phase::Idle,
            run_failed: false,
            tracking: None,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Bus for attaching observers before setup
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    /// Suffixes of every render target deployed so far
    pub fn render_targets(&self) -> Vec<String> {
        self.ledger.snapshot()
    }

    /// Load the snippet source, wire the tracker and deploy the page and
    /// snippet concurrently. Any failure is fatal to the run.
    pub async fn setup(&mut self) -> HarnessResult<SetupReport> {
        self.advance(Phase::SettingUp)?;
        match self.try_setup().await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Setup failed: {}", e);
                // Setup failure is what gets reported, even if publishing it fails too
                if let Err(publish_err) = self.bus.publish(Event::SetupFailure {
                    error: e.to_string(),
                }) {
                    warn!("Publishing setup failure: {}", publish_err);
                }
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    async fn try_setup(&mut self) -> HarnessResult<SetupReport> {
        self.bus.publish(Event::SetupStart {
            entry: self.entry.clone(),
        })?;

        let source = self.load_template().await?;

        if self.tracking.is_none() {
            self.tracking = Some(tracker::attach(&self.tracker, &self.bus)?);
        }

        let deployer = &self.collaborators.deployer;
        let (page, ()) = futures::try_join!(deployer.create_page(), deployer.create_snippet(&source))
            .map_err(HarnessError::Setup)?;

        info!("Deployed page {} and snippet for '{}'", page, self.entry);
        self.bus.publish(Event::SetupEnd {
            page: page.to_string(),
        })?;

        Ok(SetupReport { page })
    }

    async fn load_template(&self) -> HarnessResult<String> {
        self.bus.publish(Event::TemplateLoadStart {
            entry: self.entry.clone(),
        })?;

        match self.collaborators.loader.load(&self.entry).await {
            Ok(source) => {
                self.bus.publish(Event::TemplateLoadEnd {
                    entry: self.entry.clone(),
                    bytes: source.len(),
                })?;
                Ok(source)
            }
            Err(error) => {
                self.bus.publish(Event::TemplateLoadFailure {
                    entry: self.entry.clone(),
                    error: format!("{error:#}"),
                })?;
                Err(HarnessError::TemplateLoad {
                    entry: self.entry.clone(),
                    error,
                })
            }
        }
    }

    /// Execute the test case. On failure, teardown runs before this returns.
    pub async fn run(&mut self, case: &dyn TestCase) -> HarnessResult<RunOutcome> {
        self.advance(Phase::Running)?;

        let renderer = Renderer::new(
            self.config.clone(),
            self.collaborators.deployer.clone(),
            self.collaborators.fetcher.clone(),
            self.bus.clone(),
            self.ledger.clone(),
        );
        let mut ctx = TestContext::new(
            self.entry.clone(),
            self.config.clone(),
            self.bus.clone(),
            renderer,
        );

        match case.run(&mut ctx).await {
            Ok(()) => Ok(RunOutcome::Completed),
            Err(e) => {
                let error = match e.downcast::<HarnessError>() {
                    Ok(harness) => harness,
                    Err(other) => HarnessError::Case(other),
                };
                error!("Test run failed: {}", error);
                self.run_failed = true;
                let teardown = self.teardown().await;
                Ok(RunOutcome::Aborted { error, teardown })
            }
        }
    }

    /// Delete every render target recorded during the run.
    ///
    /// All deletions are attempted, even when an observer of
    /// `teardown:start` fails. Targets that could not be deleted are listed
    /// in [`HarnessError::TeardownIncomplete`]; a failing observer with every
    /// target deleted yields [`HarnessError::TeardownObserver`].
    pub async fn teardown(&mut self) -> HarnessResult<TeardownReport> {
        self.advance(Phase::TearingDown)?;

        let pending = self.ledger.snapshot();
        let mut observer_error = self
            .bus
            .publish(Event::TeardownStart {
                pending: pending.clone(),
            })
            .err();
        if let Some(e) = &observer_error {
            warn!("Publishing teardown start: {}", e);
        }

        let deployer = &self.collaborators.deployer;
        let results = join_all(
            pending
                .iter()
                .map(|suffix| deployer.delete_render_target(suffix)),
        )
        .await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (suffix, result) in pending.into_iter().zip(results) {
            match result {
                Ok(()) => deleted.push(suffix),
                Err(e) => {
                    warn!("Failed to delete render target {}: {:#}", suffix, e);
                    failed.push((suffix, format!("{e:#}")));
                }
            }
        }

        if failed.is_empty() {
            info!("Deleted {} render target(s)", deleted.len());
            if let Err(e) = self.bus.publish(Event::TeardownEnd {
                deleted: deleted.clone(),
            }) {
                warn!("Publishing teardown end: {}", e);
                observer_error.get_or_insert(e);
            }

            if let Some(error) = observer_error {
                self.phase = Phase::Failed;
                return Err(HarnessError::TeardownObserver { deleted, error });
            }
            self.phase = if self.run_failed {
                Phase::Failed
            } else {
                Phase::Done
            };
            return Ok(TeardownReport { deleted });
        }

        let left_behind: Vec<String> = failed.iter().map(|(suffix, _)| suffix.clone()).collect();
        let error = HarnessError::TeardownIncomplete {
            deleted: deleted.clone(),
            failed,
        };
        error!("{}", error);
        self.phase = Phase::Failed;
        // The incomplete teardown is what gets reported
        if let Err(publish_err) = self.bus.publish(Event::TeardownFailure {
            deleted,
            failed: left_behind,
            error: error.to_string(),
        }) {
            warn!("Publishing teardown failure: {}", publish_err);
        }
        Err(error)
    }

    /// Drive setup → run → teardown.
    ///
    /// Setup failure is returned as `Err`. Run and teardown failures are
    /// collected in the report; teardown never runs twice.
    pub async fn execute(&mut self, case: &dyn TestCase) -> HarnessResult<RunReport> {
        self.setup().await?;

        let mut report = RunReport::default();
        let teardown = match self.run(case).await? {
            RunOutcome::Completed => self.teardown().await,
            RunOutcome::Aborted { error, teardown } => {
                report.run_error = Some(error);
                teardown
            }
        };

        match teardown {
            Ok(td) => report.deleted = td.deleted,
            Err(e) => {
                report.deleted = e.deleted_targets().to_vec();
                report.teardown_error = Some(e);
            }
        }
        Ok(report)
    }

    /// Format tracked outcomes; never mutates the tracker
    pub fn present(&self, presenter: &dyn Presenter) -> HarnessResult<String> {
        presenter.present(&self.tracker.lock())
    }

    fn advance(&mut self, next: Phase) -> HarnessResult<()> {
        if !self.phase.can_advance_to(next) {
            return Err(HarnessError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }
}
