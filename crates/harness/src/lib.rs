//! liquidfn Test Harness
//!
//! Engine that deploys a Liquid snippet to a shop, renders it through
//! throwaway page templates, records assertions and cleans up afterward.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  TestRun (lifecycle controller)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  setup()     load snippet, attach tracker, deploy page +    │
//! │              snippet concurrently                           │
//! │  run(case)   TestCase::run(&mut TestContext)                │
//! │                ├── render(template) -> Renderer             │
//! │                │     deploy target → wait → fetch → retry   │
//! │                └── assert(desc, passed, expected, actual)   │
//! │                      └── bus → Tracker                      │
//! │  teardown()  delete every render target concurrently        │
//! │  present()   Presenter (text | json) over the Tracker       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Collaborators: AssetDeployer, Fetcher, TemplateLoader      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod case;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod lifecycle;
pub mod observe;
pub mod presenter;
pub mod render;

pub use case::{CaseSpec, Scenario};
pub use config::{HarnessConfig, RenderConfig};
pub use context::TestContext;
pub use deploy::{AssetDeployer, Fetcher, FsTemplateLoader, PageRef, TemplateLoader};
pub use error::{HarnessError, HarnessResult};
pub use lifecycle::{Collaborators, Phase, RunOutcome, RunReport, TestCase, TestRun};
pub use presenter::{JsonPresenter, Presenter, TextPresenter, TextStyle};
pub use render::{Render, RenderStatus, Renderer, TargetLedger, UNEXPECTED_HTML};
