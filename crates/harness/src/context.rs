//! What a test case sees while it runs

use liquidfn_common::{Assertion, Event, EventBus};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::{HarnessConfig, RenderConfig};
use crate::error::HarnessResult;
use crate::render::{Render, Renderer};

/// Handle passed to [`TestCase::run`](crate::lifecycle::TestCase::run).
///
/// Exposes the render and assert primitives. Results reach the tracker only
/// through the bus; a test case never touches the tracker itself.
pub struct TestContext {
    entry: String,
    config: Arc<HarnessConfig>,
    bus: Arc<EventBus>,
    renderer: Renderer,
}

impl TestContext {
    pub(crate) fn new(
        entry: String,
        config: Arc<HarnessConfig>,
        bus: Arc<EventBus>,
        renderer: Renderer,
    ) -> Self {
        Self {
            entry,
            config,
            bus,
            renderer,
        }
    }

    /// Entry name of the running test
    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Render `template` remotely and return the produced text, or `None`
    /// when the render target could not be deployed
    pub async fn render(&self, template: &str) -> HarnessResult<Option<String>> {
        Ok(self.renderer.render(template).await?.map(|r| r.text))
    }

    /// Render with explicit delay/deadline, keeping attempt details
    pub async fn render_with(
        &self,
        template: &str,
        options: &RenderConfig,
    ) -> HarnessResult<Option<Render>> {
        self.renderer.render_with(template, options).await
    }

    /// Report an assertion.
    ///
    /// Publishes `assert:start`, then `assert:success` or `assert:failure`,
    /// and returns `passed`. Errors only come from bus handlers, e.g. the
    /// tracker rejecting a reused description.
    pub fn assert(
        &self,
        description: impl Into<String>,
        passed: bool,
        expected: impl Into<Value>,
        actual: impl Into<Value>,
    ) -> HarnessResult<bool> {
        let assertion = Assertion {
            description: description.into(),
            expected: expected.into(),
            actual: actual.into(),
        };
        self.bus.publish(Event::AssertStart(assertion.clone()))?;

        if passed {
            debug!(description = %assertion.description, "assertion passed");
            self.bus.publish(Event::AssertSuccess(assertion))?;
        } else {
            let error = format!(
                "expected {} but got {}",
                assertion.expected, assertion.actual
            );
            debug!(description = %assertion.description, "assertion failed: {}", error);
            self.bus.publish(Event::AssertFailure { assertion, error })?;
        }

        Ok(passed)
    }

    /// Shorthand for asserting equality of rendered text
    pub fn assert_eq(
        &self,
        description: impl Into<String>,
        expected: &str,
        actual: Option<&str>,
    ) -> HarnessResult<bool> {
        let passed = actual == Some(expected);
        let actual = actual.map_or(Value::Null, Value::from);
        self.assert(description, passed, expected, actual)
    }
}
