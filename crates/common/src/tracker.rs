//! Assertion result tracking
//!
//! Append-only store of assertion outcomes keyed by description. The
//! tracker is fed from the bus (`assert:success` / `assert:failure`), never
//! by test cases directly.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::bus::{EventBus, HandlerId};
use crate::error::{Error, Result};
use crate::events::{Event, EventKind};

/// Tracker shared between the lifecycle and its bus subscription
pub type SharedTracker = Arc<Mutex<Tracker>>;

/// Outcome of a single assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub expected: serde_json::Value,
    pub actual: serde_json::Value,
    pub success: bool,
}

/// Filtered view over tracked outcomes
#[derive(Debug, Clone, PartialEq)]
pub struct Tally<'a> {
    pub entries: Vec<(&'a str, &'a Outcome)>,
    pub total: usize,
}

/// Insertion-ordered assertion outcomes for one run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Tracker {
    data: IndexMap<String, Outcome>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new tracker for sharing with a bus subscription
    pub fn shared() -> SharedTracker {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Record an outcome. Descriptions are unique for the lifetime of the
    /// tracker; recording one twice is an error.
    pub fn record(&mut self, description: impl Into<String>, outcome: Outcome) -> Result<()> {
        let description = description.into();
        if self.has(&description) {
            return Err(Error::DuplicateKey(description));
        }

        debug!(description = %description, success = outcome.success, "tracked assertion");
        self.data.insert(description, outcome);
        Ok(())
    }

    pub fn has(&self, description: &str) -> bool {
        self.data.contains_key(description)
    }

    pub fn get(&self, description: &str) -> Option<&Outcome> {
        self.data.get(description)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.data.iter().map(|(desc, outcome)| (desc.as_str(), outcome))
    }

    /// Raw tracked data
    pub fn data(&self) -> &IndexMap<String, Outcome> {
        &self.data
    }

    pub fn successes(&self) -> Tally<'_> {
        self.tally(true)
    }

    pub fn failures(&self) -> Tally<'_> {
        self.tally(false)
    }

    fn tally(&self, success: bool) -> Tally<'_> {
        let entries: Vec<_> = self.iter().filter(|(_, o)| o.success == success).collect();
        let total = entries.len();
        Tally { entries, total }
    }
}

/// Subscribe `tracker` to assertion outcomes published on `bus`.
///
/// A duplicate description surfaces as a handler error from `publish`.
pub fn attach(tracker: &SharedTracker, bus: &EventBus) -> Result<HandlerId> {
    let tracker = tracker.clone();
    bus.subscribe(
        &[EventKind::AssertSuccess, EventKind::AssertFailure],
        move |event| {
            let (assertion, success) = match event {
                Event::AssertSuccess(assertion) => (assertion, true),
                Event::AssertFailure { assertion, .. } => (assertion, false),
                _ => return Ok(()),
            };

            tracker.lock().record(
                assertion.description.clone(),
                Outcome {
                    expected: assertion.expected.clone(),
                    actual: assertion.actual.clone(),
                    success,
                },
            )?;
            Ok(())
        },
    )
}
