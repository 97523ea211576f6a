//! Event vocabulary
//!
//! Every lifecycle step reports progress by publishing an [`Event`] onto the
//! [`EventBus`](crate::bus::EventBus). The set of kinds is closed; each kind
//! carries its own typed payload.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Classification of events, used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "setup:start")]
    SetupStart,
    #[serde(rename = "setup:end")]
    SetupEnd,
    #[serde(rename = "setup:failure")]
    SetupFailure,
    #[serde(rename = "teardown:start")]
    TeardownStart,
    #[serde(rename = "teardown:end")]
    TeardownEnd,
    #[serde(rename = "teardown:failure")]
    TeardownFailure,
    #[serde(rename = "template-load:start")]
    TemplateLoadStart,
    #[serde(rename = "template-load:end")]
    TemplateLoadEnd,
    #[serde(rename = "template-load:failure")]
    TemplateLoadFailure,
    #[serde(rename = "render:start")]
    RenderStart,
    #[serde(rename = "render:end")]
    RenderEnd,
    #[serde(rename = "render:failure")]
    RenderFailure,
    #[serde(rename = "render:retry")]
    RenderRetry,
    #[serde(rename = "render:retry-failure")]
    RenderRetryFailure,
    #[serde(rename = "render:suffix")]
    RenderSuffix,
    #[serde(rename = "assert:start")]
    AssertStart,
    #[serde(rename = "assert:success")]
    AssertSuccess,
    #[serde(rename = "assert:failure")]
    AssertFailure,
}

impl EventKind {
    /// Every kind, in vocabulary order
    pub const ALL: [EventKind; 18] = [
        EventKind::SetupStart,
        EventKind::SetupEnd,
        EventKind::SetupFailure,
        EventKind::TeardownStart,
        EventKind::TeardownEnd,
        EventKind::TeardownFailure,
        EventKind::TemplateLoadStart,
        EventKind::TemplateLoadEnd,
        EventKind::TemplateLoadFailure,
        EventKind::RenderStart,
        EventKind::RenderEnd,
        EventKind::RenderFailure,
        EventKind::RenderRetry,
        EventKind::RenderRetryFailure,
        EventKind::RenderSuffix,
        EventKind::AssertStart,
        EventKind::AssertSuccess,
        EventKind::AssertFailure,
    ];

    /// Stable wire name, e.g. `render:retry-failure`
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SetupStart => "setup:start",
            EventKind::SetupEnd => "setup:end",
            EventKind::SetupFailure => "setup:failure",
            EventKind::TeardownStart => "teardown:start",
            EventKind::TeardownEnd => "teardown:end",
            EventKind::TeardownFailure => "teardown:failure",
            EventKind::TemplateLoadStart => "template-load:start",
            EventKind::TemplateLoadEnd => "template-load:end",
            EventKind::TemplateLoadFailure => "template-load:failure",
            EventKind::RenderStart => "render:start",
            EventKind::RenderEnd => "render:end",
            EventKind::RenderFailure => "render:failure",
            EventKind::RenderRetry => "render:retry",
            EventKind::RenderRetryFailure => "render:retry-failure",
            EventKind::RenderSuffix => "render:suffix",
            EventKind::AssertStart => "assert:start",
            EventKind::AssertSuccess => "assert:success",
            EventKind::AssertFailure => "assert:failure",
        }
    }

    /// Whether this kind reports something going wrong
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EventKind::SetupFailure
                | EventKind::TeardownFailure
                | EventKind::TemplateLoadFailure
                | EventKind::RenderFailure
                | EventKind::RenderRetryFailure
                | EventKind::AssertFailure
        )
    }

    /// Parse a space-delimited list of event names.
    ///
    /// ```
    /// use liquidfn_common::EventKind;
    ///
    /// let kinds = EventKind::parse_list("assert:success assert:failure").unwrap();
    /// assert_eq!(kinds, vec![EventKind::AssertSuccess, EventKind::AssertFailure]);
    /// ```
    pub fn parse_list(names: &str) -> Result<Vec<EventKind>> {
        names.split_whitespace().map(str::parse).collect()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// A single assertion as reported on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub description: String,
    pub expected: serde_json::Value,
    pub actual: serde_json::Value,
}

/// An event together with its payload. Payloads are never mutated after
/// publication; handlers receive a shared reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetupStart {
        entry: String,
    },
    SetupEnd {
        page: String,
    },
    SetupFailure {
        error: String,
    },
    TeardownStart {
        pending: Vec<String>,
    },
    TeardownEnd {
        deleted: Vec<String>,
    },
    TeardownFailure {
        deleted: Vec<String>,
        failed: Vec<String>,
        error: String,
    },
    TemplateLoadStart {
        entry: String,
    },
    TemplateLoadEnd {
        entry: String,
        bytes: usize,
    },
    TemplateLoadFailure {
        entry: String,
        error: String,
    },
    RenderStart {
        template: String,
        delay: Duration,
    },
    RenderSuffix {
        template: String,
        suffix: String,
    },
    RenderRetry {
        suffix: String,
    },
    RenderRetryFailure {
        suffix: String,
    },
    RenderEnd {
        suffix: String,
        text: String,
    },
    RenderFailure {
        template: String,
        error: String,
    },
    AssertStart(Assertion),
    AssertSuccess(Assertion),
    AssertFailure {
        assertion: Assertion,
        error: String,
    },
}

impl Event {
    /// The kind this event is dispatched under
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SetupStart { .. } => EventKind::SetupStart,
            Event::SetupEnd { .. } => EventKind::SetupEnd,
            Event::SetupFailure { .. } => EventKind::SetupFailure,
            Event::TeardownStart { .. } => EventKind::TeardownStart,
            Event::TeardownEnd { .. } => EventKind::TeardownEnd,
            Event::TeardownFailure { .. } => EventKind::TeardownFailure,
            Event::TemplateLoadStart { .. } => EventKind::TemplateLoadStart,
            Event::TemplateLoadEnd { .. } => EventKind::TemplateLoadEnd,
            Event::TemplateLoadFailure { .. } => EventKind::TemplateLoadFailure,
            Event::RenderStart { .. } => EventKind::RenderStart,
            Event::RenderSuffix { .. } => EventKind::RenderSuffix,
            Event::RenderRetry { .. } => EventKind::RenderRetry,
            Event::RenderRetryFailure { .. } => EventKind::RenderRetryFailure,
            Event::RenderEnd { .. } => EventKind::RenderEnd,
            Event::RenderFailure { .. } => EventKind::RenderFailure,
            Event::AssertStart(_) => EventKind::AssertStart,
            Event::AssertSuccess(_) => EventKind::AssertSuccess,
            Event::AssertFailure { .. } => EventKind::AssertFailure,
        }
    }

    /// The assertion carried by `assert:*` events
    pub fn assertion(&self) -> Option<&Assertion> {
        match self {
            Event::AssertStart(a) | Event::AssertSuccess(a) => Some(a),
            Event::AssertFailure { assertion, .. } => Some(assertion),
            _ => None,
        }
    }
}
