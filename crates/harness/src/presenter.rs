//! Result presenters
//!
//! A presenter turns the tracker's accumulated outcomes into text. Both
//! variants read through the tracker's public accessors only.

use colored::Colorize;
use liquidfn_common::Tracker;
use serde::Serialize;
use serde_json::Value;

use crate::error::HarnessResult;

/// Renders tracker state to an output format
pub trait Presenter {
    fn present(&self, tracker: &Tracker) -> HarnessResult<String>;
}

/// Terminal styling for text output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub color: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { color: true }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Heading,
    Label,
    Pass,
    Fail,
}

impl TextStyle {
    pub fn plain() -> Self {
        Self { color: false }
    }

    fn paint(&self, tone: Tone, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Heading => text.underline().to_string(),
            Tone::Label => text.on_black().to_string(),
            Tone::Pass => text.on_green().to_string(),
            Tone::Fail => text.on_red().to_string(),
        }
    }
}

/// Human-readable presenter: one block per assertion, then totals
#[derive(Debug, Clone)]
pub struct TextPresenter {
    pub style: TextStyle,
    pub with_overall: bool,
}

impl Default for TextPresenter {
    fn default() -> Self {
        Self {
            style: TextStyle::default(),
            with_overall: true,
        }
    }
}

impl TextPresenter {
    pub fn new(style: TextStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    pub fn with_overall(mut self, with_overall: bool) -> Self {
        self.with_overall = with_overall;
        self
    }
}

/// Strings are shown bare, everything else as JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Presenter for TextPresenter {
    fn present(&self, tracker: &Tracker) -> HarnessResult<String> {
        let style = &self.style;
        let mut out = String::new();

        for (description, outcome) in tracker.iter() {
            let verdict = if outcome.success {
                style.paint(Tone::Pass, " Passed ")
            } else {
                style.paint(Tone::Fail, " Error ")
            };
            let block = [
                style.paint(Tone::Heading, &format!("Test: {description}")),
                style.paint(Tone::Label, " Expected "),
                display_value(&outcome.expected),
                style.paint(Tone::Label, " Actual "),
                display_value(&outcome.actual),
                verdict,
            ];
            out.push_str(&block.join("\n"));
            out.push_str("\n\n");
        }

        if self.with_overall {
            let overall = [
                style.paint(Tone::Heading, "Overall"),
                format!(
                    "{} {}",
                    style.paint(Tone::Pass, " Total Passed "),
                    tracker.successes().total
                ),
                format!(
                    "{} {}",
                    style.paint(Tone::Fail, " Total Failed "),
                    tracker.failures().total
                ),
            ];
            out.push_str(&overall.join("\n"));
        }

        Ok(out)
    }
}

/// Structured presenter emitting JSON
#[derive(Debug, Clone)]
pub struct JsonPresenter {
    /// Indentation width (None = compact)
    pub pretty: Option<usize>,
    pub with_overall: bool,
}

impl Default for JsonPresenter {
    fn default() -> Self {
        Self {
            pretty: None,
            with_overall: true,
        }
    }
}

#[derive(Serialize)]
struct Overall {
    passed: usize,
    failures: usize,
}

#[derive(Serialize)]
struct WithOverall<'a> {
    results: &'a Tracker,
    overall: Overall,
}

impl JsonPresenter {
    pub fn new(pretty: Option<usize>) -> Self {
        Self {
            pretty,
            ..Default::default()
        }
    }

    pub fn with_overall(mut self, with_overall: bool) -> Self {
        self.with_overall = with_overall;
        self
    }

    fn encode<T: Serialize>(&self, value: &T) -> HarnessResult<String> {
        match self.pretty {
            None | Some(0) => Ok(serde_json::to_string(value)?),
            Some(width) => {
                let indent = " ".repeat(width);
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut buf = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                value.serialize(&mut ser)?;
                // serde_json only ever writes valid UTF-8
                Ok(String::from_utf8_lossy(&buf).into_owned())
            }
        }
    }
}

impl Presenter for JsonPresenter {
    fn present(&self, tracker: &Tracker) -> HarnessResult<String> {
        if self.with_overall {
            self.encode(&WithOverall {
                results: tracker,
                overall: Overall {
                    passed: tracker.successes().total,
                    failures: tracker.failures().total,
                },
            })
        } else {
            self.encode(tracker)
        }
    }
}
