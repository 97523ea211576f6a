//! liquidfn Common Library
//!
//! Shared building blocks for the liquidfn harness: the closed event
//! vocabulary, the in-process event bus that lifecycle steps publish onto,
//! and the tracker that accumulates assertion outcomes for one run.

pub mod bus;
pub mod error;
pub mod events;
pub mod tracker;

// Re-export commonly used types
pub use bus::{EventBus, HandlerId};
pub use error::{Error, Result};
pub use events::{Assertion, Event, EventKind};
pub use tracker::{Outcome, SharedTracker, Tally, Tracker};
