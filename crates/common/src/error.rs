//! Error types for liquidfn

use thiserror::Error;

use crate::events::EventKind;

/// Result type alias using liquidfn Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the event bus and the result tracker.
///
/// All of these are programmer errors: they indicate a broken test case or
/// broken wiring, never a remote failure, and are not retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("handler must be registered for at least one event")]
    InvalidHandler,

    #[error("unknown event name: {0}")]
    UnknownEvent(String),

    #[error("\"{0}\" already exists in tracking")]
    DuplicateKey(String),

    #[error("handler for {event} failed: {error:#}")]
    Handler {
        event: EventKind,
        error: anyhow::Error,
    },
}
