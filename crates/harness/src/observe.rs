//! Bus observer that mirrors every event into `tracing`

use liquidfn_common::{Event, EventBus, EventKind, HandlerId};
use tracing::{debug, info, warn};

/// Subscribe a logger to every event kind on `bus`
pub fn attach_logger(bus: &EventBus) -> liquidfn_common::Result<HandlerId> {
    bus.subscribe(&EventKind::ALL, |event| {
        log_event(event);
        Ok(())
    })
}

fn log_event(event: &Event) {
    let kind = event.kind();
    match event {
        Event::SetupStart { entry } => info!(event = %kind, "Setting up '{}'", entry),
        Event::SetupEnd { page } => debug!(event = %kind, page = %page, "Setup complete"),
        Event::SetupFailure { error } => warn!(event = %kind, "{}", error),
        Event::TeardownStart { pending } => {
            info!(event = %kind, "Tearing down {} render target(s)", pending.len())
        }
        Event::TeardownEnd { deleted } => {
            debug!(event = %kind, deleted = deleted.len(), "Teardown complete")
        }
        Event::TeardownFailure { failed, error, .. } => {
            warn!(event = %kind, failed = ?failed, "{}", error)
        }
        Event::TemplateLoadStart { entry } => debug!(event = %kind, entry = %entry, "Loading template"),
        Event::TemplateLoadEnd { entry, bytes } => {
            debug!(event = %kind, entry = %entry, bytes, "Template loaded")
        }
        Event::TemplateLoadFailure { entry, error } => {
            warn!(event = %kind, entry = %entry, "{}", error)
        }
        Event::RenderStart { delay, .. } => debug!(event = %kind, delay = ?delay, "Rendering"),
        Event::RenderSuffix { suffix, .. } => debug!(event = %kind, suffix = %suffix, "Render target deployed"),
        Event::RenderRetry { suffix } => warn!(event = %kind, suffix = %suffix, "Unexpected HTML, retrying"),
        Event::RenderRetryFailure { suffix } => {
            warn!(event = %kind, suffix = %suffix, "Unexpected HTML after retry")
        }
        Event::RenderEnd { suffix, text } => {
            debug!(event = %kind, suffix = %suffix, bytes = text.len(), "Rendered")
        }
        Event::RenderFailure { error, .. } => warn!(event = %kind, "{}", error),
        Event::AssertStart(a) => debug!(event = %kind, description = %a.description, "Asserting"),
        Event::AssertSuccess(a) => info!(event = %kind, "✓ {}", a.description),
        Event::AssertFailure { assertion, error } => {
            info!(event = %kind, "✗ {} - {}", assertion.description, error)
        }
    }
}
