//! In-process event bus
//!
//! Synchronous publish/subscribe used to decouple lifecycle steps from their
//! observers (logging, result tracking, presentation). Handlers for a kind
//! run in registration order, on the publisher's stack, before `publish`
//! returns. Nothing is persisted or delivered across processes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::events::{Event, EventKind};

/// Callback invoked with every event of the kinds it was registered for
pub type Handler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one `subscribe`/`once` registration across all of its kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Clone)]
struct Subscription {
    id: HandlerId,
    handler: Handler,
    once: bool,
}

/// Event bus scoped to a single run
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    spectators: Mutex<HashMap<EventKind, Vec<Subscription>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for each of `kinds`
    pub fn subscribe<F>(&self, kinds: &[EventKind], handler: F) -> Result<HandlerId>
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(kinds, Arc::new(handler), false)
    }

    /// Register `handler` for a single invocation across all of `kinds`.
    ///
    /// The bus deregisters the subscription from every listed kind before
    /// invoking it, so it fires exactly once no matter how often (or from
    /// where) the kinds are published afterward.
    pub fn once<F>(&self, kinds: &[EventKind], handler: F) -> Result<HandlerId>
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(kinds, Arc::new(handler), true)
    }

    /// Remove handlers from each of `kinds`.
    ///
    /// With `None`, every handler for those kinds is dropped; otherwise only
    /// the registration identified by `id` (one-shot or not).
    pub fn unsubscribe(&self, kinds: &[EventKind], id: Option<HandlerId>) {
        let mut spectators = self.spectators.lock();
        for kind in kinds {
            match id {
                None => {
                    spectators.remove(kind);
                }
                Some(id) => {
                    if let Some(subs) = spectators.get_mut(kind) {
                        subs.retain(|sub| sub.id != id);
                    }
                }
            }
        }
    }

    /// Deliver `event` to every handler registered for its kind.
    ///
    /// Publishing with no handlers is a no-op. A failing handler does not
    /// prevent later handlers from running; the first failure is returned
    /// once all of them have been invoked.
    pub fn publish(&self, event: Event) -> Result<()> {
        let kind = event.kind();
        let subs = match self.spectators.lock().get(&kind) {
            Some(subs) => subs.clone(),
            None => return Ok(()),
        };

        trace!(event = %kind, handlers = subs.len(), "publishing");

        let mut first_error = None;
        for sub in subs {
            if sub.once && !self.claim(sub.id) {
                continue;
            }

            if let Err(error) = (sub.handler)(&event) {
                warn!(event = %kind, "handler failed: {:#}", error);
                if first_error.is_none() {
                    first_error = Some(Error::Handler { event: kind, error });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of handlers currently registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.spectators.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Whether any handler is registered at all
    pub fn has_spectators(&self) -> bool {
        self.spectators.lock().values().any(|subs| !subs.is_empty())
    }

    fn register(&self, kinds: &[EventKind], handler: Handler, once: bool) -> Result<HandlerId> {
        if kinds.is_empty() {
            return Err(Error::InvalidHandler);
        }

        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut spectators = self.spectators.lock();
        for kind in kinds {
            spectators.entry(*kind).or_default().push(Subscription {
                id,
                handler: handler.clone(),
                once,
            });
        }
        Ok(id)
    }

    /// Remove a one-shot registration everywhere. Returns false if another
    /// delivery already claimed it.
    fn claim(&self, id: HandlerId) -> bool {
        let mut spectators = self.spectators.lock();
        let mut found = false;
        for subs in spectators.values_mut() {
            let before = subs.len();
            subs.retain(|sub| sub.id != id);
            found |= subs.len() != before;
        }
        found
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let spectators = self.spectators.lock();
        let mut counts: Vec<_> = spectators
            .iter()
            .map(|(kind, subs)| (kind.as_str(), subs.len()))
            .collect();
        counts.sort();
        f.debug_struct("EventBus").field("spectators", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Assertion;

    fn setup_start() -> Event {
        Event::SetupStart {
            entry: "example".into(),
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Handler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &str| -> Handler {
            let sink = sink.clone();
            let tag = tag.to_string();
            Arc::new(move |event: &Event| {
                sink.lock().push(format!("{tag}:{}", event.kind()));
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn test_handlers_fire_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();

        for tag in ["a", "b", "c"] {
            let h = make(tag);
            bus.subscribe(&[EventKind::SetupStart], move |e| h(e)).unwrap();
        }
        bus.publish(setup_start()).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["a:setup:start", "b:setup:start", "c:setup:start"]
        );
    }

    #[test]
    fn test_handlers_only_see_their_kinds() {
        let bus = EventBus::new();
        let (log, make) = recorder();

        let h = make("end");
        bus.subscribe(&[EventKind::SetupEnd], move |e| h(e)).unwrap();
        bus.publish(setup_start()).unwrap();
        bus.publish(Event::SetupEnd { page: "p".into() }).unwrap();

        assert_eq!(*log.lock(), vec!["end:setup:end"]);
    }

    #[test]
    fn test_publish_without_handlers_is_noop() {
        let bus = EventBus::new();
        assert!(bus.publish(setup_start()).is_ok());
        assert!(!bus.has_spectators());
    }

    #[test]
    fn test_subscribe_without_kinds_is_rejected() {
        let bus = EventBus::new();
        let err = bus.subscribe(&[], |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::InvalidHandler));
    }

    #[test]
    fn test_multi_kind_subscription() {
        let bus = EventBus::new();
        let (log, make) = recorder();

        let kinds = EventKind::parse_list("setup:start setup:end").unwrap();
        let h = make("x");
        bus.subscribe(&kinds, move |e| h(e)).unwrap();
        bus.publish(setup_start()).unwrap();
        bus.publish(Event::SetupEnd { page: "p".into() }).unwrap();

        assert_eq!(*log.lock(), vec!["x:setup:start", "x:setup:end"]);
    }

    #[test]
    fn test_once_fires_exactly_once_across_kinds() {
        let bus = EventBus::new();
        let (log, make) = recorder();

        let h = make("once");
        bus.once(&[EventKind::SetupStart, EventKind::SetupEnd], move |e| h(e))
            .unwrap();

        bus.publish(setup_start()).unwrap();
        bus.publish(setup_start()).unwrap();
        bus.publish(Event::SetupEnd { page: "p".into() }).unwrap();

        assert_eq!(*log.lock(), vec!["once:setup:start"]);
        assert_eq!(bus.handler_count(EventKind::SetupEnd), 0);
    }

    #[test]
    fn test_once_survives_reentrant_publish() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicU64::new(0));

        let inner_bus = Arc::downgrade(&bus);
        let counter = count.clone();
        bus.once(&[EventKind::SetupStart], move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(bus) = inner_bus.upgrade() {
                bus.publish(event.clone())?;
            }
            Ok(())
        })
        .unwrap();

        bus.publish(setup_start()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_single_handler() {
        let bus = EventBus::new();
        let (log, make) = recorder();

        let a = make("a");
        let b = make("b");
        let id = bus.subscribe(&[EventKind::SetupStart], move |e| a(e)).unwrap();
        bus.subscribe(&[EventKind::SetupStart], move |e| b(e)).unwrap();

        bus.unsubscribe(&[EventKind::SetupStart], Some(id));
        bus.publish(setup_start()).unwrap();

        assert_eq!(*log.lock(), vec!["b:setup:start"]);
    }

    #[test]
    fn test_unsubscribe_once_handler_before_it_fires() {
        let bus = EventBus::new();
        let (log, make) = recorder();

        let h = make("once");
        let id = bus.once(&[EventKind::SetupStart], move |e| h(e)).unwrap();
        bus.unsubscribe(&[EventKind::SetupStart], Some(id));
        bus.publish(setup_start()).unwrap();

        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_unsubscribe_all_for_kind() {
        let bus = EventBus::new();
        bus.subscribe(&[EventKind::SetupStart, EventKind::SetupEnd], |_| Ok(()))
            .unwrap();
        bus.subscribe(&[EventKind::SetupStart], |_| Ok(())).unwrap();

        bus.unsubscribe(&[EventKind::SetupStart], None);

        assert_eq!(bus.handler_count(EventKind::SetupStart), 0);
        assert_eq!(bus.handler_count(EventKind::SetupEnd), 1);
    }

    #[test]
    fn test_failing_handler_does_not_skip_later_handlers() {
        let bus = EventBus::new();
        let (log, make) = recorder();

        bus.subscribe(&[EventKind::AssertSuccess], |_| anyhow::bail!("first"))
            .unwrap();
        let h = make("after");
        bus.subscribe(&[EventKind::AssertSuccess], move |e| h(e)).unwrap();

        let err = bus
            .publish(Event::AssertSuccess(Assertion {
                description: "d".into(),
                expected: "1".into(),
                actual: "1".into(),
            }))
            .unwrap_err();

        assert!(matches!(err, Error::Handler { event: EventKind::AssertSuccess, .. }));
        assert_eq!(*log.lock(), vec!["after:assert:success"]);
    }
}
