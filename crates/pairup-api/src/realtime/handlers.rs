// Event-name → handler table.
//
// Handlers are compared by `Arc` pointer identity. Registration appends, so
// the same handler registered twice fires twice; `off` removes a single
// registration.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::error;

use super::frame::Payload;

/// Callback invoked with the payload of every frame of its event name.
pub type Handler = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Wrap a closure as a [`Handler`]. Keep the returned `Arc` to unsubscribe.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Payload) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: HashMap<String, Vec<Handler>>,
}

impl HandlerRegistry {
    pub(crate) fn on(&mut self, event: &str, handler: Handler) {
        self.handlers
            .entry(event.to_owned())
            .or_default()
            .push(handler);
    }

    /// Remove one registration of `handler`. Returns `false` if it was not
    /// registered for `event`.
    pub(crate) fn off(&mut self, event: &str, handler: &Handler) -> bool {
        let Some(list) = self.handlers.get_mut(event) else {
            return false;
        };
        let Some(index) = list.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            self.handlers.remove(event);
        }
        true
    }

    /// Handlers for `event` in subscription order, cloned so they can run
    /// without the registry locked.
    pub(crate) fn snapshot(&self, event: &str) -> Vec<Handler> {
        self.handlers.get(event).cloned().unwrap_or_default()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }
}

/// Run every handler in order. A panicking handler is logged and skipped;
/// the rest still run. Returns how many handlers panicked.
pub(crate) fn invoke_all(event: &str, handlers: &[Handler], payload: &Payload) -> usize {
    let mut failed = 0;
    for (index, handler) in handlers.iter().enumerate() {
        if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
            failed += 1;
            error!(event, index, "event handler panicked");
        }
    }
    failed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, Handler) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let h = handler(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, h)
    }

    #[test]
    fn duplicate_registration_fires_twice_until_one_off() {
        let mut registry = HandlerRegistry::default();
        let (hits, h) = counter();
        registry.on("message", Arc::clone(&h));
        registry.on("message", Arc::clone(&h));

        invoke_all("message", &registry.snapshot("message"), &Payload::new());
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(registry.off("message", &h));
        invoke_all("message", &registry.snapshot("message"), &Payload::new());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(registry.count("message"), 1);
    }

    #[test]
    fn off_matches_by_identity_only() {
        let mut registry = HandlerRegistry::default();
        let (_, a) = counter();
        let (_, b) = counter();
        registry.on("match_found", Arc::clone(&a));

        assert!(!registry.off("match_found", &b));
        assert!(!registry.off("other", &a));
        assert!(registry.off("match_found", &a));
        assert!(!registry.off("match_found", &a));
        assert_eq!(registry.count("match_found"), 0);
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::default();
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.on("x", handler(move |_| order.lock().unwrap().push(tag)));
        }
        invoke_all("x", &registry.snapshot("x"), &Payload::new());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_handler_does_not_block_the_rest() {
        let mut registry = HandlerRegistry::default();
        let (hits, good) = counter();
        registry.on("x", handler(|_| panic!("handler failure")));
        registry.on("x", good);

        let failed = invoke_all("x", &registry.snapshot("x"), &Payload::new());
        assert_eq!(failed, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_event_has_no_handlers() {
        let registry = HandlerRegistry::default();
        assert!(registry.snapshot("nobody-listens").is_empty());
    }
}
