//! Typed event bus with listener isolation.
//!
//! Observers register at construction time and are fanned out to on
//! every emit. A panicking listener is caught and logged; its siblings
//! always run. This replaces ad-hoc callback lists and runtime function
//! reassignment in earlier designs of the surrounding system.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{trace, warn};

use sentinel_core::SignalEvent;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&SignalEvent) + Send + Sync>;

/// Fan-out bus for audit events.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; returns a handle for `unsubscribe`.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SignalEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::AcqRel));
        self.inner.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.listeners.write().retain(|(lid, _)| *lid != id);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Deliver `event` to every listener.
    ///
    /// A panic in one listener is isolated and logged; remaining
    /// listeners still run.
    pub fn emit(&self, event: &SignalEvent) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        trace!(
            event_type = %event.event_type,
            listeners = listeners.len(),
            "emitting audit event"
        );

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(
                    event_type = %event.event_type,
                    "audit listener panicked; continuing with remaining listeners"
                );
            }
        }
    }
}
