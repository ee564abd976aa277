//! Subscription registry.
//!
//! Maps an event-type key to an ordered set of [`Listener`] handles.
//! Handle identity (the shared allocation) decides membership: registering
//! the same handle twice keeps one entry, and [`ListenerRegistry::remove`]
//! matches by identity rather than by behavior.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::StreamEvent;

type Callback = dyn Fn(&StreamEvent) + Send + Sync;

/// A registered callback. Clone the handle to unregister it later.
#[derive(Clone)]
pub struct Listener(Arc<Callback>);

impl Listener {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// A listener that forwards a clone of every event to a channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Self::new(move |event| {
            let _ = tx.send(event.clone());
        });
        (listener, rx)
    }

    /// Whether two handles refer to the same registration.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    pub(crate) fn call(&self, event: &StreamEvent) {
        (self.0)(event);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Listener sets keyed by event type, in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Vec<Listener>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `event_type`. Returns `false` if that
    /// handle was already registered for the type.
    pub fn add(&mut self, event_type: &str, listener: &Listener) -> bool {
        let set = self.listeners.entry(event_type.to_owned()).or_default();
        if set.iter().any(|l| l.same_as(listener)) {
            return false;
        }
        set.push(listener.clone());
        true
    }

    /// Unregister `listener` from `event_type`. Returns `false` if it was
    /// not registered.
    pub fn remove(&mut self, event_type: &str, listener: &Listener) -> bool {
        let Some(set) = self.listeners.get_mut(event_type) else {
            return false;
        };
        let before = set.len();
        set.retain(|l| !l.same_as(listener));
        let removed = set.len() < before;
        if set.is_empty() {
            let _ = self.listeners.remove(event_type);
        }
        removed
    }

    /// Snapshot of the listeners for `event_type`, in registration order.
    #[must_use]
    pub fn snapshot(&self, event_type: &str) -> Vec<Listener> {
        self.listeners.get(event_type).cloned().unwrap_or_default()
    }

    /// Number of listeners registered for `event_type`.
    #[must_use]
    pub fn count_for(&self, event_type: &str) -> usize {
        self.listeners.get(event_type).map_or(0, Vec::len)
    }

    /// Total number of registrations across all types.
    #[must_use]
    pub fn count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("types", &self.listeners.len())
            .field("listeners", &self.count())
            .finish()
    }
}
