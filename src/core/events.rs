//! Typed publish/subscribe for runtime events.
//!
//! Three channels: `ready` (initial snapshot loaded), `update` (cached map
//! changed, carrying the new map) and `error` (a fetch or push failure).
//! Registering returns a [`Subscription`] that removes the listener again.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::error::FlagwiseError;
use crate::types::FlagSnapshot;

/// Called once the runtime is ready.
pub type ReadyListener = Arc<dyn Fn() + Send + Sync>;
/// Called with the new snapshot after every change.
pub type UpdateListener = Arc<dyn Fn(&FlagSnapshot) + Send + Sync>;
/// Called with each fetch or push failure.
pub type ErrorListener = Arc<dyn Fn(&FlagwiseError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventChannel {
    Ready,
    Update,
    Error,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    ready: Mutex<Vec<(u64, ReadyListener)>>,
    update: Mutex<Vec<(u64, UpdateListener)>>,
    error: Mutex<Vec<(u64, ErrorListener)>>,
}

impl Registry {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn remove(&self, channel: EventChannel, id: u64) -> bool {
        fn remove_from<T>(listeners: &Mutex<Vec<(u64, T)>>, id: u64) -> bool {
            let mut listeners = listeners.lock();
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            listeners.len() != before
        }

        match channel {
            EventChannel::Ready => remove_from(&self.ready, id),
            EventChannel::Update => remove_from(&self.update, id),
            EventChannel::Error => remove_from(&self.error, id),
        }
    }
}

/// Handle returned by every registration.
#[must_use = "dropping a Subscription keeps the listener registered"]
pub struct Subscription {
    id: u64,
    channel: EventChannel,
    registry: Weak<Registry>,
}

impl Subscription {
    /// The channel this subscription listens on.
    pub fn channel(&self) -> EventChannel {
        self.channel
    }

    /// Removes the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.remove(self.channel, self.id))
            .unwrap_or(false)
    }
}

#[derive(Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `ready` listener.
    pub fn on_ready(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.registry.next_id();
        self.registry.ready.lock().push((id, Arc::new(listener)));
        self.subscription(EventChannel::Ready, id)
    }

    /// Register an `update` listener.
    pub fn on_update(
        &self,
        listener: impl Fn(&FlagSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.registry.next_id();
        self.registry.update.lock().push((id, Arc::new(listener)));
        self.subscription(EventChannel::Update, id)
    }

    /// Register an `error` listener.
    pub fn on_error(
        &self,
        listener: impl Fn(&FlagwiseError) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.registry.next_id();
        self.registry.error.lock().push((id, Arc::new(listener)));
        self.subscription(EventChannel::Error, id)
    }

    // Listeners run outside the registry lock so they may (un)subscribe.

    /// Notify `ready` listeners.
    pub fn emit_ready(&self) {
        let listeners: Vec<ReadyListener> =
            self.registry.ready.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener();
        }
    }

    /// Notify `update` listeners.
    pub fn emit_update(&self, snapshot: &FlagSnapshot) {
        let listeners: Vec<UpdateListener> =
            self.registry.update.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    /// Notify `error` listeners.
    pub fn emit_error(&self, error: &FlagwiseError) {
        let listeners: Vec<ErrorListener> =
            self.registry.error.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(error);
        }
    }

    /// Number of listeners on `channel`.
    pub fn listener_count(&self, channel: EventChannel) -> usize {
        match channel {
            EventChannel::Ready => self.registry.ready.lock().len(),
            EventChannel::Update => self.registry.update.lock().len(),
            EventChannel::Error => self.registry.error.lock().len(),
        }
    }

    /// Drops every listener on every channel.
    pub fn clear(&self) {
        self.registry.ready.lock().clear();
        self.registry.update.lock().clear();
        self.registry.error.lock().clear();
    }

    fn subscription(&self, channel: EventChannel, id: u64) -> Subscription {
        Subscription {
            id,
            channel,
            registry: Arc::downgrade(&self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_only_its_channel() {
        let bus = EventBus::new();
        let ready = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));

        let r = Arc::clone(&ready);
        let _ready_sub = bus.on_ready(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        let e = Arc::clone(&errors);
        let _error_sub = bus.on_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_ready();
        bus.emit_update(&FlagSnapshot::new());

        assert_eq!(ready.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);

        bus.emit_error(&FlagwiseError::new(ErrorCode::NetworkError, "down"));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = bus.on_update(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_update(&FlagSnapshot::new());
        assert!(sub.unsubscribe());
        bus.emit_update(&FlagSnapshot::new());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(EventChannel::Update), 0);
    }

    #[test]
    fn test_unsubscribe_after_clear() {
        let bus = EventBus::new();
        let sub = bus.on_ready(|| {});
        bus.clear();
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_listener_may_unsubscribe_during_emit() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let s = Arc::clone(&slot);
        let sub = bus.on_ready(move || {
            if let Some(sub) = s.lock().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        bus.emit_ready();
        assert_eq!(bus.listener_count(EventChannel::Ready), 0);
    }
}
