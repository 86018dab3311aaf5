//! Listener Registry
//!
//! Per-kind listener lists. Emission works on a snapshot, so listeners may
//! subscribe or unsubscribe from inside a callback, and each call is isolated
//! so a panicking listener does not stop the others.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::messages::{ChannelEvent, EventKind};

/// Callback invoked for each matching event
pub type Listener = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Handle returned by `subscribe`, used to remove that one listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: ListenerId,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription { kind, id }
    }

    /// Remove one listener; `false` if it was already gone
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(&subscription.kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        let removed = list.len() != before;

        if list.is_empty() {
            listeners.remove(&subscription.kind);
        }
        removed
    }

    /// Remove every listener of `kind`
    pub fn unsubscribe_all(&self, kind: EventKind) {
        self.listeners.write().remove(&kind);
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver `event` to its listeners; returns how many returned normally
    pub fn emit(&self, event: &ChannelEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Listener> = match self.listeners.read().get(&kind) {
            Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        kind = ?kind,
                        panic = %panic_message(payload.as_ref()),
                        "Alarm listener panicked"
                    );
                }
            }
        }
        delivered
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&ChannelEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move |_: &ChannelEvent| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_only_to_matching_kind() {
        let registry = ListenerRegistry::new();
        let (connected, on_connected) = counter();
        let (errors, on_error) = counter();
        registry.subscribe(EventKind::Connected, on_connected);
        registry.subscribe(EventKind::Error, on_error);

        assert_eq!(registry.emit(&ChannelEvent::Connected), 1);

        assert_eq!(connected.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ListenerRegistry::new();
        let (before, first) = counter();
        let (after, last) = counter();
        registry.subscribe(EventKind::GaveUp, first);
        registry.subscribe(EventKind::GaveUp, |_| panic!("listener bug"));
        registry.subscribe(EventKind::GaveUp, last);

        let delivered = registry.emit(&ChannelEvent::GaveUp { attempts: 3 });

        assert_eq!(delivered, 2);
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_one_and_all() {
        let registry = ListenerRegistry::new();
        let (count, listener) = counter();
        let listener = Arc::new(listener);

        let a = {
            let l = listener.clone();
            registry.subscribe(EventKind::Connected, move |e| l(e))
        };
        let _b = {
            let l = listener.clone();
            registry.subscribe(EventKind::Connected, move |e| l(e))
        };

        assert!(registry.unsubscribe(a));
        assert!(!registry.unsubscribe(a));
        registry.emit(&ChannelEvent::Connected);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        registry.unsubscribe_all(EventKind::Connected);
        assert_eq!(registry.count(EventKind::Connected), 0);
        assert_eq!(registry.emit(&ChannelEvent::Connected), 0);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_emit() {
        let registry = Arc::new(ListenerRegistry::new());
        let handle = registry.clone();
        registry.subscribe(EventKind::Connected, move |_| {
            handle.unsubscribe_all(EventKind::Connected);
        });

        assert_eq!(registry.emit(&ChannelEvent::Connected), 1);
        assert_eq!(registry.count(EventKind::Connected), 0);
    }
}
