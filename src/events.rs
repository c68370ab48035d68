//! Minimal publish/subscribe plumbing.
//!
//! The monitor and the visibility emitter each expose exactly one
//! event, so this is a typed per-event registry rather than a general
//! emitter base class: subscribe returns a handle, unsubscribe takes
//! it back, emit delivers to every current subscriber.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Token returned by a subscribe call; pass it back to unsubscribe.
/// Handles are unique across all registries in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registry of listeners for a single event type.
pub(crate) struct Listeners<T> {
    entries: Mutex<Vec<(ListenerHandle, Callback<T>)>>,
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerHandle {
        let handle = ListenerHandle(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((handle, Arc::new(callback)));
        handle
    }

    /// Returns `false` when the handle was already removed (or never
    /// belonged to this registry).
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(h, _)| *h != handle);
        entries.len() != before
    }

    /// Deliver `value` to every current subscriber.
    ///
    /// The callback list is cloned out of the lock first, so listeners
    /// may re-enter the registry (subscribe, unsubscribe) without
    /// deadlocking. A listener added during delivery sees the next
    /// emit, not this one.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> =
            self.entries.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(value);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_every_subscriber_in_order() {
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = seen.clone();
            listeners.subscribe(move |value: &u32| seen.lock().push((tag, *value)));
        }

        listeners.emit(&7);
        assert_eq!(*seen.lock(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn emit_with_no_subscribers_is_a_no_op() {
        let listeners: Listeners<u32> = Listeners::new();
        listeners.emit(&1);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_reports_double_removal() {
        let listeners: Listeners<u32> = Listeners::new();
        let count = Arc::new(AtomicU64::new(0));

        let handle = {
            let count = count.clone();
            listeners.subscribe(move |_: &u32| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        listeners.emit(&1);
        assert!(listeners.unsubscribe(handle));
        listeners.emit(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!listeners.unsubscribe(handle));
    }

    #[test]
    fn handles_are_unique_across_registries() {
        let first: Listeners<u32> = Listeners::new();
        let second: Listeners<u32> = Listeners::new();

        let handle = first.subscribe(|_| {});
        // A handle from one registry never matches another registry.
        assert!(!second.unsubscribe(handle));
        assert!(first.unsubscribe(handle));
    }

    #[test]
    fn subscribing_from_inside_a_callback_does_not_deadlock() {
        let listeners: Arc<Listeners<u32>> = Arc::new(Listeners::new());
        let late_calls = Arc::new(AtomicU64::new(0));

        {
            let listeners = listeners.clone();
            let late_calls = late_calls.clone();
            let registered = AtomicU64::new(0);
            listeners.clone().subscribe(move |_: &u32| {
                if registered.fetch_add(1, Ordering::SeqCst) == 0 {
                    let late_calls = late_calls.clone();
                    listeners.subscribe(move |_: &u32| {
                        late_calls.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }

        // The listener registered mid-emit must only see later emits.
        listeners.emit(&1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        listeners.emit(&2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }
}
