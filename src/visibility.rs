//! Page visibility as a clean event stream.
//!
//! Browsers shipped the page-visibility flag under four different
//! names over the years. This module resolves the naming variant once
//! at construction, tracks one boolean of state, and notifies
//! listeners only on real transitions, so downstream pause/resume
//! logic never churns on redundant host signals.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::events::{ListenerHandle, Listeners};
use crate::host::PageHost;

/// The hidden-flag / change-signal naming variants, tried in order.
/// The unprefixed pair wins on any current host; the others are the
/// legacy vendor prefixes.
const VARIANTS: [(&str, &str); 4] = [
    ("hidden", "visibilitychange"),
    ("mozHidden", "mozvisibilitychange"),
    ("msHidden", "msvisibilitychange"),
    ("webkitHidden", "webkitvisibilitychange"),
];

// ─── Emitter ─────────────────────────────────────────────────────

/// Two-state machine over a host's visibility: `Visible` or `Hidden`,
/// with a notification on each transition.
///
/// The initial state is read synchronously from the first hidden-flag
/// variant the host defines, and the change signal is registered under
/// the matching event name. A host signal that does not actually flip
/// the flag is filtered out. Without a host (or with one that defines
/// no variant) the emitter is inert: permanently visible, no events.
pub struct VisibilityChangeEmitter {
    shared: Arc<Shared>,
}

struct Shared {
    listeners: Listeners<bool>,
    /// `None` on an inert emitter.
    resolved: Option<Resolved>,
}

/// The naming variant the host answered to, fixed at construction.
/// Change signals re-read the same flag; the variants are never
/// probed again.
struct Resolved {
    host: Arc<dyn PageHost>,
    hidden_name: &'static str,
    visible: Mutex<bool>,
}

impl VisibilityChangeEmitter {
    pub fn new(host: Option<Arc<dyn PageHost>>) -> Self {
        let Some(host) = host else {
            debug!("no document-like host, reporting permanently visible");
            return Self::inert();
        };

        let Some((hidden_name, signal_name, hidden)) = resolve_variant(host.as_ref()) else {
            debug!("host defines no hidden flag, reporting permanently visible");
            return Self::inert();
        };

        debug!(hidden_name, signal_name, hidden, "tracking page visibility");
        let shared = Arc::new(Shared {
            listeners: Listeners::new(),
            resolved: Some(Resolved {
                host: host.clone(),
                hidden_name,
                visible: Mutex::new(!hidden),
            }),
        });

        // The handler holds the state weakly: once the emitter is
        // dropped, stray host signals fall through to nothing.
        let weak = Arc::downgrade(&shared);
        host.subscribe(
            signal_name,
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_signal();
                }
            }),
        );

        Self { shared }
    }

    fn inert() -> Self {
        Self {
            shared: Arc::new(Shared {
                listeners: Listeners::new(),
                resolved: None,
            }),
        }
    }

    /// Current visibility. An inert emitter always answers `true`.
    pub fn is_visible(&self) -> bool {
        match &self.shared.resolved {
            Some(resolved) => *resolved.visible.lock(),
            None => true,
        }
    }

    /// Subscribe to visibility transitions. The payload is the new
    /// state: `true` when the page came back into focus.
    pub fn on_visibility_change(
        &self,
        listener: impl Fn(&bool) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.listeners.subscribe(listener)
    }

    /// Drop a subscription. Returns `false` when the handle was
    /// already removed.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.shared.listeners.unsubscribe(handle)
    }
}

impl Shared {
    /// Recompute visibility from the same flag the initial read
    /// resolved to, and emit only when the state actually flipped.
    /// Hosts are free to fire redundant signals, and some do.
    fn handle_signal(&self) {
        let Some(resolved) = &self.resolved else {
            return;
        };
        // A flag the host no longer defines reads as not hidden.
        let now_visible = !resolved.host.flag(resolved.hidden_name).unwrap_or(false);

        let changed = {
            let mut visible = resolved.visible.lock();
            let changed = *visible != now_visible;
            *visible = now_visible;
            changed
        };
        if changed {
            debug!(visible = now_visible, "page visibility changed");
            self.listeners.emit(&now_visible);
        }
    }
}

fn resolve_variant(host: &dyn PageHost) -> Option<(&'static str, &'static str, bool)> {
    VARIANTS.iter().find_map(|&(hidden_name, signal_name)| {
        host.flag(hidden_name)
            .map(|hidden| (hidden_name, signal_name, hidden))
    })
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::{EmptyPage, FakePage};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn as_host(page: &Arc<FakePage>) -> Option<Arc<dyn PageHost>> {
        let host: Arc<dyn PageHost> = page.clone();
        Some(host)
    }

    #[test]
    fn every_naming_variant_resolves_consistently() {
        for (hidden_name, signal_name) in VARIANTS {
            let page = FakePage::new(hidden_name, true);
            let emitter = VisibilityChangeEmitter::new(as_host(&page));

            assert!(
                !emitter.is_visible(),
                "{hidden_name}: hidden at construction must read as not visible"
            );
            assert_eq!(
                page.registered_signals(),
                vec![signal_name.to_owned()],
                "{hidden_name}: change signal must use the matching event name"
            );

            // The change handler re-reads the flag the initial read
            // resolved to.
            page.set_hidden(false);
            page.fire(signal_name);
            assert!(emitter.is_visible(), "{hidden_name}: flip to visible");
        }
    }

    #[test]
    fn redundant_signals_do_not_emit() {
        let page = FakePage::new("hidden", false);
        let emitter = VisibilityChangeEmitter::new(as_host(&page));

        let calls = Arc::new(AtomicU64::new(0));
        {
            let calls = calls.clone();
            emitter.on_visibility_change(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        // Signal fires but the flag did not move.
        page.fire("visibilitychange");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        page.set_hidden(true);
        page.fire("visibilitychange");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Repeating the same state is filtered too.
        page.fire("visibilitychange");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transitions_carry_the_new_state() {
        let page = FakePage::new("hidden", false);
        let emitter = VisibilityChangeEmitter::new(as_host(&page));

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            emitter.on_visibility_change(move |visible| seen.lock().push(*visible));
        }

        page.set_hidden(true);
        page.fire("visibilitychange");
        page.set_hidden(false);
        page.fire("visibilitychange");

        assert_eq!(*seen.lock(), vec![false, true]);
        assert!(emitter.is_visible());
    }

    #[test]
    fn removed_listener_misses_later_transitions() {
        let page = FakePage::new("hidden", false);
        let emitter = VisibilityChangeEmitter::new(as_host(&page));

        let calls = Arc::new(AtomicU64::new(0));
        let handle = {
            let calls = calls.clone();
            emitter.on_visibility_change(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        page.set_hidden(true);
        page.fire("visibilitychange");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(emitter.remove_listener(handle));
        page.set_hidden(false);
        page.fire("visibilitychange");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_host_reports_permanently_visible() {
        let emitter = VisibilityChangeEmitter::new(None);
        assert!(emitter.is_visible());
    }

    #[test]
    fn host_without_any_hidden_flag_is_inert() {
        let host: Arc<dyn PageHost> = Arc::new(EmptyPage);
        let emitter = VisibilityChangeEmitter::new(Some(host));
        assert!(emitter.is_visible());
    }

    #[test]
    fn state_only_moves_on_signals() {
        let page = FakePage::new("hidden", false);
        let emitter = VisibilityChangeEmitter::new(as_host(&page));

        // Flipping the flag without the signal changes nothing; the
        // emitter owns its state and only the signal updates it.
        page.set_hidden(true);
        assert!(emitter.is_visible());

        page.fire("visibilitychange");
        assert!(!emitter.is_visible());
    }
}
