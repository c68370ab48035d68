//! The document-like host surface.
//!
//! A Rust process has no ambient `document` global, so anything that
//! behaves like one (a webview bridge, an embedded browser shell, a
//! test double) is passed in explicitly. All capability probing
//! happens once, at construction; components keep the resolved
//! strategy and never touch the host again except to read the flags
//! it told them about.

use std::sync::Arc;

/// Callback registered for a named host signal.
pub type SignalHandler = Arc<dyn Fn() + Send + Sync>;

/// Millisecond-class monotonic timer resolved from the host.
pub type TimerFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// A document-like host object bridging page capabilities into the
/// library.
///
/// Every method has a graceful "not defined" answer; hosts only
/// surface what they genuinely have. Signal handlers are invoked on
/// whatever thread delivers the host signal; the monitor's lifecycle
/// handler spawns timer tasks, so signals must be delivered from
/// within a Tokio runtime context.
pub trait PageHost: Send + Sync {
    /// Read a named boolean property. `None` means the host does not
    /// define it, which is different from `Some(false)`.
    fn flag(&self, name: &str) -> Option<bool>;

    /// Register `handler` for the named change signal. Hosts without
    /// that signal may ignore the call.
    fn subscribe(&self, signal: &str, handler: SignalHandler);

    /// A monotonic millisecond timer exposed by the page, if any.
    /// Used as the middle clock tier when no native timer exists.
    fn performance_timer(&self) -> Option<TimerFn> {
        None
    }
}

// ─── Test double ─────────────────────────────────────────────────
