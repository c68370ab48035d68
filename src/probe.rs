//! Probe selection.
//!
//! A probe is the operation whose completion latency the monitor
//! measures. Custom probes can be anything that eventually resolves
//! (a network ping, a channel echo); the defaults below measure the
//! scheduler itself.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

/// The injectable operation measured by the monitor. Called once per
/// check; the returned future's resolution marks the round trip.
pub type Probe = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// The default probe: yield to the scheduler and complete when the
/// task is next polled. It runs ahead of the timer wheel, right after
/// already-pending work, so the measured delta is pure scheduling
/// delay.
pub fn default_probe() -> Probe {
    Arc::new(|| Box::pin(tokio::task::yield_now()))
}

/// Zero-delay timer probe, the alternative for schedulers without a
/// yield tier: completes on the next timer pass, which also waits out
/// whatever else is queued ahead of it.
pub fn zero_delay_probe() -> Probe {
    Arc::new(|| Box::pin(tokio::time::sleep(Duration::ZERO)))
}
