use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::host::{PageHost, TimerFn};

// ─── Timestamp ───────────────────────────────────────────────────

/// An opaque clock reading. Only meaningful to the [`Clock`] that
/// produced it.
#[derive(Debug, Clone, Copy)]
pub enum Timestamp {
    /// Reading from the native high-resolution timer.
    Instant(Instant),
    /// Millisecond reading from a page timer or the wall clock.
    Millis(f64),
}

// ─── Clock ───────────────────────────────────────────────────────

/// Monotonic time source with graceful degradation.
///
/// One tier is selected by [`Clock::detect`] when the monitor is
/// constructed and stays fixed for the monitor's lifetime; nothing is
/// re-probed per call.
#[derive(Clone)]
pub enum Clock {
    /// `std::time::Instant`: nanosecond-class, monotonic, immune to
    /// wall-clock adjustment. The normal choice.
    Native,
    /// Millisecond-class monotonic timer resolved from a page-like
    /// host. Deltas are rounded to the nearest whole millisecond.
    Page(TimerFn),
    /// Wall-clock epoch milliseconds. Coarsest tier, and the only one
    /// that can go backwards if the system clock is adjusted.
    Wall,
}

impl Clock {
    /// Pick the best timer the environment offers, in priority order:
    /// native high-resolution, then a host page timer, then the wall
    /// clock. Runs once; callers hold the resolved tier.
    pub fn detect(host: Option<&Arc<dyn PageHost>>) -> Self {
        if native_timer_available() {
            debug!("timing with the native high-resolution timer");
            return Clock::Native;
        }
        if let Some(timer) = host.and_then(|h| h.performance_timer()) {
            debug!("timing with the host page timer");
            return Clock::Page(timer);
        }
        debug!("timing with the wall clock");
        Clock::Wall
    }

    /// Take a reading suitable for a later [`Clock::delta_ms`].
    pub fn now(&self) -> Timestamp {
        match self {
            Clock::Native => Timestamp::Instant(Instant::now()),
            Clock::Page(timer) => Timestamp::Millis(timer()),
            Clock::Wall => Timestamp::Millis(epoch_ms()),
        }
    }

    /// Milliseconds elapsed since `start`.
    ///
    /// Non-negative in normal operation. The wall tier can report a
    /// negative delta after a system clock adjustment; that is passed
    /// through unclamped rather than treated as an error.
    pub fn delta_ms(&self, start: Timestamp) -> f64 {
        match (self, start) {
            (Clock::Native, Timestamp::Instant(start)) => {
                start.elapsed().as_secs_f64() * 1000.0
            }
            (Clock::Page(timer), Timestamp::Millis(start)) => (timer() - start).round(),
            (Clock::Wall, Timestamp::Millis(start)) => epoch_ms() - start,
            // Reading from a different tier than this clock; there is
            // no meaningful delta to compute.
            _ => 0.0,
        }
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Clock::Native => "Clock::Native",
            Clock::Page(_) => "Clock::Page",
            Clock::Wall => "Clock::Wall",
        })
    }
}

// ─── Tier availability ───────────────────────────────────────────

/// `Instant::now` is unusable on bare wasm targets, which is exactly
/// the environment where a page timer exists instead.
#[cfg(not(target_family = "wasm"))]
fn native_timer_available() -> bool {
    true
}

#[cfg(target_family = "wasm")]
fn native_timer_available() -> bool {
    false
}

fn epoch_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

// ─── Tests ───────────────────────────────────────────────────────
