use serde::Serialize;

use crate::clock::Timestamp;

// ─── Window ──────────────────────────────────────────────────────

/// Running totals for the in-progress sampling window.
/// This is the "write" side: probe completions fold into it, a flush
/// drains it into a [`Summary`] and starts over.
#[derive(Debug)]
pub(crate) struct Window {
    /// Clock reading taken when the window was opened.
    pub start: Timestamp,
    /// Completed probes so far.
    pub events: u64,
    /// Fastest round-trip seen (ms). Starts at `+∞` so the first
    /// observation always replaces it.
    pub min_ms: f64,
    /// Slowest round-trip seen (ms). Starts at `−∞`, same reason.
    pub max_ms: f64,
    /// Sum of all round-trips (ms), for the mean.
    pub total_ms: f64,
}

impl Window {
    pub fn new(start: Timestamp) -> Self {
        Self {
            start,
            events: 0,
            min_ms: f64::INFINITY,
            max_ms: f64::NEG_INFINITY,
            total_ms: 0.0,
        }
    }

    /// Fold one completed probe round-trip into the window.
    pub fn record(&mut self, delta_ms: f64) {
        self.events += 1;
        self.min_ms = self.min_ms.min(delta_ms);
        self.max_ms = self.max_ms.max(delta_ms);
        self.total_ms += delta_ms;
    }

    /// Snapshot the window into a summary spanning `length_ms` of
    /// clock time. Does not reset the window; the caller owns that.
    pub fn summarize(&self, length_ms: f64) -> Summary {
        Summary {
            events: self.events,
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            avg_ms: if self.events > 0 {
                self.total_ms / self.events as f64
            } else {
                f64::INFINITY
            },
            length_ms,
        }
    }
}

// ─── Summary ─────────────────────────────────────────────────────

/// Point-in-time snapshot of a flushed window. Never mutated after
/// creation.
///
/// Serializes with camelCase keys, so the wire form is
/// `{"events", "minMs", "maxMs", "avgMs", "lengthMs"}`. Note that
/// JSON has no infinity: an empty summary's `avgMs`/`minMs` become
/// `null` under `serde_json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// How many probes completed inside the window.
    pub events: u64,
    /// Fastest observed round-trip (ms); `+∞` when `events == 0`.
    pub min_ms: f64,
    /// Slowest observed round-trip (ms); `−∞` when `events == 0`.
    pub max_ms: f64,
    /// Mean round-trip (ms); `+∞` when `events == 0`. The infinity is
    /// a "no data" sentinel, not an absence type: it stays a number,
    /// so it sorts and thresholds correctly where a null would not.
    pub avg_ms: f64,
    /// Clock time the window actually spanned (ms). Under scheduling
    /// delay this can exceed the configured emit interval.
    pub length_ms: f64,
}

impl Summary {
    /// Convenience: did at least one probe complete in this window?
    pub fn has_data(&self) -> bool {
        self.events > 0
    }
}

// ─── Tests ───────────────────────────────────────────────────────
