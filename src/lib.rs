//! Event-loop latency monitoring with windowed summaries.
//!
//! [`LatencyMonitor`] periodically injects a probe into the runtime
//! and times how long its completion takes to be observed. The round
//! trips accumulate into a rolling window that is flushed into
//! [`Summary`] snapshots — count, min, max, average, window length —
//! giving a cheap live read on scheduler starvation, CPU contention,
//! or stop-the-world pauses in a running process.
//!
//! The default probe measures the scheduler itself: how long a
//! yielded task waits to be polled again. Any other async round trip
//! can stand in for it via [`MonitorConfig::probe`].
//!
//! ```ignore
//! use latency_monitor::{LatencyMonitor, MonitorConfig};
//!
//! let monitor = LatencyMonitor::new(MonitorConfig::default());
//! monitor.on_data(|summary| {
//!     println!("scheduler latency: {summary:?}");
//! });
//! ```
//!
//! Embedders hosted in a page-like environment can pass a
//! [`PageHost`]; sampling then pauses while the page is hidden and
//! resumes when it returns to the foreground. Everything degrades
//! gracefully — a missing host, a missing high-resolution clock, or a
//! window with no samples are all normal states, never errors.
//!
//! Logging goes through [`tracing`]; the crate emits `debug` events
//! for lifecycle and summaries and `trace` events per sample, and
//! leaves subscriber setup to the embedder.

pub mod clock;
pub mod events;
pub mod host;
pub mod monitor;
pub mod probe;
pub mod visibility;
pub mod window;

pub use clock::{Clock, Timestamp};
pub use events::ListenerHandle;
pub use host::{PageHost, SignalHandler, TimerFn};
pub use monitor::{LatencyMonitor, MonitorConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_EMIT_INTERVAL};
pub use probe::{default_probe, zero_delay_probe, Probe};
pub use visibility::VisibilityChangeEmitter;
pub use window::Summary;
