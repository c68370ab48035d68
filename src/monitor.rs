//! The monitor itself: timer lifecycle, probe scheduling, window
//! accumulation, summary emission.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::events::{ListenerHandle, Listeners};
use crate::host::PageHost;
use crate::probe::{default_probe, Probe};
use crate::visibility::VisibilityChangeEmitter;
use crate::window::{Summary, Window};

// ─── Configuration ───────────────────────────────────────────────

/// Probe frequency used when the config leaves it unset (or zero).
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Summary frequency used when the config leaves it at its default.
pub const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_secs(5);

/// Construction options for [`LatencyMonitor`]. Every field has a
/// usable default, so struct update syntax is the expected idiom:
///
/// ```ignore
/// let monitor = LatencyMonitor::new(MonitorConfig {
///     check_interval: Duration::from_millis(100),
///     ..Default::default()
/// });
/// ```
pub struct MonitorConfig {
    /// How often to issue a probe. `Duration::ZERO` is treated as
    /// unset and coerced to [`DEFAULT_CHECK_INTERVAL`].
    pub check_interval: Duration,
    /// How often to flush and emit a summary to `data` listeners.
    /// `None` (or a zero duration) disables periodic emission; poll
    /// [`LatencyMonitor::get_summary`] instead.
    pub emit_interval: Option<Duration>,
    /// The operation to measure. Defaults to the scheduler yield probe
    /// from [`default_probe`].
    pub probe: Option<Probe>,
    /// Document-like host supplying page timers and visibility
    /// signals. Plain processes leave this `None`.
    pub page_host: Option<Arc<dyn PageHost>>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            emit_interval: Some(DEFAULT_EMIT_INTERVAL),
            probe: None,
            page_host: None,
        }
    }
}

// ─── Monitor ─────────────────────────────────────────────────────

/// Periodically measures how long an async probe takes to come back,
/// aggregating the round trips into windowed [`Summary`] snapshots.
///
/// The default probe times the scheduler itself: it yields and clocks
/// how long the runtime takes to poll it again, which makes the
/// summaries a direct read on event-loop health. Supply a custom
/// probe to measure any other round trip, e.g. a network ping.
///
/// Probes are issued on a fixed interval with no in-flight guard:
/// when one is slower than the check interval, the next one starts
/// anyway and the two overlap. Each sample lands in whichever window
/// is current when its probe completes, so `events` counts
/// completions, not disjoint spans of wall time. A probe that never
/// completes contributes nothing; there is no timeout.
///
/// With a page host configured, sampling pauses while the page is
/// hidden and resumes when it returns to the foreground. The pause
/// flushes once so a stale window never bleeds into the next visible
/// period.
///
/// The timers are background tasks holding only weak references: they
/// never keep the process alive on their own, and dropping the
/// monitor shuts them down.
pub struct LatencyMonitor {
    inner: Arc<Inner>,
    visibility: VisibilityChangeEmitter,
}

/// State shared with the timer tasks.
struct Inner {
    clock: Clock,
    probe: Probe,
    check_interval: Duration,
    emit_interval: Option<Duration>,
    window: Mutex<Window>,
    listeners: Listeners<Summary>,
    /// `Some` while sampling, `None` while paused.
    timers: Mutex<Option<TimerTasks>>,
}

struct TimerTasks {
    check: JoinHandle<()>,
    emit: Option<JoinHandle<()>>,
}

impl TimerTasks {
    fn abort(self) {
        self.check.abort();
        if let Some(emit) = self.emit {
            emit.abort();
        }
    }
}

impl LatencyMonitor {
    /// Build a monitor and start sampling. If the page host reports
    /// hidden at construction, sampling instead waits for the first
    /// visibility resume.
    ///
    /// Must be called within a Tokio runtime; the timers are spawned
    /// here. Likewise, a page host must deliver its signals from
    /// within a runtime context, since a resume restarts the timers.
    pub fn new(config: MonitorConfig) -> Self {
        // Zero means "unset" for the check interval and "disabled"
        // for the emit interval.
        let check_interval = if config.check_interval.is_zero() {
            DEFAULT_CHECK_INTERVAL
        } else {
            config.check_interval
        };
        let emit_interval = config.emit_interval.filter(|every| !every.is_zero());

        debug!(?check_interval, ?emit_interval, "configuring latency monitor");
        match emit_interval {
            Some(every) => debug!(
                probes_per_summary = every.as_secs_f64() / check_interval.as_secs_f64(),
                "emitting summaries periodically"
            ),
            None => debug!("periodic emission disabled, summaries by pull only"),
        }

        let clock = Clock::detect(config.page_host.as_ref());
        let probe = config.probe.unwrap_or_else(default_probe);

        let inner = Arc::new(Inner {
            window: Mutex::new(Window::new(clock.now())),
            clock,
            probe,
            check_interval,
            emit_interval,
            listeners: Listeners::new(),
            timers: Mutex::new(None),
        });

        let visibility = VisibilityChangeEmitter::new(config.page_host);
        let weak = Arc::downgrade(&inner);
        visibility.on_visibility_change(move |visible: &bool| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if *visible {
                Inner::resume(&inner);
            } else {
                inner.pause();
            }
        });

        if visibility.is_visible() {
            Inner::resume(&inner);
        } else {
            debug!("page hidden at construction, waiting for a resume signal");
        }

        Self { inner, visibility }
    }

    /// Flush the current window into a [`Summary`] and start a fresh
    /// one.
    ///
    /// This is the pull API, callable at any time; the periodic emit
    /// timer goes through the same flush. Every call resets
    /// accumulation, so polling this while periodic emission is
    /// enabled splits the samples between the two consumers and both
    /// undercount. Pick one style per monitor.
    pub fn get_summary(&self) -> Summary {
        self.inner.flush()
    }

    /// Subscribe to summary emission: once per emit interval
    /// (zero-event summaries included, with `avg_ms == +∞`), plus
    /// once on each visibility pause when the window has data.
    pub fn on_data(&self, listener: impl Fn(&Summary) + Send + Sync + 'static) -> ListenerHandle {
        self.inner.listeners.subscribe(listener)
    }

    /// Drop a `data` subscription. Returns `false` when the handle
    /// was already removed.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.inner.listeners.unsubscribe(handle)
    }

    /// The probe interval actually in effect after coercion.
    pub fn check_interval(&self) -> Duration {
        self.inner.check_interval
    }

    /// The emit interval actually in effect; `None` when periodic
    /// emission is disabled.
    pub fn emit_interval(&self) -> Option<Duration> {
        self.inner.emit_interval
    }

    /// Whether the hosting page is currently visible. Always `true`
    /// without a page host.
    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }
}

impl Drop for LatencyMonitor {
    fn drop(&mut self) {
        // The tasks hold the state weakly and would exit on their
        // next tick anyway; aborting makes shutdown prompt.
        if let Some(tasks) = self.inner.timers.lock().take() {
            tasks.abort();
        }
    }
}

// ─── Timer lifecycle and measurement ─────────────────────────────

impl Inner {
    /// Drain the window into a summary and open the next one.
    fn flush(&self) -> Summary {
        let summary = {
            let mut window = self.window.lock();
            let summary = window.summarize(self.clock.delta_ms(window.start));
            *window = Window::new(self.clock.now());
            summary
        };
        debug!(
            events = summary.events,
            avg_ms = summary.avg_ms,
            length_ms = summary.length_ms,
            "window flushed"
        );
        summary
    }

    /// Issue one probe. The measurement runs as its own task, so a
    /// slow probe delays nothing and overlaps freely with later ones.
    fn check_latency(this: &Arc<Self>) {
        let start = this.clock.now();
        let round_trip = (this.probe)();
        let weak = Arc::downgrade(this);
        tokio::spawn(async move {
            round_trip.await;
            // The monitor may have paused or dropped in the meantime;
            // whatever window is current absorbs the sample.
            if let Some(inner) = weak.upgrade() {
                let delta_ms = inner.clock.delta_ms(start);
                inner.window.lock().record(delta_ms);
                trace!(delta_ms, "probe completed");
            }
        });
    }

    /// Start both timers from a fresh window. A no-op while running.
    fn resume(this: &Arc<Self>) {
        let mut timers = this.timers.lock();
        if timers.is_some() {
            return;
        }
        debug!("sampling resumed");
        // Fresh window: time spent paused must not count toward a
        // summary's length.
        *this.window.lock() = Window::new(this.clock.now());
        *timers = Some(TimerTasks {
            check: Self::spawn_check_timer(this),
            emit: this
                .emit_interval
                .map(|every| Self::spawn_emit_timer(this, every)),
        });
    }

    /// Stop the timers and flush once so nothing stale bleeds into
    /// the next visible period. A no-op while already paused. The
    /// forced flush is only emitted when it carries data.
    fn pause(&self) {
        let tasks = self.timers.lock().take();
        let Some(tasks) = tasks else {
            return;
        };
        tasks.abort();
        debug!("sampling paused");
        let summary = self.flush();
        if summary.has_data() {
            self.listeners.emit(&summary);
        }
    }

    /// Probe on every tick, starting immediately.
    fn spawn_check_timer(this: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(this);
        let every = this.check_interval;
        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval(every));
            while ticks.next().await.is_some() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Inner::check_latency(&inner);
            }
        })
    }

    /// Flush and emit on every tick, starting after one full period.
    /// Periodic summaries go out even with zero events; subscribers
    /// see the infinity sentinel and decide for themselves.
    fn spawn_emit_timer(this: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(this);
        tokio::spawn(async move {
            let first = tokio::time::Instant::now() + every;
            let mut ticks = IntervalStream::new(tokio::time::interval_at(first, every));
            while ticks.next().await.is_some() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let summary = inner.flush();
                inner.listeners.emit(&summary);
            }
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────
