#![forbid(unsafe_code)]

//! The single frame clock every time-based component subscribes to.
//!
//! The host calls [`FrameClock::tick`] once per display refresh (typically
//! from `requestAnimationFrame`) or [`FrameClock::tick_now`] to use the
//! clock's own monotonic time source. Each tick is delivered to every live
//! subscriber as a [`ClockTick`].
//!
//! # Ordering
//!
//! Subscribers are grouped by [`Phase`] and run phase by phase; within a
//! phase they run in subscription order. The orchestration layer picks the
//! phase, so the order never depends on which listener happened to
//! register first.
//!
//! # Invariants
//!
//! 1. Timestamps delivered to subscribers never decrease.
//! 2. `delta_ms` is clamped to `[0, max_delta_ms]`; the first tick after
//!    (re)start or [`FrameClock::resync`] has a delta of zero.
//! 3. Subscribe/unsubscribe are legal from inside a callback. The tick
//!    iterates a snapshot: new subscribers first run on the next tick,
//!    removed subscribers are skipped for the rest of the current one.
//! 4. A panicking callback is isolated: it is logged, counted in
//!    [`FrameClock::fault_count`], and the remaining callbacks still run.
//! 5. The clock stops (reports no pending frame) when its last subscriber
//!    goes away and after [`FrameClock::shutdown`].
//!
//! # Failure Modes
//!
//! - Non-finite timestamps are replaced by the previous timestamp.
//! - A [`Subscription`] dropped after the clock is gone is a no-op.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use std::time::Duration;

use web_time::Instant;

use crate::config::{ConfigError, check_positive};

/// One display refresh.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClockTick {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: f64,
    /// Clamped time since the previous tick, in milliseconds.
    pub delta_ms: f64,
}

impl ClockTick {
    /// Create a tick from raw components.
    pub const fn new(timestamp_ms: f64, delta_ms: f64) -> Self {
        Self {
            timestamp_ms,
            delta_ms,
        }
    }

    /// Delta in seconds.
    #[inline]
    pub fn delta_secs(&self) -> f64 {
        self.delta_ms / 1000.0
    }

    /// Delta as a [`Duration`].
    #[inline]
    pub fn delta(&self) -> Duration {
        crate::animation::duration_from_ms(self.delta_ms)
    }
}

/// Execution phase of a subscriber within one tick.
///
/// Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Virtual scroll offset update.
    Scroll,
    /// Scroll-linked value evaluation.
    Mapping,
    /// Spring integration toward the latest targets.
    Springs,
    /// Running reveal batches.
    Reveals,
    /// Particle field update and render submission.
    Particles,
    /// Loading overlay and ready signal.
    Loader,
    /// Geometry observers (viewport triggers, active section).
    Observers,
    /// Anything else.
    App,
}

/// Clock configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockConfig {
    /// Upper bound for a single tick's delta. Protects integrators from the
    /// jump after a backgrounded tab resumes.
    /// Default: 100ms
    pub max_delta_ms: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            max_delta_ms: 100.0,
        }
    }
}

impl ClockConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("clock.max_delta_ms", self.max_delta_ms)
    }
}

/// Identifier of a clock subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    /// No subscribers; no frame requested.
    Idle,
    Running,
    /// Permanently torn down.
    Shutdown,
}

type Callback = Rc<RefCell<dyn FnMut(&ClockTick)>>;

struct Entry {
    id: SubscriberId,
    phase: Phase,
    alive: Rc<Cell<bool>>,
    callback: Callback,
}

struct ClockInner {
    config: ClockConfig,
    entries: Vec<Entry>,
    next_id: u64,
    state: ClockState,
    last_timestamp: Option<f64>,
    origin: Instant,
    ticks: u64,
    faults: u64,
}

impl ClockInner {
    fn advance(&mut self, timestamp_ms: f64) -> ClockTick {
        let tick = match self.last_timestamp {
            None => {
                let ts = if timestamp_ms.is_finite() {
                    timestamp_ms
                } else {
                    0.0
                };
                ClockTick::new(ts, 0.0)
            }
            Some(last) => {
                let ts = if timestamp_ms.is_finite() {
                    timestamp_ms.max(last)
                } else {
                    last
                };
                let raw = ts - last;
                let delta = raw.min(self.config.max_delta_ms);
                if raw > delta {
                    crate::trace!(raw_ms = raw, clamped_ms = delta, "tick delta clamped");
                }
                ClockTick::new(ts, delta)
            }
        };
        self.last_timestamp = Some(tick.timestamp_ms);
        self.ticks += 1;
        tick
    }

    fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.alive.get()).count()
    }

    fn become_idle_if_empty(&mut self) {
        if self.state == ClockState::Running && self.live_count() == 0 {
            self.state = ClockState::Idle;
            self.last_timestamp = None;
            crate::debug!("frame clock idle");
        }
    }
}

/// Shared handle to the process-wide frame clock.
///
/// Cloning the handle does not create a new clock.
#[derive(Clone)]
pub struct FrameClock {
    inner: Rc<RefCell<ClockInner>>,
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FrameClock")
            .field("state", &inner.state)
            .field("subscribers", &inner.live_count())
            .field("ticks", &inner.ticks)
            .field("faults", &inner.faults)
            .finish()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl FrameClock {
    /// Create a clock. It stays idle until the first subscription.
    pub fn new(config: ClockConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ClockInner {
                config,
                entries: Vec::new(),
                next_id: 1,
                state: ClockState::Idle,
                last_timestamp: None,
                origin: Instant::now(),
                ticks: 0,
                faults: 0,
            })),
        }
    }

    /// Subscribe in the [`Phase::App`] phase.
    pub fn subscribe(&self, callback: impl FnMut(&ClockTick) + 'static) -> Subscription {
        self.subscribe_in(Phase::App, callback)
    }

    /// Subscribe `callback` to run during `phase` on every tick.
    ///
    /// The returned [`Subscription`] unsubscribes when dropped or when
    /// [`Subscription::unsubscribe`] is called. After [`shutdown`](Self::shutdown)
    /// the returned handle is inert.
    pub fn subscribe_in(
        &self,
        phase: Phase,
        callback: impl FnMut(&ClockTick) + 'static,
    ) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let alive = Rc::new(Cell::new(inner.state != ClockState::Shutdown));
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;

        if inner.state == ClockState::Shutdown {
            crate::warn!(subscriber = id.0, "subscribe after clock shutdown ignored");
            return Subscription {
                id,
                alive,
                clock: Weak::new(),
            };
        }

        let callback: Callback = Rc::new(RefCell::new(callback));
        // Insert after every entry of the same or an earlier phase.
        let at = inner.entries.partition_point(|e| e.phase <= phase);
        inner.entries.insert(
            at,
            Entry {
                id,
                phase,
                alive: alive.clone(),
                callback,
            },
        );
        if inner.state == ClockState::Idle {
            inner.state = ClockState::Running;
            crate::debug!("frame clock running");
        }
        crate::trace!(subscriber = id.0, phase = ?phase, "clock subscribe");

        Subscription {
            id,
            alive,
            clock: Rc::downgrade(&self.inner),
        }
    }

    /// Deliver one tick at `timestamp_ms`.
    ///
    /// Returns the delivered tick, or `None` if the clock is idle or shut
    /// down.
    pub fn tick(&self, timestamp_ms: f64) -> Option<ClockTick> {
        let (tick, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ClockState::Running {
                return None;
            }
            let dead: Vec<Entry> = {
                let (live, dead): (Vec<Entry>, Vec<Entry>) =
                    std::mem::take(&mut inner.entries)
                        .into_iter()
                        .partition(|e| e.alive.get());
                inner.entries = live;
                dead
            };
            if inner.entries.is_empty() {
                inner.become_idle_if_empty();
                drop(inner);
                drop(dead);
                return None;
            }
            let tick = inner.advance(timestamp_ms);
            let snapshot: Vec<(SubscriberId, Rc<Cell<bool>>, Callback)> = inner
                .entries
                .iter()
                .map(|e| (e.id, e.alive.clone(), e.callback.clone()))
                .collect();
            drop(inner);
            // Captured state may own subscriptions; drop it outside the borrow.
            drop(dead);
            (tick, snapshot)
        };

        for (id, alive, callback) in snapshot {
            if !alive.get() {
                continue;
            }
            let Ok(mut f) = callback.try_borrow_mut() else {
                // Re-entrant tick from inside this very callback.
                continue;
            };
            let outcome = catch_unwind(AssertUnwindSafe(|| (&mut *f)(&tick)));
            drop(f);
            if let Err(payload) = outcome {
                let message = panic_message(payload.as_ref());
                crate::error!(
                    subscriber = id.0,
                    panic = %message,
                    "clock subscriber panicked; isolated"
                );
                if let Ok(mut inner) = self.inner.try_borrow_mut() {
                    inner.faults += 1;
                }
            }
        }

        Some(tick)
    }

    /// Deliver one tick using the clock's own monotonic time source.
    pub fn tick_now(&self) -> Option<ClockTick> {
        let now = self.inner.borrow().origin.elapsed().as_secs_f64() * 1000.0;
        self.tick(now)
    }

    /// Forget the previous timestamp so the next tick has a zero delta.
    ///
    /// Call when the page becomes visible again after being hidden.
    pub fn resync(&self) {
        self.inner.borrow_mut().last_timestamp = None;
    }

    /// Whether the host should request another display frame.
    pub fn wants_frame(&self) -> bool {
        let inner = self.inner.borrow();
        inner.state == ClockState::Running && inner.live_count() > 0
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.borrow().state == ClockState::Shutdown
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().live_count()
    }

    /// Ticks delivered so far.
    pub fn tick_count(&self) -> u64 {
        self.inner.borrow().ticks
    }

    /// Subscriber panics caught so far.
    pub fn fault_count(&self) -> u64 {
        self.inner.borrow().faults
    }

    /// The configuration in use.
    pub fn config(&self) -> ClockConfig {
        self.inner.borrow().config
    }

    /// Tear the clock down: every subscription becomes inert and further
    /// ticks are ignored. Idempotent.
    pub fn shutdown(&self) {
        let entries = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == ClockState::Shutdown {
                return;
            }
            inner.state = ClockState::Shutdown;
            inner.last_timestamp = None;
            std::mem::take(&mut inner.entries)
        };
        for entry in &entries {
            entry.alive.set(false);
        }
        crate::debug!(released = entries.len(), "frame clock shut down");
        drop(entries);
    }
}

/// Handle to one clock subscription.
///
/// Dropping the handle unsubscribes. Unsubscribing is idempotent and legal
/// from inside the subscriber's own callback.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    id: SubscriberId,
    alive: Rc<Cell<bool>>,
    clock: Weak<RefCell<ClockInner>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.alive.get())
            .finish()
    }
}

impl Subscription {
    /// The subscriber id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the callback will still receive ticks.
    pub fn is_active(&self) -> bool {
        self.alive.get()
    }

    /// Stop receiving ticks. Calling this more than once has no effect.
    pub fn unsubscribe(&self) {
        if !self.alive.replace(false) {
            return;
        }
        crate::trace!(subscriber = self.id.0, "clock unsubscribe");
        let Some(clock) = self.clock.upgrade() else {
            return;
        };
        // While the clock is borrowed (e.g. a callback's captured state is
        // being dropped during a purge), the dead entry is swept on the
        // next tick instead.
        let removed = match clock.try_borrow_mut() {
            Ok(mut inner) => {
                let removed = inner
                    .entries
                    .iter()
                    .position(|e| e.id == self.id)
                    .map(|idx| inner.entries.remove(idx));
                inner.become_idle_if_empty();
                removed
            }
            Err(_) => None,
        };
        drop(removed);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Run `f`, catching and logging a panic. Returns `false` if it panicked.
pub(crate) fn run_guarded(site: &'static str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            crate::error!(site, panic = %message, "callback panicked; isolated");
            false
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnMut(&ClockTick)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        let make = move |name: &'static str| -> Box<dyn FnMut(&ClockTick)> {
            let log = log2.clone();
            Box::new(move |_: &ClockTick| log.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn idle_until_first_subscriber() {
        let clock = FrameClock::default();
        assert!(!clock.wants_frame());
        assert_eq!(clock.tick(0.0), None);
        let _sub = clock.subscribe(|_| {});
        assert!(clock.wants_frame());
        assert!(clock.tick(0.0).is_some());
    }

    #[test]
    fn first_tick_has_zero_delta_then_deltas_follow() {
        let clock = FrameClock::default();
        let _sub = clock.subscribe(|_| {});
        assert_eq!(clock.tick(1000.0).map(|t| t.delta_ms), Some(0.0));
        assert_eq!(clock.tick(1016.0).map(|t| t.delta_ms), Some(16.0));
    }

    #[test]
    fn delta_is_clamped_after_suspension() {
        let clock = FrameClock::default();
        let _sub = clock.subscribe(|_| {});
        clock.tick(0.0);
        let tick = clock.tick(30_000.0).unwrap();
        assert_eq!(tick.delta_ms, 100.0);
        assert_eq!(tick.timestamp_ms, 30_000.0);
    }

    #[test]
    fn timestamps_never_decrease() {
        let clock = FrameClock::default();
        let _sub = clock.subscribe(|_| {});
        clock.tick(500.0);
        let tick = clock.tick(400.0).unwrap();
        assert_eq!(tick.timestamp_ms, 500.0);
        assert_eq!(tick.delta_ms, 0.0);
        let tick = clock.tick(f64::NAN).unwrap();
        assert_eq!(tick.timestamp_ms, 500.0);
    }

    #[test]
    fn phases_order_callbacks() {
        let clock = FrameClock::default();
        let (log, make) = recorder();
        let _a = clock.subscribe_in(Phase::Springs, make("springs"));
        let _b = clock.subscribe_in(Phase::Scroll, make("scroll"));
        let _c = clock.subscribe_in(Phase::Mapping, make("mapping"));
        let _d = clock.subscribe_in(Phase::Scroll, make("scroll-2"));
        clock.tick(0.0);
        assert_eq!(
            *log.borrow(),
            vec!["scroll", "scroll-2", "mapping", "springs"]
        );
    }

    #[test]
    fn scroll_opens_every_tick() {
        let phases = [
            Phase::Scroll,
            Phase::Mapping,
            Phase::Springs,
            Phase::Reveals,
            Phase::Particles,
            Phase::Loader,
            Phase::Observers,
            Phase::App,
        ];
        assert!(phases.windows(2).all(|w| w[0] < w[1]));
        let clock = FrameClock::default();
        let (log, make) = recorder();
        let _app = clock.subscribe(make("app"));
        let _observers = clock.subscribe_in(Phase::Observers, make("observers"));
        let _scroll = clock.subscribe_in(Phase::Scroll, make("scroll"));
        clock.tick(0.0);
        assert_eq!(*log.borrow(), vec!["scroll", "observers", "app"]);
    }

    #[test]
    fn self_unsubscribe_during_callback() {
        let clock = FrameClock::default();
        let (log, make) = recorder();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let slot2 = slot.clone();
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        let sub = clock.subscribe(move |_| {
            count2.set(count2.get() + 1);
            if let Some(sub) = slot2.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.borrow_mut() = Some(sub);
        let _after = clock.subscribe(make("after"));

        clock.tick(0.0);
        clock.tick(16.0);
        assert_eq!(count.get(), 1);
        assert_eq!(*log.borrow(), vec!["after", "after"]);
    }

    #[test]
    fn unsubscribing_a_later_subscriber_skips_it_this_tick() {
        let clock = FrameClock::default();
        let (log, make) = recorder();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim2 = victim.clone();
        let _killer = clock.subscribe(move |_| {
            if let Some(sub) = victim2.borrow_mut().take() {
                drop(sub);
            }
        });
        *victim.borrow_mut() = Some(clock.subscribe(make("victim")));
        clock.tick(0.0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn subscribe_inside_callback_starts_next_tick() {
        let clock = FrameClock::default();
        let (log, make) = recorder();
        let clock2 = clock.clone();
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
        let held2 = held.clone();
        let make = Rc::new(make);
        let _spawner = clock.subscribe(move |_| {
            if held2.borrow().is_empty() {
                held2.borrow_mut().push(clock2.subscribe(make("late")));
            }
        });
        clock.tick(0.0);
        assert!(log.borrow().is_empty());
        clock.tick(16.0);
        assert_eq!(*log.borrow(), vec!["late"]);
    }

    #[test]
    fn panicking_callback_is_isolated() {
        let clock = FrameClock::default();
        let (log, make) = recorder();
        let _bad = clock.subscribe(|_| panic!("boom"));
        let _good = clock.subscribe(make("good"));
        clock.tick(0.0);
        clock.tick(16.0);
        assert_eq!(*log.borrow(), vec!["good", "good"]);
        assert_eq!(clock.fault_count(), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent_and_stops_clock() {
        let clock = FrameClock::default();
        let sub = clock.subscribe(|_| {});
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(clock.subscriber_count(), 0);
        assert!(!clock.wants_frame());
        drop(sub);
        assert_eq!(clock.tick(0.0), None);
    }

    #[test]
    fn restart_after_idle_does_not_jump() {
        let clock = FrameClock::default();
        let sub = clock.subscribe(|_| {});
        clock.tick(0.0);
        clock.tick(16.0);
        drop(sub);
        let _sub = clock.subscribe(|_| {});
        assert_eq!(clock.tick(5_000.0).map(|t| t.delta_ms), Some(0.0));
    }

    #[test]
    fn resync_zeroes_next_delta() {
        let clock = FrameClock::default();
        let _sub = clock.subscribe(|_| {});
        clock.tick(0.0);
        clock.resync();
        assert_eq!(clock.tick(50.0).map(|t| t.delta_ms), Some(0.0));
    }

    #[test]
    fn shutdown_makes_everything_inert() {
        let clock = FrameClock::default();
        let sub = clock.subscribe(|_| {});
        clock.shutdown();
        clock.shutdown();
        assert!(!sub.is_active());
        assert!(clock.is_shut_down());
        assert_eq!(clock.tick(0.0), None);
        let late = clock.subscribe(|_| {});
        assert!(!late.is_active());
        assert_eq!(clock.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outlives_clock() {
        let clock = FrameClock::default();
        let sub = clock.subscribe(|_| {});
        drop(clock);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }
}
