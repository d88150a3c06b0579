#![forbid(unsafe_code)]

//! Staggered one-shot reveal batches.
//!
//! A [`RevealSpec`] names a group of elements and the style they animate
//! from and to. Element `i` starts `delay + offset[i]` after the batch
//! starts (offsets from [`stagger_offsets`]) and runs for `duration`.
//!
//! [`RevealAnimator`] is the [`Effect`] a viewport trigger starts: it
//! writes the `from` styles immediately, advances every batch on the frame
//! clock, unsubscribes itself when everything has finished, and its
//! teardown cancels whatever is still running.
//!
//! [`SpringReveal`] is the physics counterpart: each element's value is
//! carried by a [`Spring`] released `delay + index * stagger` after the
//! effect starts, so bars and counters settle on their own goal instead of
//! following a fixed-length tween.
//!
//! # Invariants
//!
//! 1. A batch starts at most once and cannot be retargeted once running.
//! 2. A cancelled batch never writes again.
//! 3. Every element ends exactly on its `to` style.
//! 4. Only changed styles are written to the sink.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::animation::{
    Animation, Curve, Delayed, StaggerMode, Tween, duration_from_ms, stagger_offsets,
};
use crate::clock::{FrameClock, Phase, Subscription};
use crate::mapper::{Channel, ComputedStyle};
use crate::spring::{Spring, SpringConfig};
use crate::trigger::{Effect, TeardownHandle};

/// Receives style writes for named elements.
pub trait StyleSink {
    /// Apply `style` to the element registered as `target`.
    fn apply(&mut self, target: &str, style: &ComputedStyle);
}

/// Declarative description of one reveal batch.
#[derive(Debug, Clone)]
pub struct RevealSpec {
    pub targets: Vec<String>,
    pub from: ComputedStyle,
    pub to: ComputedStyle,
    /// Gap between consecutive element starts.
    pub stagger: Duration,
    pub stagger_mode: StaggerMode,
    /// Length of each element's animation.
    pub duration: Duration,
    /// Wait before the first element starts.
    pub delay: Duration,
    pub curve: Curve,
}

impl RevealSpec {
    /// Reveal `targets` from `from` to `to` with 100ms stagger, 800ms
    /// duration and a cubic ease-out.
    pub fn new<I, S>(targets: I, from: ComputedStyle, to: ComputedStyle) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            from,
            to,
            stagger: Duration::from_millis(100),
            stagger_mode: StaggerMode::Linear,
            duration: Duration::from_millis(800),
            delay: Duration::ZERO,
            curve: Curve::EaseOutCubic,
        }
    }

    /// Fade in while rising `distance` pixels into place.
    pub fn fade_up<I, S>(targets: I, distance: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let from = ComputedStyle::IDENTITY
            .with(Channel::Opacity, 0.0)
            .with(Channel::TranslateY, distance);
        Self::new(targets, from, ComputedStyle::IDENTITY)
    }

    #[must_use]
    pub fn stagger_ms(mut self, ms: f64) -> Self {
        self.stagger = duration_from_ms(ms);
        self
    }

    #[must_use]
    pub fn duration_ms(mut self, ms: f64) -> Self {
        self.duration = duration_from_ms(ms);
        self
    }

    #[must_use]
    pub fn delay_ms(mut self, ms: f64) -> Self {
        self.delay = duration_from_ms(ms);
        self
    }

    #[must_use]
    pub fn curve(mut self, curve: Curve) -> Self {
        self.curve = curve;
        self
    }

    #[must_use]
    pub fn stagger_mode(mut self, mode: StaggerMode) -> Self {
        self.stagger_mode = mode;
        self
    }

    /// Start and end of every element, relative to the batch start.
    pub fn schedule(&self) -> Vec<RevealWindow> {
        stagger_offsets(self.targets.len(), self.stagger, self.stagger_mode)
            .into_iter()
            .map(|offset| {
                let start = self.delay.saturating_add(offset);
                RevealWindow {
                    start,
                    end: start.saturating_add(self.duration),
                }
            })
            .collect()
    }

    /// When the last element finishes.
    pub fn total_duration(&self) -> Duration {
        self.schedule()
            .iter()
            .map(|w| w.end)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

/// Active interval of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealWindow {
    pub start: Duration,
    pub end: Duration,
}

/// Lifecycle of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Running,
    Complete,
    Cancelled,
}

#[derive(Debug, Clone)]
struct Track {
    target: String,
    anim: Delayed<Tween>,
    current: ComputedStyle,
    written: Option<ComputedStyle>,
}

/// Runtime state of one [`RevealSpec`].
#[derive(Debug, Clone)]
pub struct RevealBatch {
    from: ComputedStyle,
    to: ComputedStyle,
    tracks: Vec<Track>,
    state: BatchState,
    elapsed: Duration,
}

impl RevealBatch {
    pub fn new(spec: &RevealSpec) -> Self {
        let tracks = spec
            .targets
            .iter()
            .zip(spec.schedule())
            .map(|(target, window)| Track {
                target: target.clone(),
                anim: Delayed::new(window.start, Tween::new(spec.duration).curve(spec.curve)),
                current: spec.from,
                written: None,
            })
            .collect();
        Self {
            from: spec.from,
            to: spec.to,
            tracks,
            state: BatchState::Pending,
            elapsed: Duration::ZERO,
        }
    }

    /// Begin the batch, writing every element's `from` style. Only the
    /// first call has an effect.
    pub fn start(&mut self, sink: &mut dyn StyleSink) {
        if self.state != BatchState::Pending {
            return;
        }
        self.state = BatchState::Running;
        self.flush(sink);
        if self.tracks.is_empty() {
            self.state = BatchState::Complete;
        }
    }

    /// Advance time without writing.
    pub fn advance(&mut self, dt: Duration) {
        if self.state != BatchState::Running {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        let mut all_done = true;
        for track in &mut self.tracks {
            if !track.anim.is_complete() {
                track.anim.tick(dt);
            }
            track.current = if track.anim.is_complete() {
                self.to
            } else if track.anim.has_started() {
                self.from.lerp(&self.to, track.anim.value())
            } else {
                self.from
            };
            all_done &= track.anim.is_complete();
        }
        if all_done {
            self.state = BatchState::Complete;
            crate::trace!(elements = self.tracks.len(), "reveal batch complete");
        }
    }

    /// Write every style that changed since the last write.
    pub fn flush(&mut self, sink: &mut dyn StyleSink) {
        if self.state == BatchState::Cancelled || self.state == BatchState::Pending {
            return;
        }
        for track in &mut self.tracks {
            if track.written != Some(track.current) {
                sink.apply(&track.target, &track.current);
                track.written = Some(track.current);
            }
        }
    }

    /// Advance and write.
    pub fn tick(&mut self, dt: Duration, sink: &mut dyn StyleSink) {
        self.advance(dt);
        self.flush(sink);
    }

    /// Stop immediately. No further writes happen. Idempotent; a finished
    /// batch stays finished.
    pub fn cancel(&mut self) {
        if matches!(self.state, BatchState::Pending | BatchState::Running) {
            self.state = BatchState::Cancelled;
            crate::trace!(elapsed_ms = self.elapsed.as_millis() as u64, "reveal batch cancelled");
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Complete or cancelled.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, BatchState::Complete | BatchState::Cancelled)
    }

    /// Time since start.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Whether element `index` has begun moving.
    pub fn has_started(&self, index: usize) -> bool {
        self.tracks
            .get(index)
            .is_some_and(|t| self.state != BatchState::Pending && t.anim.has_started())
    }

    /// Whether element `index` has reached its `to` style.
    pub fn is_track_complete(&self, index: usize) -> bool {
        self.tracks.get(index).is_some_and(|t| t.anim.is_complete())
    }

    /// Current style of element `index`.
    pub fn style(&self, index: usize) -> Option<ComputedStyle> {
        self.tracks.get(index).map(|t| t.current)
    }
}

/// Effect that plays one or more reveal batches on the frame clock.
pub struct RevealAnimator {
    clock: FrameClock,
    sink: Rc<RefCell<dyn StyleSink>>,
    specs: Vec<RevealSpec>,
}

impl std::fmt::Debug for RevealAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealAnimator")
            .field("specs", &self.specs)
            .finish_non_exhaustive()
    }
}

impl RevealAnimator {
    pub fn new(clock: &FrameClock, sink: Rc<RefCell<dyn StyleSink>>) -> Self {
        Self {
            clock: clock.clone(),
            sink,
            specs: Vec::new(),
        }
    }

    /// Add a batch.
    #[must_use]
    pub fn batch(mut self, spec: RevealSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Start every batch and return the handle that cancels them.
    pub fn play(self) -> TeardownHandle {
        let batches: Vec<RevealBatch> = self.specs.iter().map(RevealBatch::new).collect();
        let batches = Rc::new(RefCell::new(batches));
        {
            let mut sink = self.sink.borrow_mut();
            for batch in batches.borrow_mut().iter_mut() {
                batch.start(&mut *sink);
            }
        }
        if batches.borrow().iter().all(RevealBatch::is_finished) {
            return TeardownHandle::noop();
        }

        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let sub = {
            let batches = batches.clone();
            let sink = self.sink.clone();
            let slot: Weak<RefCell<Option<Subscription>>> = Rc::downgrade(&slot);
            self.clock.subscribe_in(Phase::Reveals, move |tick| {
                let dt = tick.delta();
                let mut batches = batches.borrow_mut();
                match sink.try_borrow_mut() {
                    Ok(mut sink) => {
                        for batch in batches.iter_mut() {
                            batch.tick(dt, &mut *sink);
                        }
                    }
                    // Written on the next tick.
                    Err(_) => batches.iter_mut().for_each(|b| b.advance(dt)),
                }
                if batches.iter().all(RevealBatch::is_finished)
                    && let Some(slot) = slot.upgrade()
                    && let Some(sub) = slot.borrow().as_ref()
                {
                    sub.unsubscribe();
                }
            })
        };
        *slot.borrow_mut() = Some(sub);

        TeardownHandle::new(move || {
            for batch in batches.borrow_mut().iter_mut() {
                batch.cancel();
            }
            drop(slot.borrow_mut().take());
        })
    }
}

impl Effect for RevealAnimator {
    fn start(self: Box<Self>) -> TeardownHandle {
        (*self).play()
    }
}

/// Spring-driven reveal of one channel across a group of elements.
///
/// Element `i` rests at `from` until `delay + i * stagger`, then springs to
/// its own goal. The value written is `spring value * unit`.
#[derive(Debug, Clone)]
pub struct SpringRevealSpec {
    /// Elements and the value each one settles on.
    pub targets: Vec<(String, f64)>,
    pub channel: Channel,
    pub from: f64,
    /// Written channel value per unit of spring value.
    pub unit: f64,
    pub spring: SpringConfig,
    pub stagger: Duration,
    pub delay: Duration,
}

impl SpringRevealSpec {
    /// Spring `channel` of every target from `from` to its goal with
    /// [`SpringConfig::SOFT`] and 100ms stagger.
    pub fn new<I, S>(channel: Channel, from: f64, targets: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(|(t, goal)| (t.into(), goal)).collect(),
            channel,
            from,
            unit: 1.0,
            spring: SpringConfig::SOFT,
            stagger: Duration::from_millis(100),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn spring(mut self, config: SpringConfig) -> Self {
        self.spring = config;
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: f64) -> Self {
        if unit.is_finite() {
            self.unit = unit;
        }
        self
    }

    #[must_use]
    pub fn stagger_ms(mut self, ms: f64) -> Self {
        self.stagger = duration_from_ms(ms);
        self
    }

    #[must_use]
    pub fn delay_ms(mut self, ms: f64) -> Self {
        self.delay = duration_from_ms(ms);
        self
    }

    /// When element `index` is released.
    pub fn start_of(&self, index: usize) -> Duration {
        let offset = self.stagger.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
        self.delay.saturating_add(offset)
    }

    /// Spring value shown by `style`, rounded for display.
    pub fn readout(&self, style: &ComputedStyle) -> i64 {
        if self.unit == 0.0 {
            return 0;
        }
        (style.get(self.channel) / self.unit).round() as i64
    }
}

#[derive(Debug, Clone)]
struct SpringTrack {
    target: String,
    goal: f64,
    start: Duration,
    spring: Spring,
    released: bool,
    written: Option<f64>,
}

/// Runtime state of one [`SpringRevealSpec`].
#[derive(Debug, Clone)]
pub struct SpringRevealSet {
    channel: Channel,
    unit: f64,
    tracks: Vec<SpringTrack>,
    state: BatchState,
    elapsed: Duration,
}

impl SpringRevealSet {
    pub fn new(spec: &SpringRevealSpec) -> Self {
        let tracks = spec
            .targets
            .iter()
            .enumerate()
            .map(|(i, (target, goal))| SpringTrack {
                target: target.clone(),
                goal: *goal,
                start: spec.start_of(i),
                spring: Spring::new(spec.from, spec.spring),
                released: false,
                written: None,
            })
            .collect();
        Self {
            channel: spec.channel,
            unit: spec.unit,
            tracks,
            state: BatchState::Pending,
            elapsed: Duration::ZERO,
        }
    }

    /// Begin, writing every element's starting value. Only the first call
    /// has an effect.
    pub fn start(&mut self, sink: &mut dyn StyleSink) {
        if self.state != BatchState::Pending {
            return;
        }
        self.state = BatchState::Running;
        self.advance(Duration::ZERO);
        self.flush(sink);
    }

    /// Advance time without writing.
    pub fn advance(&mut self, dt: Duration) {
        if self.state != BatchState::Running {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        let mut all_done = true;
        for track in &mut self.tracks {
            if !track.released {
                if self.elapsed < track.start {
                    all_done = false;
                    continue;
                }
                track.released = true;
                track.spring.set_target(track.goal);
                // Only the part of this frame after the release counts.
                let live = (self.elapsed - track.start).min(dt);
                track.spring.step(live.as_secs_f64());
            } else {
                track.spring.step(dt.as_secs_f64());
            }
            all_done &= track.spring.is_at_rest();
        }
        if all_done {
            self.state = BatchState::Complete;
            crate::trace!(elements = self.tracks.len(), "spring reveal settled");
        }
    }

    /// Write every value that changed since the last write.
    pub fn flush(&mut self, sink: &mut dyn StyleSink) {
        if matches!(self.state, BatchState::Cancelled | BatchState::Pending) {
            return;
        }
        for track in &mut self.tracks {
            let value = track.spring.value() * self.unit;
            if track.written != Some(value) {
                sink.apply(&track.target, &ComputedStyle::IDENTITY.with(self.channel, value));
                track.written = Some(value);
            }
        }
    }

    pub fn tick(&mut self, dt: Duration, sink: &mut dyn StyleSink) {
        self.advance(dt);
        self.flush(sink);
    }

    /// Stop immediately. Idempotent.
    pub fn cancel(&mut self) {
        if matches!(self.state, BatchState::Pending | BatchState::Running) {
            self.state = BatchState::Cancelled;
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, BatchState::Complete | BatchState::Cancelled)
    }

    /// Whether element `index` has been released toward its goal.
    pub fn has_started(&self, index: usize) -> bool {
        self.tracks.get(index).is_some_and(|t| t.released)
    }

    /// Spring value of element `index`, before `unit` is applied.
    pub fn value(&self, index: usize) -> Option<f64> {
        self.tracks.get(index).map(|t| t.spring.value())
    }
}

/// Effect that plays a [`SpringRevealSpec`] on the frame clock.
pub struct SpringReveal {
    clock: FrameClock,
    sink: Rc<RefCell<dyn StyleSink>>,
    spec: SpringRevealSpec,
}

impl std::fmt::Debug for SpringReveal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpringReveal")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl SpringReveal {
    pub fn new(clock: &FrameClock, sink: Rc<RefCell<dyn StyleSink>>, spec: SpringRevealSpec) -> Self {
        Self {
            clock: clock.clone(),
            sink,
            spec,
        }
    }

    /// Start the springs and return the handle that cancels them.
    pub fn play(self) -> TeardownHandle {
        let mut set = SpringRevealSet::new(&self.spec);
        set.start(&mut *self.sink.borrow_mut());
        if set.is_finished() {
            return TeardownHandle::noop();
        }
        let set = Rc::new(RefCell::new(set));

        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let sub = {
            let set = set.clone();
            let sink = self.sink.clone();
            let slot: Weak<RefCell<Option<Subscription>>> = Rc::downgrade(&slot);
            self.clock.subscribe_in(Phase::Reveals, move |tick| {
                let dt = tick.delta();
                let mut set = set.borrow_mut();
                match sink.try_borrow_mut() {
                    Ok(mut sink) => set.tick(dt, &mut *sink),
                    Err(_) => set.advance(dt),
                }
                if set.is_finished()
                    && let Some(slot) = slot.upgrade()
                    && let Some(sub) = slot.borrow().as_ref()
                {
                    sub.unsubscribe();
                }
            })
        };
        *slot.borrow_mut() = Some(sub);

        TeardownHandle::new(move || {
            set.borrow_mut().cancel();
            drop(slot.borrow_mut().take());
        })
    }
}

impl Effect for SpringReveal {
    fn start(self: Box<Self>) -> TeardownHandle {
        (*self).play()
    }
}
