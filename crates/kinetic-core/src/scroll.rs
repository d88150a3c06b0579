#![forbid(unsafe_code)]

//! Smoothed virtual scrolling.
//!
//! Raw input (wheel, touch, keys, programmatic jumps) moves the *raw*
//! offset immediately. Once per clock tick the *virtual* offset, the value
//! everything else lays out against, closes a fraction of the remaining
//! gap:
//!
//! ```text
//! factor  = 1 - residual ^ (delta_ms / duration_ms)
//! virtual += (raw - virtual) * factor
//! ```
//!
//! After `duration` of ticks at any refresh rate the gap has shrunk to
//! `residual` of its initial size, so motion is frame-rate independent.
//!
//! # Invariants
//!
//! 1. The factor lies in `[0, 1]`, so between inputs the virtual offset
//!    moves monotonically toward the raw offset and never passes it.
//! 2. The raw offset stays within `[0, limit]`.
//! 3. While disabled, input is ignored and the offset is frozen.
//! 4. Re-enabling requests exactly one layout refresh.
//! 5. Listeners see the published state once per tick, after the update.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::clock::{ClockTick, FrameClock, Phase, Subscription, run_guarded};
use crate::config::{ConfigError, check_non_negative, check_positive, check_range};

/// Published scroll state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollState {
    /// Target offset driven by input.
    pub raw_offset: f64,
    /// Eased offset used for layout and animation.
    pub virtual_offset: f64,
    /// Virtual offset change per millisecond over the last tick.
    pub velocity: f64,
}

/// Keyboard scroll commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollKey {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Home,
    End,
}

/// One raw scroll input.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollInput {
    /// Wheel delta in pixels, positive scrolls down.
    Wheel(f64),
    /// Touch drag delta in pixels, positive scrolls down.
    Touch(f64),
    Key(ScrollKey),
}

/// Scroll smoothing configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollConfig {
    /// Time for the virtual offset to close all but `residual` of a gap.
    /// Default: 1.2s
    pub duration_secs: f64,
    /// Fraction of the gap left after `duration_secs`.
    /// Default: 0.005
    pub residual: f64,
    /// Default: 1.0
    pub wheel_multiplier: f64,
    /// Default: 2.0
    pub touch_multiplier: f64,
    /// Distance of one line step, in pixels.
    /// Default: 40
    pub line_height: f64,
    /// Fraction of the viewport height moved by a page step.
    /// Default: 0.9
    pub page_fraction: f64,
    /// Gap below which the virtual offset snaps onto the raw offset.
    /// Default: 0.5px
    pub settle_threshold: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            duration_secs: 1.2,
            residual: 0.005,
            wheel_multiplier: 1.0,
            touch_multiplier: 2.0,
            line_height: 40.0,
            page_fraction: 0.9,
            settle_threshold: 0.5,
        }
    }
}

impl ScrollConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("scroll.duration_secs", self.duration_secs)?;
        check_range("scroll.residual", self.residual, f64::MIN_POSITIVE, 0.5)?;
        check_non_negative("scroll.wheel_multiplier", self.wheel_multiplier)?;
        check_non_negative("scroll.touch_multiplier", self.touch_multiplier)?;
        check_non_negative("scroll.line_height", self.line_height)?;
        check_range("scroll.page_fraction", self.page_fraction, 0.0, 1.0)?;
        check_non_negative("scroll.settle_threshold", self.settle_threshold)?;
        Ok(())
    }
}

/// Identifier of a scroll listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScrollListenerId(u64);

type Listener = Box<dyn FnMut(&ScrollState)>;

/// Converts raw scroll input into a smoothed virtual offset.
pub struct ScrollSimulator {
    config: ScrollConfig,
    state: ScrollState,
    limit: f64,
    viewport_height: f64,
    enabled: bool,
    refresh_pending: bool,
    torn_down: bool,
    listeners: Vec<(ScrollListenerId, Listener)>,
    next_listener: u64,
}

impl std::fmt::Debug for ScrollSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollSimulator")
            .field("state", &self.state)
            .field("limit", &self.limit)
            .field("enabled", &self.enabled)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ScrollSimulator {
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

impl ScrollSimulator {
    /// Create an enabled simulator at offset zero with no scroll limit.
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            state: ScrollState::default(),
            limit: f64::INFINITY,
            viewport_height: 0.0,
            enabled: true,
            refresh_pending: false,
            torn_down: false,
            listeners: Vec::new(),
            next_listener: 1,
        }
    }

    /// Subscribe a shared simulator to `clock` in [`Phase::Scroll`].
    ///
    /// The subscription only holds a weak reference; dropping the last
    /// strong reference to the simulator turns it into a no-op.
    pub fn attach(sim: &Rc<RefCell<Self>>, clock: &FrameClock) -> Subscription {
        let weak: Weak<RefCell<Self>> = Rc::downgrade(sim);
        clock.subscribe_in(Phase::Scroll, move |tick| {
            if let Some(sim) = weak.upgrade() {
                sim.borrow_mut().tick(tick);
            }
        })
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Eased offset.
    #[inline]
    pub fn virtual_offset(&self) -> f64 {
        self.state.virtual_offset
    }

    /// Input-driven offset.
    #[inline]
    pub fn raw_offset(&self) -> f64 {
        self.state.raw_offset
    }

    /// Pixels per millisecond over the last tick.
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.state.velocity
    }

    /// Configuration in use.
    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Maximum scroll offset.
    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Whether input is accepted.
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.torn_down
    }

    /// Whether the gap between raw and virtual offset has closed.
    pub fn is_settled(&self) -> bool {
        self.state.raw_offset == self.state.virtual_offset
    }

    /// Fraction of the remaining gap closed over `delta_ms`.
    pub fn easing_factor(&self, delta_ms: f64) -> f64 {
        if !delta_ms.is_finite() || delta_ms <= 0.0 {
            return 0.0;
        }
        let duration_ms = self.config.duration_secs * 1000.0;
        if !duration_ms.is_finite() || duration_ms <= 0.0 {
            return 1.0;
        }
        let residual = self.config.residual.clamp(f64::MIN_POSITIVE, 1.0);
        (1.0 - residual.powf(delta_ms / duration_ms)).clamp(0.0, 1.0)
    }

    /// Set the scrollable extent (document height minus viewport height).
    pub fn set_limit(&mut self, limit: f64) {
        let limit = if limit.is_nan() { 0.0 } else { limit.max(0.0) };
        self.limit = limit;
        self.state.raw_offset = self.state.raw_offset.min(limit);
        if self.state.virtual_offset > limit {
            self.state.virtual_offset = limit;
        }
    }

    /// Viewport height used by page steps.
    pub fn set_viewport_height(&mut self, height: f64) {
        if height.is_finite() && height >= 0.0 {
            self.viewport_height = height;
        }
    }

    /// Apply a wheel delta. Returns whether it was accepted.
    pub fn wheel(&mut self, delta: f64) -> bool {
        self.push(delta * self.config.wheel_multiplier)
    }

    /// Apply a touch drag delta. Returns whether it was accepted.
    pub fn touch(&mut self, delta: f64) -> bool {
        self.push(delta * self.config.touch_multiplier)
    }

    /// Apply a keyboard command. Returns whether it was accepted.
    pub fn key(&mut self, key: ScrollKey) -> bool {
        let page = self.viewport_height * self.config.page_fraction;
        match key {
            ScrollKey::LineUp => self.push(-self.config.line_height),
            ScrollKey::LineDown => self.push(self.config.line_height),
            ScrollKey::PageUp => self.push(-page),
            ScrollKey::PageDown => self.push(page),
            ScrollKey::Home => self.set_raw(0.0),
            ScrollKey::End => {
                if self.limit.is_finite() {
                    self.set_raw(self.limit)
                } else {
                    false
                }
            }
        }
    }

    /// Apply any raw input.
    pub fn input(&mut self, input: ScrollInput) -> bool {
        match input {
            ScrollInput::Wheel(d) => self.wheel(d),
            ScrollInput::Touch(d) => self.touch(d),
            ScrollInput::Key(k) => self.key(k),
        }
    }

    /// Scroll to `target`. With `immediate` the virtual offset jumps too.
    pub fn scroll_to(&mut self, target: f64, immediate: bool) -> bool {
        if !self.set_raw(target) {
            return false;
        }
        if immediate {
            self.state.virtual_offset = self.state.raw_offset;
            self.state.velocity = 0.0;
        }
        true
    }

    /// Mirror a native scroll position change (e.g. a scrollbar drag).
    pub fn sync_native(&mut self, offset: f64) -> bool {
        self.set_raw(offset)
    }

    /// Suppress scrolling entirely. The offset freezes where it is.
    pub fn disable(&mut self) {
        if !self.enabled || self.torn_down {
            return;
        }
        self.enabled = false;
        self.state.raw_offset = self.state.virtual_offset;
        self.state.velocity = 0.0;
        crate::debug!(offset = self.state.virtual_offset, "scroll disabled");
    }

    /// Restore scrolling and request one layout refresh.
    pub fn enable(&mut self) {
        if self.enabled || self.torn_down {
            return;
        }
        self.enabled = true;
        self.refresh_pending = true;
        crate::debug!("scroll enabled; layout refresh requested");
    }

    /// Consume a pending layout refresh request.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_pending)
    }

    /// Register a consumer that sees the state after every tick.
    pub fn on_scroll(&mut self, listener: impl FnMut(&ScrollState) + 'static) -> ScrollListenerId {
        let id = ScrollListenerId(self.next_listener);
        self.next_listener += 1;
        if !self.torn_down {
            self.listeners.push((id, Box::new(listener)));
        }
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn remove_listener(&mut self, id: ScrollListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    /// Advance the virtual offset by one tick and publish.
    pub fn tick(&mut self, tick: &ClockTick) {
        if self.torn_down {
            return;
        }
        let dt = tick.delta_ms;
        if dt > 0.0 {
            let prev = self.state.virtual_offset;
            let gap = self.state.raw_offset - prev;
            let next = if gap.abs() <= self.config.settle_threshold {
                self.state.raw_offset
            } else {
                prev + gap * self.easing_factor(dt)
            };
            self.state.virtual_offset = next;
            self.state.velocity = (next - prev) / dt;
        }
        let state = self.state;
        for (_, listener) in &mut self.listeners {
            run_guarded("scroll listener", || listener(&state));
        }
    }

    /// Drop every listener and stop responding. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.enabled = false;
        self.refresh_pending = false;
        self.listeners.clear();
        crate::debug!("scroll simulator torn down");
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn push(&mut self, delta: f64) -> bool {
        if !delta.is_finite() {
            return false;
        }
        self.set_raw(self.state.raw_offset + delta)
    }

    fn set_raw(&mut self, offset: f64) -> bool {
        if !self.is_enabled() || offset.is_nan() {
            return false;
        }
        self.state.raw_offset = offset.clamp(0.0, self.limit);
        true
    }
}
