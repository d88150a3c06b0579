#![forbid(unsafe_code)]

//! Easing curves and finite, time-based animation primitives.
//!
//! Animations produce normalized `f64` values (0.0–1.0) and are advanced by
//! the caller with the frame delta. Nothing here schedules itself: the
//! [`FrameClock`](crate::clock::FrameClock) owns time.
//!
//! Only two interpolation primitives exist in the whole crate: the eased
//! tween below (reveal batches, the loader) and the spring integrator in
//! [`crate::spring`]. Scroll-linked values are pure functions of progress
//! (see [`crate::mapper`]) and reuse [`Curve`] for shaping.

use std::time::Duration;

pub mod bezier;
pub mod stagger;

pub use bezier::CubicBezier;
pub use stagger::{StaggerMode, stagger_offsets};

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f64) -> f64;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
pub fn ease_in(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end).
#[inline]
pub fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-in (slower start than quadratic).
#[inline]
pub fn ease_in_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * t
}

/// Cubic ease-out, a.k.a. `power3.out`.
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Quartic ease-out, a.k.a. `power4.out`. Also drives the loader counter.
#[inline]
pub fn ease_out_quart(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(4)
}

/// Exponential ease-out: `min(1, 1.001 - 2^(-10t))`.
#[inline]
pub fn ease_out_expo(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    (1.001 - 2f64.powf(-10.0 * t)).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

/// A named easing curve.
///
/// Function pointers cannot describe parameterized curves, so Bézier curves
/// get their own variant. Every variant clamps its input to [0, 1].
#[derive(Debug, Clone, Copy, Default)]
pub enum Curve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInCubic,
    /// `power3.out`
    EaseOutCubic,
    /// `power4.out`
    EaseOutQuart,
    EaseOutExpo,
    /// CSS-style `cubic-bezier(x1, y1, x2, y2)`.
    Bezier(CubicBezier),
    /// Custom easing function applied to normalized progress.
    Custom(EasingFn),
}

impl Curve {
    /// Evaluate the curve at `t`.
    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t };
        match self {
            Self::Linear => linear(t),
            Self::EaseIn => ease_in(t),
            Self::EaseOut => ease_out(t),
            Self::EaseInOut => ease_in_out(t),
            Self::EaseInCubic => ease_in_cubic(t),
            Self::EaseOutCubic => ease_out_cubic(t),
            Self::EaseOutQuart => ease_out_quart(t),
            Self::EaseOutExpo => ease_out_expo(t),
            Self::Bezier(bezier) => bezier.apply(t),
            Self::Custom(f) => f(t.clamp(0.0, 1.0)),
        }
    }
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// A finite, time-based animation producing values in [0.0, 1.0].
pub trait Animation {
    /// Advance the animation by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end.
    fn is_complete(&self) -> bool;

    /// Current output value, clamped to [0.0, 1.0].
    fn value(&self) -> f64;

    /// Time elapsed past completion. Used by [`Delayed`] to forward the
    /// remainder of a tick into its inner animation.
    fn overshoot(&self) -> Duration {
        Duration::ZERO
    }
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Eased progression from 0.0 to 1.0 over a fixed duration.
///
/// Tracks elapsed time as [`Duration`] internally for precise accumulation
/// (no floating-point drift) and accurate overshoot calculation.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    elapsed: Duration,
    duration: Duration,
    curve: Curve,
}

impl Tween {
    /// Create a tween with the given duration and linear easing.
    pub fn new(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
            curve: Curve::Linear,
        }
    }

    /// Set the easing curve.
    #[must_use]
    pub fn curve(mut self, curve: Curve) -> Self {
        self.curve = curve;
        self
    }

    /// Raw linear progress (before easing), in [0.0, 1.0].
    pub fn raw_progress(&self) -> f64 {
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        t.clamp(0.0, 1.0)
    }

    /// Time accumulated so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Configured duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Animation for Tween {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f64 {
        self.curve.apply(self.raw_progress())
    }

    fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.duration)
    }
}

// ---------------------------------------------------------------------------
// Delayed
// ---------------------------------------------------------------------------

/// Wait for a delay, then play the inner animation.
#[derive(Debug, Clone, Copy)]
pub struct Delayed<A> {
    delay: Duration,
    elapsed: Duration,
    inner: A,
    started: bool,
}

impl<A: Animation> Delayed<A> {
    /// Create a delayed animation that waits `delay` before starting `inner`.
    pub fn new(delay: Duration, inner: A) -> Self {
        Self {
            delay,
            elapsed: Duration::ZERO,
            inner,
            started: delay.is_zero(),
        }
    }

    /// Whether the delay period has elapsed and the inner animation has started.
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Access the inner animation.
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: Animation> Animation for Delayed<A> {
    fn tick(&mut self, dt: Duration) {
        if !self.started {
            self.elapsed = self.elapsed.saturating_add(dt);
            if self.elapsed >= self.delay {
                self.started = true;
                // Forward overshoot into the inner animation.
                let os = self.elapsed.saturating_sub(self.delay);
                if !os.is_zero() {
                    self.inner.tick(os);
                }
            }
        } else {
            self.inner.tick(dt);
        }
    }

    fn is_complete(&self) -> bool {
        self.started && self.inner.is_complete()
    }

    fn value(&self) -> f64 {
        if self.started {
            self.inner.value()
        } else {
            0.0
        }
    }

    fn overshoot(&self) -> Duration {
        if self.started {
            self.inner.overshoot()
        } else {
            Duration::ZERO
        }
    }
}

/// Create a [`Delayed`] animation.
pub fn delay<A: Animation>(d: Duration, a: A) -> Delayed<A> {
    Delayed::new(d, a)
}

/// Convert a frame delta in milliseconds into a [`Duration`].
///
/// Negative and non-finite deltas map to zero.
#[inline]
pub fn duration_from_ms(ms: f64) -> Duration {
    if !(ms.is_finite() && ms > 0.0) {
        return Duration::ZERO;
    }
    // Round to whole nanoseconds so 600.0 is exactly 600ms.
    let nanos = (ms * 1_000_000.0).round();
    if nanos >= u64::MAX as f64 {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
