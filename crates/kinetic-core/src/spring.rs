#![forbid(unsafe_code)]

//! Damped spring that chases a moving target.
//!
//! Each step applies
//!
//! ```text
//! a  = (target - value) * stiffness / mass - velocity * damping / mass
//! v += a * dt
//! x += v * dt
//! ```
//!
//! with `dt` taken from the frame delta. Long frames are split into equal
//! substeps small enough for the configured stiffness, so the result does
//! not depend on the display refresh rate and never diverges.
//!
//! # Invariants
//!
//! 1. Changing the target never resets value or velocity.
//! 2. Once within `rest_delta` of the target and slower than `rest_speed`,
//!    the value snaps to the target and the spring reports rest.
//! 3. Non-finite deltas and targets are ignored.

use crate::clock::ClockTick;
use crate::config::{ConfigError, check_non_negative, check_positive};

/// Largest delta integrated in one call, in seconds.
pub const MAX_STEP_SECS: f64 = 0.1;

/// Upper bound for one integration substep, in seconds.
const MAX_SUBSTEP_SECS: f64 = 1.0 / 240.0;

const MAX_SUBSTEPS: u32 = 2048;

/// Spring parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpringConfig {
    /// Restoring force per unit of displacement.
    pub stiffness: f64,
    /// Opposing force per unit of velocity.
    pub damping: f64,
    /// Inertia.
    pub mass: f64,
    /// Distance to target below which the spring may settle.
    pub rest_delta: f64,
    /// Speed below which the spring may settle.
    pub rest_speed: f64,
}

impl SpringConfig {
    /// Snappy tracking for pointer-follow.
    pub const POINTER: Self = Self {
        stiffness: 400.0,
        damping: 25.0,
        mass: 0.5,
        rest_delta: 0.01,
        rest_speed: 0.01,
    };

    /// Softer motion for large, scroll-mapped elements.
    pub const SOFT: Self = Self {
        stiffness: 100.0,
        damping: 30.0,
        mass: 1.0,
        rest_delta: 0.01,
        rest_speed: 0.01,
    };

    /// Create a config with default rest thresholds.
    pub const fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            rest_delta: 0.01,
            rest_speed: 0.01,
        }
    }

    /// Damping ratio: below 1 the spring overshoots, at 1 it is critically
    /// damped.
    pub fn damping_ratio(&self) -> f64 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("spring.stiffness", self.stiffness)?;
        check_non_negative("spring.damping", self.damping)?;
        check_positive("spring.mass", self.mass)?;
        check_non_negative("spring.rest_delta", self.rest_delta)?;
        check_non_negative("spring.rest_speed", self.rest_speed)?;
        Ok(())
    }

    // Substep length that keeps semi-implicit Euler stable for these
    // parameters.
    fn substep_limit(&self) -> f64 {
        let mut limit = MAX_SUBSTEP_SECS;
        if self.stiffness > 0.0 && self.mass > 0.0 {
            limit = limit.min(0.5 / (self.stiffness / self.mass).sqrt());
        }
        if self.damping > 0.0 && self.mass > 0.0 {
            limit = limit.min(0.5 * self.mass / self.damping);
        }
        limit
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::POINTER
    }
}

/// A single spring-smoothed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    value: f64,
    velocity: f64,
    target: f64,
    config: SpringConfig,
    at_rest: bool,
}

impl Spring {
    /// Create a spring resting at `initial`.
    pub fn new(initial: f64, config: SpringConfig) -> Self {
        let initial = if initial.is_finite() { initial } else { 0.0 };
        Self {
            value: initial,
            velocity: 0.0,
            target: initial,
            config,
            at_rest: true,
        }
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Current velocity in units per second.
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Current target.
    #[inline]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Parameters in use.
    pub fn config(&self) -> SpringConfig {
        self.config
    }

    /// Swap parameters mid-flight. Value and velocity carry over.
    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config;
        self.at_rest = false;
    }

    /// Redirect toward a new target without touching value or velocity.
    pub fn set_target(&mut self, target: f64) {
        if !target.is_finite() {
            return;
        }
        if target != self.target {
            self.target = target;
            self.at_rest = false;
        }
    }

    /// Place the spring at `value` with no motion.
    pub fn jump_to(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
        self.at_rest = true;
    }

    /// Whether the spring has settled on its target.
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Advance by one clock tick.
    pub fn tick(&mut self, tick: &ClockTick) {
        self.step(tick.delta_secs());
    }

    /// Advance by `dt` seconds (clamped to [`MAX_STEP_SECS`]).
    pub fn step(&mut self, dt: f64) {
        if self.at_rest || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let dt = dt.min(MAX_STEP_SECS);
        let limit = self.config.substep_limit();
        let steps = ((dt / limit).ceil() as u32).clamp(1, MAX_SUBSTEPS);
        let h = dt / f64::from(steps);

        let SpringConfig {
            stiffness,
            damping,
            mass,
            ..
        } = self.config;
        let mass = if mass > 0.0 { mass } else { 1.0 };

        for _ in 0..steps {
            let accel =
                (self.target - self.value) * stiffness / mass - self.velocity * damping / mass;
            self.velocity += accel * h;
            self.value += self.velocity * h;
        }

        if !self.value.is_finite() || !self.velocity.is_finite() {
            crate::warn!(goal = self.target, "spring state became non-finite; snapping");
            self.jump_to(self.target);
            return;
        }

        if (self.target - self.value).abs() <= self.config.rest_delta
            && self.velocity.abs() <= self.config.rest_speed
        {
            self.value = self.target;
            self.velocity = 0.0;
            self.at_rest = true;
        }
    }
}
