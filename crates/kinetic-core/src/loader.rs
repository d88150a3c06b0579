#![forbid(unsafe_code)]

//! Full-page loading overlay.
//!
//! Counts 0 to 100 percent in fixed steps along an ease-out-quart curve,
//! holds briefly at 100, then plays an exit phase before reporting done.
//! Time comes from the frame clock, so a suspended tab pauses the count
//! instead of skipping it.

use crate::animation::{CubicBezier, ease_out_quart};
use crate::clock::ClockTick;
use crate::config::{ConfigError, check_non_negative, check_ordered, check_positive};

/// Loader timing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoaderConfig {
    /// Default: 2500ms
    pub count_ms: f64,
    /// Default: 30ms
    pub step_ms: f64,
    /// Pause at 100% before exiting.
    /// Default: 300ms
    pub hold_ms: f64,
    /// Exit phase length.
    /// Default: 800ms
    pub exit_ms: f64,
    /// Overlay fade-out length within the exit phase.
    /// Default: 500ms
    pub fade_ms: f64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            count_ms: 2500.0,
            step_ms: 30.0,
            hold_ms: 300.0,
            exit_ms: 800.0,
            fade_ms: 500.0,
        }
    }
}

impl LoaderConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("loader.count_ms", self.count_ms)?;
        check_positive("loader.step_ms", self.step_ms)?;
        check_ordered("loader.step_ms", self.step_ms, self.count_ms)?;
        check_non_negative("loader.hold_ms", self.hold_ms)?;
        check_non_negative("loader.exit_ms", self.exit_ms)?;
        check_non_negative("loader.fade_ms", self.fade_ms)
    }

    fn total_steps(&self) -> u32 {
        if self.step_ms > 0.0 && self.count_ms > 0.0 {
            (self.count_ms / self.step_ms).ceil().max(1.0) as u32
        } else {
            1
        }
    }
}

/// Loader lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoaderPhase {
    Counting,
    Holding,
    Exiting,
    Done,
}

/// What the overlay should show this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoaderStatus {
    pub phase: LoaderPhase,
    pub progress: u8,
    pub overlay_opacity: f64,
}

/// Loading overlay state machine.
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
    phase: LoaderPhase,
    elapsed_ms: f64,
    phase_started_ms: f64,
    steps: u32,
    progress: u8,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            phase: LoaderPhase::Counting,
            elapsed_ms: 0.0,
            phase_started_ms: 0.0,
            steps: 0,
            progress: 0,
        }
    }

    /// Displayed percentage.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn phase(&self) -> LoaderPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == LoaderPhase::Done
    }

    /// Overlay opacity: 1 until the exit begins, then fading out.
    pub fn overlay_opacity(&self) -> f64 {
        match self.phase {
            LoaderPhase::Counting | LoaderPhase::Holding => 1.0,
            LoaderPhase::Done => 0.0,
            LoaderPhase::Exiting => {
                if self.config.fade_ms <= 0.0 {
                    return 0.0;
                }
                let t = (self.elapsed_ms - self.phase_started_ms) / self.config.fade_ms;
                1.0 - CubicBezier::curtain().apply(t)
            }
        }
    }

    pub fn status(&self) -> LoaderStatus {
        LoaderStatus {
            phase: self.phase,
            progress: self.progress,
            overlay_opacity: self.overlay_opacity(),
        }
    }

    /// Jump straight to done.
    pub fn skip(&mut self) {
        if self.phase != LoaderPhase::Done {
            self.progress = 100;
            self.enter(LoaderPhase::Done, self.elapsed_ms);
        }
    }

    /// Advance by one tick. Returns the new phase if it changed.
    pub fn tick(&mut self, tick: &ClockTick) -> Option<LoaderPhase> {
        if self.phase == LoaderPhase::Done || !(tick.delta_ms > 0.0) {
            return None;
        }
        let before = self.phase;
        self.elapsed_ms += tick.delta_ms;

        if self.phase == LoaderPhase::Counting {
            let total = self.config.total_steps();
            let nominal = (self.config.count_ms / self.config.step_ms).max(1.0);
            while self.steps < total
                && self.elapsed_ms >= f64::from(self.steps + 1) * self.config.step_ms
            {
                self.steps += 1;
                let t = (f64::from(self.steps) / nominal).min(1.0);
                self.progress = ((ease_out_quart(t) * 100.0).floor() as u8).min(100);
            }
            if self.steps >= total {
                self.progress = 100;
                let at = f64::from(total) * self.config.step_ms;
                self.enter(LoaderPhase::Holding, at);
            }
        }
        if self.phase == LoaderPhase::Holding
            && self.elapsed_ms >= self.phase_started_ms + self.config.hold_ms
        {
            let at = self.phase_started_ms + self.config.hold_ms;
            self.enter(LoaderPhase::Exiting, at);
        }
        if self.phase == LoaderPhase::Exiting
            && self.elapsed_ms >= self.phase_started_ms + self.config.exit_ms
        {
            let at = self.phase_started_ms + self.config.exit_ms;
            self.enter(LoaderPhase::Done, at);
        }

        (self.phase != before).then_some(self.phase)
    }

    fn enter(&mut self, phase: LoaderPhase, at_ms: f64) {
        self.phase = phase;
        self.phase_started_ms = at_ms;
        if phase == LoaderPhase::Done {
            crate::info!(elapsed_ms = self.elapsed_ms, "loader finished");
        }
    }
}
