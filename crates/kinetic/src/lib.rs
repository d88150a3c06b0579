#![forbid(unsafe_code)]

//! Kinetic public facade crate.
//!
//! Re-exports the motion core and offers a prelude for pages that only
//! need the [`Stage`] and its inputs.

use std::fmt;

// --- Clock and scroll ------------------------------------------------------

pub use kinetic_core::clock::{ClockConfig, ClockTick, FrameClock, Phase, Subscription};
pub use kinetic_core::scroll::{ScrollConfig, ScrollKey, ScrollSimulator, ScrollState};

// --- Geometry and styles ---------------------------------------------------

pub use kinetic_core::geometry::{Bounds, Viewport};
pub use kinetic_core::mapper::{
    Anchor, Channel, ComputedStyle, LayoutProvider, MappedElement, ProgressMapping, ScrollLinkedMapper,
    ScrollSource,
};

// --- Animation -------------------------------------------------------------

pub use kinetic_core::animation::Curve;
pub use kinetic_core::reveal::{RevealAnimator, RevealSpec, SpringReveal, SpringRevealSpec, StyleSink};
pub use kinetic_core::spring::{Spring, SpringConfig};
pub use kinetic_core::trigger::{TeardownHandle, TriggerConfig, TriggerId, ViewportTrigger};

// --- Page components -------------------------------------------------------

pub use kinetic_core::cursor::{CursorState, PointerKind};
pub use kinetic_core::loader::{LoaderPhase, LoaderStatus};
pub use kinetic_core::nav::ChromeStyle;
pub use kinetic_core::particles::{FieldAssets, FieldFrame, FieldRenderer};
pub use kinetic_core::stage::{SectionSpec, Stage, StageEvent, StageHost};

// --- Configuration ---------------------------------------------------------

pub use kinetic_core::config::{ConfigError, MotionConfig};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for kinetic pages.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A configuration value was rejected.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for kinetic APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Build a stage on `clock`, validating `config` first.
pub fn stage(clock: &FrameClock, config: MotionConfig, host: StageHost) -> Result<Stage> {
    Ok(Stage::new(clock, config, host)?)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Bounds, Channel, ComputedStyle, Error, FrameClock, LayoutProvider, MappedElement,
        MotionConfig, PointerKind, ProgressMapping, Result, RevealSpec, ScrollKey, ScrollSource,
        SectionSpec, Stage, StageEvent, StageHost, StyleSink, Viewport,
    };

    pub use crate::core;
}

pub use kinetic_core as core;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Empty;

    impl LayoutProvider for Empty {
        fn bounds(&self, _key: &str) -> Option<Bounds> {
            None
        }
    }

    struct Discard;

    impl StyleSink for Discard {
        fn apply(&mut self, _target: &str, _style: &ComputedStyle) {}
    }

    fn host() -> StageHost {
        StageHost {
            viewport: Viewport::new(800.0, 600.0),
            pointer: PointerKind::Fine,
            layout: Rc::new(Empty),
            sink: Rc::new(RefCell::new(Discard)),
        }
    }

    #[test]
    fn config_errors_convert() {
        let mut config = MotionConfig::default();
        config.scroll.duration_secs = -1.0;
        let err = crate::stage(&FrameClock::default(), config, host()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn stage_builds_with_defaults() {
        let clock = FrameClock::default();
        let stage = crate::stage(&clock, MotionConfig::default(), host()).unwrap();
        assert!(!stage.is_ready());
        assert!(clock.subscriber_count() > 0);
    }
}
