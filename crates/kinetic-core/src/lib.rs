#![forbid(unsafe_code)]

//! Core: frame clock, smoothed scroll, viewport triggers, scroll-linked
//! mappings, springs, reveal batches and the particle field.
//!
//! Every time-based component is driven by one [`clock::FrameClock`]. The
//! [`stage::Stage`] wires the components onto that clock in a fixed phase
//! order so that, within a tick, scroll is updated before mappings are
//! evaluated and mappings before springs chase their targets.

pub mod animation;
pub mod clock;
pub mod config;
pub mod cursor;
pub mod geometry;
pub mod loader;
pub mod logging;
pub mod mapper;
pub mod nav;
pub mod particles;
pub mod reveal;
pub mod scroll;
pub mod spring;
pub mod stage;
pub mod trigger;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};

pub use clock::{ClockTick, FrameClock, Phase, Subscription};
pub use config::{ConfigError, MotionConfig};
pub use geometry::{Bounds, Viewport};
pub use mapper::{Channel, ComputedStyle, ProgressMapping, ScrollLinkedMapper};
pub use scroll::{ScrollSimulator, ScrollState};
pub use spring::{Spring, SpringConfig};
pub use stage::{Stage, StageEvent};
pub use trigger::{TeardownHandle, ViewportTrigger};
