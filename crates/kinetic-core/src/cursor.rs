#![forbid(unsafe_code)]

//! Custom cursor: a dot pinned to the pointer and a ring that follows it
//! on springs.
//!
//! On coarse-pointer (touch) devices the follower is disabled outright: no
//! springs are allocated and every input is ignored.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::clock::{ClockTick, FrameClock, Phase, Subscription};
use crate::config::{ConfigError, check_range};
use crate::spring::{Spring, SpringConfig};

/// Primary pointer precision, as reported by `(pointer: coarse)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointerKind {
    /// Mouse or trackpad.
    #[default]
    Fine,
    /// Touch only.
    Coarse,
}

/// Cursor follower configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorConfig {
    /// Position before the first pointer event, off screen.
    /// Default: (-100, -100)
    pub initial: [f64; 2],
    /// Default: [`SpringConfig::POINTER`]
    pub spring: SpringConfig,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            initial: [-100.0, -100.0],
            spring: SpringConfig::POINTER,
        }
    }
}

impl CursorConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for v in self.initial {
            check_range("cursor.initial", v, f64::MIN, f64::MAX)?;
        }
        self.spring.validate()
    }
}

/// Snapshot of the cursor for the host to draw.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorState {
    /// Exact pointer position.
    pub dot: [f64; 2],
    /// Spring-smoothed position.
    pub ring: [f64; 2],
    /// Over an interactive element.
    pub hovering: bool,
    /// A button is held.
    pub pressed: bool,
    /// Text shown inside the ring while hovering.
    pub label: Option<String>,
}

/// Pointer-following cursor.
#[derive(Debug, Clone)]
pub struct CursorFollower {
    dot: [f64; 2],
    springs: Option<[Spring; 2]>,
    hovering: bool,
    pressed: bool,
    label: Option<String>,
}

impl CursorFollower {
    /// Create a follower. Coarse pointers get a disabled follower.
    pub fn new(config: CursorConfig, kind: PointerKind) -> Self {
        let springs = match kind {
            PointerKind::Fine => Some(config.initial.map(|v| Spring::new(v, config.spring))),
            PointerKind::Coarse => {
                crate::info!("coarse pointer; cursor follower disabled");
                None
            }
        };
        Self {
            dot: config.initial,
            springs,
            hovering: false,
            pressed: false,
            label: None,
        }
    }

    /// Drive a shared follower from `clock` in [`Phase::Springs`]. A
    /// disabled follower does not subscribe.
    pub fn attach(cursor: &Rc<RefCell<Self>>, clock: &FrameClock) -> Option<Subscription> {
        if !cursor.borrow().is_enabled() {
            return None;
        }
        let weak: Weak<RefCell<Self>> = Rc::downgrade(cursor);
        Some(clock.subscribe_in(Phase::Springs, move |tick| {
            if let Some(cursor) = weak.upgrade() {
                cursor.borrow_mut().tick(tick);
            }
        }))
    }

    pub fn is_enabled(&self) -> bool {
        self.springs.is_some()
    }

    /// Pointer moved to client position `(x, y)`.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some(springs) = self.springs.as_mut() else {
            return;
        };
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.dot = [x, y];
        springs[0].set_target(x);
        springs[1].set_target(y);
    }

    pub fn pointer_down(&mut self) {
        if self.is_enabled() {
            self.pressed = true;
        }
    }

    pub fn pointer_up(&mut self) {
        self.pressed = false;
    }

    /// Pointer entered an interactive element, optionally labelled.
    pub fn hover_enter(&mut self, label: Option<&str>) {
        if !self.is_enabled() {
            return;
        }
        self.hovering = true;
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            self.label = Some(label.to_string());
        }
    }

    /// Pointer left an interactive element.
    pub fn hover_leave(&mut self) {
        self.hovering = false;
        self.label = None;
    }

    /// Step the ring springs.
    pub fn tick(&mut self, tick: &ClockTick) {
        if let Some(springs) = self.springs.as_mut() {
            for spring in springs {
                spring.tick(tick);
            }
        }
    }

    /// Current state, `None` when disabled.
    pub fn state(&self) -> Option<CursorState> {
        let springs = self.springs.as_ref()?;
        Some(CursorState {
            dot: self.dot,
            ring: [springs[0].value(), springs[1].value()],
            hovering: self.hovering,
            pressed: self.pressed,
            label: self.label.clone(),
        })
    }

    /// Whether the ring has caught up with the dot.
    pub fn is_at_rest(&self) -> bool {
        self.springs
            .as_ref()
            .is_none_or(|s| s.iter().all(Spring::is_at_rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cursor: &mut CursorFollower, frames: usize) {
        for i in 0..frames {
            cursor.tick(&ClockTick::new(i as f64 * 16.0, 1000.0 / 60.0));
        }
    }

    #[test]
    fn starts_off_screen() {
        let cursor = CursorFollower::new(CursorConfig::default(), PointerKind::Fine);
        let state = cursor.state().unwrap();
        assert_eq!(state.dot, [-100.0, -100.0]);
        assert_eq!(state.ring, [-100.0, -100.0]);
    }

    #[test]
    fn ring_follows_dot() {
        let mut cursor = CursorFollower::new(CursorConfig::default(), PointerKind::Fine);
        cursor.pointer_move(400.0, 300.0);
        assert_eq!(cursor.state().unwrap().dot, [400.0, 300.0]);
        run(&mut cursor, 1);
        let ring = cursor.state().unwrap().ring;
        assert!(ring[0] > -100.0 && ring[0] < 400.0);
        run(&mut cursor, 120);
        assert!(cursor.is_at_rest());
        assert_eq!(cursor.state().unwrap().ring, [400.0, 300.0]);
    }

    #[test]
    fn hover_label_and_press() {
        let mut cursor = CursorFollower::new(CursorConfig::default(), PointerKind::Fine);
        cursor.hover_enter(Some("View"));
        cursor.pointer_down();
        let state = cursor.state().unwrap();
        assert!(state.hovering && state.pressed);
        assert_eq!(state.label.as_deref(), Some("View"));
        cursor.hover_enter(None);
        assert_eq!(cursor.state().unwrap().label.as_deref(), Some("View"));
        cursor.hover_leave();
        cursor.pointer_up();
        let state = cursor.state().unwrap();
        assert!(!state.hovering && !state.pressed);
        assert_eq!(state.label, None);
    }

    #[test]
    fn coarse_pointer_disables_everything() {
        let clock = FrameClock::default();
        let cursor = Rc::new(RefCell::new(CursorFollower::new(
            CursorConfig::default(),
            PointerKind::Coarse,
        )));
        assert!(CursorFollower::attach(&cursor, &clock).is_none());
        let mut c = cursor.borrow_mut();
        c.pointer_move(10.0, 10.0);
        c.pointer_down();
        c.hover_enter(Some("x"));
        assert!(!c.is_enabled());
        assert_eq!(c.state(), None);
        assert!(c.is_at_rest());
    }

    #[test]
    fn attached_follower_moves_on_clock() {
        let clock = FrameClock::default();
        let cursor = Rc::new(RefCell::new(CursorFollower::new(
            CursorConfig::default(),
            PointerKind::Fine,
        )));
        let _sub = CursorFollower::attach(&cursor, &clock);
        cursor.borrow_mut().pointer_move(0.0, 0.0);
        clock.tick(0.0);
        clock.tick(16.0);
        assert!(cursor.borrow().state().unwrap().ring[0] > -100.0);
    }
}
