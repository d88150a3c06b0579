#![forbid(unsafe_code)]

//! One-shot viewport triggers.
//!
//! A registration watches one element. The first time enough of it is
//! visible (inside the viewport grown or shrunk by the activation margin)
//! its effect is started, and the [`TeardownHandle`] the effect returns is
//! kept until the owner tears the registration down.
//!
//! ```text
//! Idle ──visible──▶ Fired ──teardown──▶ Inert
//!   └────────────teardown─────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. An effect starts at most once per registration, however often the
//!    element scrolls in and out.
//! 2. Teardown runs the effect's handle exactly once, whether or not the
//!    effect is still animating. Calling it again is a no-op.
//! 3. Registrations are evaluated independently; no firing order is
//!    implied.
//! 4. A panicking effect or teardown is logged and contained.
//! 5. Registrations with nothing left to start or undo are dropped at the
//!    next [`ViewportTrigger::evaluate`]; their ids then report no state.

use crate::clock::run_guarded;
use crate::config::{ConfigError, check_range};
use crate::geometry::Bounds;

/// Undo action returned by a started effect.
///
/// Runs at most once: on [`run`](Self::run) or on drop, whichever comes
/// first.
#[must_use = "dropping a TeardownHandle runs it immediately"]
pub struct TeardownHandle {
    action: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for TeardownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownHandle")
            .field("spent", &self.action.is_none())
            .finish()
    }
}

impl TeardownHandle {
    /// Wrap an undo action.
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// A handle with nothing to undo.
    pub fn noop() -> Self {
        Self { action: None }
    }

    /// Run the undo action if it has not run yet.
    pub fn run(&mut self) {
        if let Some(action) = self.action.take() {
            run_guarded("effect teardown", action);
        }
    }

    /// Whether the action has already run (or there was none).
    pub fn is_spent(&self) -> bool {
        self.action.is_none()
    }
}

impl Drop for TeardownHandle {
    fn drop(&mut self) {
        self.run();
    }
}

/// Something that can be started once and undone later.
pub trait Effect {
    /// Start the effect and return how to undo it.
    fn start(self: Box<Self>) -> TeardownHandle;
}

impl<F> Effect for F
where
    F: FnOnce() -> TeardownHandle,
{
    fn start(self: Box<Self>) -> TeardownHandle {
        (*self)()
    }
}

/// Activation parameters for one registration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerConfig {
    /// Pixels added to every side of the viewport before testing. Negative
    /// values require the element to be that far inside; positive values
    /// fire early.
    /// Default: -100
    pub activation_margin: f64,
    /// Visible fraction of the element required to fire. Zero means any
    /// visible area.
    /// Default: 0.0
    pub threshold: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            activation_margin: -100.0,
            threshold: 0.0,
        }
    }
}

impl TriggerConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "trigger.activation_margin",
            self.activation_margin,
            f64::MIN,
            f64::MAX,
        )?;
        check_range("trigger.threshold", self.threshold, 0.0, 1.0)
    }

    /// Whether `fraction` of the element being visible should fire.
    pub fn crosses(&self, fraction: f64) -> bool {
        fraction > 0.0 && fraction >= self.threshold
    }
}

/// Identifier of a registration within one [`ViewportTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(u32);

/// Lifecycle of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Waiting for the element to become visible.
    Idle,
    /// The effect has started.
    Fired,
    /// Torn down; will never fire again.
    Inert,
}

struct Registration {
    id: TriggerId,
    bounds: Option<Bounds>,
    config: TriggerConfig,
    state: TriggerState,
    fired: bool,
    effect: Option<Box<dyn Effect>>,
    teardown: Option<TeardownHandle>,
}

impl Registration {
    /// Torn down, or fired with an undo that has already run.
    fn is_inert(&self) -> bool {
        match self.state {
            TriggerState::Idle => false,
            TriggerState::Fired => self.teardown.as_ref().is_none_or(TeardownHandle::is_spent),
            TriggerState::Inert => true,
        }
    }
}

/// The trigger registrations of one owner (typically a section).
///
/// Dropping the set tears every registration down.
pub struct ViewportTrigger {
    defaults: TriggerConfig,
    registrations: Vec<Registration>,
    next_id: u32,
}

impl std::fmt::Debug for ViewportTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states: Vec<_> = self
            .registrations
            .iter()
            .map(|r| (r.id, r.state))
            .collect();
        f.debug_struct("ViewportTrigger")
            .field("defaults", &self.defaults)
            .field("registrations", &states)
            .finish()
    }
}

impl Default for ViewportTrigger {
    fn default() -> Self {
        Self::new(TriggerConfig::default())
    }
}

impl ViewportTrigger {
    /// Create an empty set using `defaults` for [`register`](Self::register).
    pub fn new(defaults: TriggerConfig) -> Self {
        Self {
            defaults,
            registrations: Vec::new(),
            next_id: 0,
        }
    }

    /// Register an effect with the default activation parameters.
    pub fn register(&mut self, bounds: Option<Bounds>, effect: impl Effect + 'static) -> TriggerId {
        self.register_with(bounds, self.defaults, effect)
    }

    /// Register an effect with explicit activation parameters.
    ///
    /// `bounds` may be `None` while the element has not been laid out.
    pub fn register_with(
        &mut self,
        bounds: Option<Bounds>,
        config: TriggerConfig,
        effect: impl Effect + 'static,
    ) -> TriggerId {
        let id = TriggerId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            bounds: bounds.filter(Bounds::is_valid),
            config,
            state: TriggerState::Idle,
            fired: false,
            effect: Some(Box::new(effect)),
            teardown: None,
        });
        id
    }

    /// Replace an element's bounds after layout changed.
    pub fn update_bounds(&mut self, id: TriggerId, bounds: Option<Bounds>) {
        if let Some(reg) = self.get_mut(id) {
            reg.bounds = bounds.filter(Bounds::is_valid);
        }
    }

    /// Test every idle registration against the visible document area and
    /// fire those that cross. Returns how many fired.
    pub fn evaluate(&mut self, visible: Bounds) -> usize {
        self.registrations.retain(|r| !r.is_inert());
        let mut fired = 0;
        for reg in &mut self.registrations {
            if reg.state != TriggerState::Idle {
                continue;
            }
            let Some(bounds) = reg.bounds else {
                continue;
            };
            let area = visible.inflate(reg.config.activation_margin);
            let fraction = bounds.visible_fraction(&area);
            if reg.config.crosses(fraction) {
                fire(reg, fraction);
                fired += 1;
            }
        }
        fired
    }

    /// Feed a visible fraction measured by the host's own intersection
    /// pass. Returns whether the registration fired.
    pub fn on_intersection(&mut self, id: TriggerId, fraction: f64) -> bool {
        let Some(reg) = self.get_mut(id) else {
            return false;
        };
        if reg.state != TriggerState::Idle || !fraction.is_finite() {
            return false;
        }
        if reg.config.crosses(fraction.clamp(0.0, 1.0)) {
            fire(reg, fraction);
            true
        } else {
            false
        }
    }

    /// Lifecycle state of a registration.
    pub fn state(&self, id: TriggerId) -> Option<TriggerState> {
        self.registrations
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.state)
    }

    /// Whether the registration's effect has started. Remains true after
    /// teardown until the registration is dropped by the next evaluate.
    pub fn has_fired(&self, id: TriggerId) -> bool {
        self.registrations.iter().any(|r| r.id == id && r.fired)
    }

    /// Whether `id` is still held.
    pub fn contains(&self, id: TriggerId) -> bool {
        self.registrations.iter().any(|r| r.id == id)
    }

    /// Number of registrations held, including inert ones not yet dropped.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether there are no registrations.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Whether any registration is still waiting to fire.
    pub fn has_pending(&self) -> bool {
        self.registrations
            .iter()
            .any(|r| r.state == TriggerState::Idle)
    }

    /// Tear one registration down. Idempotent.
    pub fn teardown(&mut self, id: TriggerId) {
        if let Some(reg) = self.get_mut(id) {
            retire(reg);
        }
    }

    /// Tear every registration down. Idempotent.
    pub fn teardown_all(&mut self) {
        for reg in &mut self.registrations {
            retire(reg);
        }
    }

    fn get_mut(&mut self, id: TriggerId) -> Option<&mut Registration> {
        self.registrations.iter_mut().find(|r| r.id == id)
    }
}

impl Drop for ViewportTrigger {
    fn drop(&mut self) {
        self.teardown_all();
    }
}

fn fire(reg: &mut Registration, fraction: f64) {
    reg.state = TriggerState::Fired;
    reg.fired = true;
    let Some(effect) = reg.effect.take() else {
        return;
    };
    crate::debug!(trigger = reg.id.0, fraction, "viewport trigger fired");
    let mut handle = None;
    run_guarded("trigger effect", || handle = Some(effect.start()));
    reg.teardown = handle;
}

fn retire(reg: &mut Registration) {
    if reg.state == TriggerState::Inert {
        return;
    }
    reg.state = TriggerState::Inert;
    reg.effect = None;
    if let Some(mut handle) = reg.teardown.take() {
        handle.run();
    }
    crate::debug!(trigger = reg.id.0, "viewport trigger torn down");
}
