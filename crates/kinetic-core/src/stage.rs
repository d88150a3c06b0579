#![forbid(unsafe_code)]

//! Orchestration: wires every component onto one [`FrameClock`].
//!
//! Subscription order within a tick:
//!
//! | Phase       | Work                                              |
//! |-------------|---------------------------------------------------|
//! | `Scroll`    | virtual offset eases toward the raw offset        |
//! | `Mapping`   | pending layout refresh, scroll-linked targets     |
//! | `Springs`   | mapping springs and the cursor ring               |
//! | `Reveals`   | in-flight reveal batches (self-subscribed)        |
//! | `Particles` | particle field update and submit                  |
//! | `Loader`    | loading overlay, ready check                      |
//! | `Observers` | viewport triggers, active-section tracking        |
//!
//! Sections own their triggers, mappings and reveal batches. Unmounting a
//! section tears all of them down, including batches that are mid-flight.
//!
//! The stage never reads the clock's wall time; hosts decide when to tick.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::clock::{ClockTick, FrameClock, Phase, Subscription};
use crate::config::{ConfigError, MotionConfig};
use crate::cursor::{CursorFollower, CursorState, PointerKind};
use crate::geometry::Viewport;
use crate::loader::{Loader, LoaderPhase, LoaderStatus};
use crate::mapper::{ComputedStyle, LayoutProvider, MappedElement, ScrollLinkedMapper};
use crate::nav::{ChromeStyle, NavChrome, SectionTracker};
use crate::particles::{FieldRenderer, ParticleField};
use crate::reveal::{RevealAnimator, RevealSpec, SpringReveal, SpringRevealSpec, StyleSink};
use crate::scroll::{ScrollKey, ScrollSimulator, ScrollState};
use crate::trigger::{TriggerConfig, TriggerId, ViewportTrigger};

/// Notifications for the host, collected with [`Stage::drain_events`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StageEvent {
    /// The loader moved to a new phase.
    LoaderPhaseChanged(LoaderPhase),
    /// Loader finished and every declared section is mounted. Emitted once.
    Ready,
    /// Cached geometry was re-measured.
    LayoutRefreshed,
    /// The navigation highlight moved.
    ActiveSectionChanged(String),
}

/// Everything a section brings with it.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub id: String,
    /// Reveal batches and the layout key of the element that triggers each.
    pub reveals: Vec<(String, RevealSpec)>,
    /// Spring reveals and their trigger element.
    pub spring_reveals: Vec<(String, SpringRevealSpec)>,
    pub mappings: Vec<MappedElement>,
    /// Activation override for this section's triggers.
    pub trigger: Option<TriggerConfig>,
}

impl SectionSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reveals: Vec::new(),
            spring_reveals: Vec::new(),
            mappings: Vec::new(),
            trigger: None,
        }
    }

    /// Reveal `spec` when the section root comes into view.
    #[must_use]
    pub fn reveal(mut self, spec: RevealSpec) -> Self {
        let anchor = self.id.clone();
        self.reveals.push((anchor, spec));
        self
    }

    /// Reveal `spec` when the element laid out under `anchor` comes into
    /// view.
    #[must_use]
    pub fn reveal_on(mut self, anchor: impl Into<String>, spec: RevealSpec) -> Self {
        self.reveals.push((anchor.into(), spec));
        self
    }

    /// Spring `spec` into place when the element under `anchor` comes
    /// into view.
    #[must_use]
    pub fn spring_reveal_on(mut self, anchor: impl Into<String>, spec: SpringRevealSpec) -> Self {
        self.spring_reveals.push((anchor.into(), spec));
        self
    }

    #[must_use]
    pub fn mapping(mut self, element: MappedElement) -> Self {
        self.mappings.push(element);
        self
    }

    #[must_use]
    pub fn trigger(mut self, config: TriggerConfig) -> Self {
        self.trigger = Some(config);
        self
    }
}

/// Host collaborators handed to [`Stage::new`].
pub struct StageHost {
    pub viewport: Viewport,
    pub pointer: PointerKind,
    pub layout: Rc<dyn LayoutProvider>,
    pub sink: Rc<RefCell<dyn StyleSink>>,
}

impl std::fmt::Debug for StageHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageHost")
            .field("viewport", &self.viewport)
            .field("pointer", &self.pointer)
            .finish_non_exhaustive()
    }
}

struct MountedSection {
    id: String,
    triggers: ViewportTrigger,
    anchors: Vec<(TriggerId, String)>,
    mapping_keys: Vec<String>,
    measured: bool,
}

impl MountedSection {
    fn measure(&mut self, layout: &dyn LayoutProvider) {
        let triggers = &self.triggers;
        self.anchors.retain(|(id, _)| triggers.contains(*id));
        let mut complete = true;
        for (id, key) in &self.anchors {
            let bounds = layout.bounds(key);
            complete &= bounds.is_some();
            self.triggers.update_bounds(*id, bounds);
        }
        self.measured = complete;
    }
}

struct Shared {
    config: MotionConfig,
    viewport: Viewport,
    layout: Rc<dyn LayoutProvider>,
    mapper: ScrollLinkedMapper,
    tracker: SectionTracker,
    chrome: NavChrome,
    loader: Loader,
    declared: Vec<String>,
    sections: Vec<MountedSection>,
    events: VecDeque<StageEvent>,
    ready: bool,
}

impl Shared {
    /// Re-measure everything. Returns the new scroll limit when the
    /// document height is known.
    fn refresh_layout(&mut self) -> Option<f64> {
        let layout = self.layout.clone();
        self.mapper.invalidate_bounds();
        for section in &mut self.sections {
            section.measure(&*layout);
        }
        for id in &self.declared {
            self.tracker.set_bounds(id, layout.bounds(id));
        }
        self.events.push_back(StageEvent::LayoutRefreshed);
        crate::debug!(sections = self.sections.len(), "layout refreshed");
        layout
            .document_height()
            .filter(|h| h.is_finite())
            .map(|h| (h - self.viewport.height).max(0.0))
    }

    fn evaluate_mappings(&mut self, state: &ScrollState) {
        self.mapper.evaluate(state, self.viewport, &*self.layout);
    }

    fn observe(&mut self, offset: f64) {
        let visible = self.viewport.visible_rect(offset);
        let layout = self.layout.clone();
        for section in &mut self.sections {
            if !section.measured {
                section.measure(&*layout);
            }
            section.triggers.evaluate(visible);
        }
        if let Some(id) = self.tracker.evaluate(&visible) {
            let id = id.to_string();
            self.events.push_back(StageEvent::ActiveSectionChanged(id));
        }
    }

    fn advance_loader(&mut self, tick: &ClockTick) -> bool {
        if let Some(phase) = self.loader.tick(tick) {
            self.events.push_back(StageEvent::LoaderPhaseChanged(phase));
        }
        self.check_ready()
    }

    fn all_mounted(&self) -> bool {
        self.declared
            .iter()
            .all(|id| self.sections.iter().any(|s| s.id == *id))
    }

    /// Returns true exactly once, when the stage becomes ready.
    fn check_ready(&mut self) -> bool {
        if self.ready || !self.loader.is_done() || !self.all_mounted() {
            return false;
        }
        self.ready = true;
        self.events.push_back(StageEvent::Ready);
        crate::info!(sections = self.sections.len(), "stage ready");
        true
    }
}

/// The orchestration layer of one page.
pub struct Stage {
    clock: FrameClock,
    shared: Rc<RefCell<Shared>>,
    scroll: Rc<RefCell<ScrollSimulator>>,
    cursor: Rc<RefCell<CursorFollower>>,
    field: Option<(Rc<RefCell<ParticleField>>, Subscription)>,
    sink: Rc<RefCell<dyn StyleSink>>,
    subscriptions: Vec<Subscription>,
    torn_down: bool,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("Stage")
            .field("ready", &shared.ready)
            .field("sections", &shared.sections.len())
            .field("scroll", &self.scroll.borrow().state())
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl Stage {
    /// Validate `config` and subscribe every component to `clock`.
    ///
    /// Scrolling stays disabled until the stage is ready.
    pub fn new(clock: &FrameClock, config: MotionConfig, host: StageHost) -> Result<Self, ConfigError> {
        config.validate()?;
        let StageHost {
            viewport,
            pointer,
            layout,
            sink,
        } = host;

        let mut scroll = ScrollSimulator::new(config.scroll);
        scroll.set_viewport_height(viewport.height);
        if let Some(height) = layout.document_height().filter(|h| h.is_finite()) {
            scroll.set_limit(height - viewport.height);
        }
        scroll.disable();
        let scroll = Rc::new(RefCell::new(scroll));
        let cursor = Rc::new(RefCell::new(CursorFollower::new(config.cursor, pointer)));

        let shared = Rc::new(RefCell::new(Shared {
            viewport,
            layout,
            mapper: ScrollLinkedMapper::new(),
            tracker: SectionTracker::new(config.nav.threshold),
            chrome: NavChrome::new(&config.nav),
            loader: Loader::new(config.loader),
            declared: Vec::new(),
            sections: Vec::new(),
            events: VecDeque::new(),
            ready: false,
            config,
        }));

        let mut subscriptions = vec![ScrollSimulator::attach(&scroll, clock)];
        subscriptions.push(subscribe_mapping(clock, &shared, &scroll));
        subscriptions.push(subscribe_with(clock, Phase::Springs, &shared, |shared, tick| {
            shared.mapper.advance(tick);
        }));
        subscriptions.extend(CursorFollower::attach(&cursor, clock));
        subscriptions.push(subscribe_loader(clock, &shared, &scroll));
        subscriptions.push(subscribe_observers(clock, &shared, &scroll));

        crate::info!(
            width = viewport.width,
            height = viewport.height,
            "stage created"
        );
        Ok(Self {
            clock: clock.clone(),
            shared,
            scroll,
            cursor,
            field: None,
            sink,
            subscriptions,
            torn_down: false,
        })
    }

    // -- sections ---------------------------------------------------------

    /// Announce the sections the page will mount. [`StageEvent::Ready`]
    /// waits for all of them.
    pub fn declare_sections<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut shared = self.shared.borrow_mut();
        let layout = shared.layout.clone();
        for id in ids {
            let id = id.into();
            if shared.declared.contains(&id) {
                continue;
            }
            shared.tracker.declare(id.clone());
            shared.tracker.set_bounds(&id, layout.bounds(&id));
            shared.declared.push(id);
        }
    }

    /// Mount a section: register its triggers and mappings. Mounting an id
    /// that is already mounted replaces the old mount.
    pub fn mount_section(&mut self, spec: SectionSpec) {
        if self.torn_down {
            return;
        }
        self.unmount_section(&spec.id);
        let became_ready = {
            let mut shared = self.shared.borrow_mut();
            let layout = shared.layout.clone();
            let config = spec.trigger.unwrap_or(shared.config.trigger);
            let mut triggers = ViewportTrigger::new(config);
            let mut anchors = Vec::with_capacity(spec.reveals.len() + spec.spring_reveals.len());
            for (anchor, reveal) in spec.reveals {
                let animator = RevealAnimator::new(&self.clock, self.sink.clone()).batch(reveal);
                let id = triggers.register(None, animator);
                anchors.push((id, anchor));
            }
            for (anchor, reveal) in spec.spring_reveals {
                let effect = SpringReveal::new(&self.clock, self.sink.clone(), reveal);
                let id = triggers.register(None, effect);
                anchors.push((id, anchor));
            }
            let mut mapping_keys = Vec::with_capacity(spec.mappings.len());
            for element in spec.mappings {
                mapping_keys.push(element.key().to_string());
                shared.mapper.register(element);
            }
            let mut section = MountedSection {
                id: spec.id.clone(),
                triggers,
                anchors,
                mapping_keys,
                measured: false,
            };
            section.measure(&*layout);
            if !shared.declared.contains(&spec.id) {
                shared.tracker.declare(spec.id.clone());
            }
            shared.tracker.set_bounds(&spec.id, layout.bounds(&spec.id));
            crate::debug!(section = spec.id.as_str(), "section mounted");
            shared.sections.push(section);
            shared.check_ready()
        };
        if became_ready {
            self.scroll.borrow_mut().enable();
        }
    }

    /// Unmount a section, tearing down its triggers, in-flight reveals and
    /// mappings. Returns whether it was mounted.
    pub fn unmount_section(&mut self, id: &str) -> bool {
        let removed = {
            let mut shared = self.shared.borrow_mut();
            let Some(idx) = shared.sections.iter().position(|s| s.id == id) else {
                return false;
            };
            let section = shared.sections.remove(idx);
            for key in &section.mapping_keys {
                shared.mapper.remove(key);
            }
            if !shared.declared.iter().any(|d| d == id) {
                shared.tracker.remove(id);
            }
            section
        };
        // Effect teardowns may write to the sink; run them outside the borrow.
        let mut section = removed;
        section.triggers.teardown_all();
        crate::debug!(section = id, "section unmounted");
        true
    }

    /// Whether `id` is currently mounted.
    pub fn is_mounted(&self, id: &str) -> bool {
        self.shared.borrow().sections.iter().any(|s| s.id == id)
    }

    // -- particle field ---------------------------------------------------

    /// Mount the background particle field. Replaces a previous field.
    pub fn mount_field(&mut self, renderer: Box<dyn FieldRenderer>, device_pixel_ratio: f64, seed: u64) {
        if self.torn_down {
            return;
        }
        self.unmount_field();
        let (config, width) = {
            let shared = self.shared.borrow();
            (shared.config.field, shared.viewport.width)
        };
        let width = (width > 0.0).then_some(width);
        let field = Rc::new(RefCell::new(ParticleField::mount(
            config,
            width,
            device_pixel_ratio,
            seed,
            renderer,
        )));
        let sub = ParticleField::attach(&field, &self.clock);
        self.field = Some((field, sub));
    }

    /// Release the particle field, if any.
    pub fn unmount_field(&mut self) {
        if let Some((field, sub)) = self.field.take() {
            sub.unsubscribe();
            field.borrow_mut().teardown();
        }
    }

    /// Shared handle to the mounted particle field.
    pub fn field(&self) -> Option<Rc<RefCell<ParticleField>>> {
        self.field.as_ref().map(|(field, _)| field.clone())
    }

    // -- input --------------------------------------------------------------

    pub fn wheel(&mut self, delta: f64) -> bool {
        self.scroll.borrow_mut().wheel(delta)
    }

    pub fn touch(&mut self, delta: f64) -> bool {
        self.scroll.borrow_mut().touch(delta)
    }

    pub fn key(&mut self, key: ScrollKey) -> bool {
        self.scroll.borrow_mut().key(key)
    }

    /// The native scroll position moved without going through the stage.
    pub fn native_scroll(&mut self, offset: f64) -> bool {
        self.scroll.borrow_mut().sync_native(offset)
    }

    /// Smooth-scroll to the top of section `id`.
    pub fn navigate_to(&mut self, id: &str) -> bool {
        let top = self.shared.borrow().tracker.top_of(id);
        match top {
            Some(top) => self.scroll.borrow_mut().scroll_to(top, false),
            None => {
                crate::debug!(section = id, "navigation target not laid out");
                false
            }
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.cursor.borrow_mut().pointer_move(x, y);
        if let Some((field, _)) = &self.field {
            let viewport = self.shared.borrow().viewport;
            field.borrow_mut().set_pointer_client(&viewport, x, y);
        }
    }

    pub fn pointer_down(&mut self) {
        self.cursor.borrow_mut().pointer_down();
    }

    pub fn pointer_up(&mut self) {
        self.cursor.borrow_mut().pointer_up();
    }

    pub fn hover_enter(&mut self, label: Option<&str>) {
        self.cursor.borrow_mut().hover_enter(label);
    }

    pub fn hover_leave(&mut self) {
        self.cursor.borrow_mut().hover_leave();
    }

    /// The window changed size: re-measure and update the scroll extent.
    pub fn resize(&mut self, viewport: Viewport, device_pixel_ratio: f64) {
        if self.torn_down {
            return;
        }
        let limit = {
            let mut shared = self.shared.borrow_mut();
            shared.viewport = viewport;
            shared.refresh_layout()
        };
        {
            let mut scroll = self.scroll.borrow_mut();
            scroll.set_viewport_height(viewport.height);
            if let Some(limit) = limit {
                scroll.set_limit(limit);
            }
        }
        if let Some((field, _)) = &self.field {
            field.borrow_mut().resize(viewport, device_pixel_ratio);
        }
    }

    /// Page visibility changed. The next tick restarts timing from zero so
    /// time spent hidden is not replayed.
    pub fn visibility_changed(&mut self, visible: bool) {
        if visible {
            self.clock.resync();
            crate::debug!("page visible again; clock resynced");
        }
    }

    /// Finish the loader immediately.
    pub fn skip_loader(&mut self) {
        let became_ready = {
            let mut shared = self.shared.borrow_mut();
            if !shared.loader.is_done() {
                shared.loader.skip();
                shared
                    .events
                    .push_back(StageEvent::LoaderPhaseChanged(LoaderPhase::Done));
            }
            shared.check_ready()
        };
        if became_ready {
            self.scroll.borrow_mut().enable();
        }
    }

    // -- output -------------------------------------------------------------

    pub fn virtual_offset(&self) -> f64 {
        self.scroll.borrow().virtual_offset()
    }

    /// Scroll velocity in px/ms.
    pub fn velocity(&self) -> f64 {
        self.scroll.borrow().velocity()
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll.borrow().state()
    }

    /// Current style of a scroll-linked element.
    pub fn style(&self, key: &str) -> Option<ComputedStyle> {
        self.shared.borrow().mapper.style(key)
    }

    /// Every scroll-linked element's current style.
    pub fn styles(&self) -> Vec<(String, ComputedStyle)> {
        self.shared
            .borrow()
            .mapper
            .styles()
            .map(|(key, style)| (key.to_string(), style))
            .collect()
    }

    pub fn active_section(&self) -> Option<String> {
        self.shared.borrow().tracker.active().map(str::to_string)
    }

    /// Navigation bar chrome at the current virtual offset.
    pub fn nav_chrome(&self) -> ChromeStyle {
        let offset = self.virtual_offset();
        self.shared.borrow().chrome.at(offset)
    }

    /// Cursor state, `None` on coarse-pointer devices.
    pub fn cursor(&self) -> Option<CursorState> {
        self.cursor.borrow().state()
    }

    pub fn loader(&self) -> LoaderStatus {
        self.shared.borrow().loader.status()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.borrow().ready
    }

    /// Take every event raised since the last call.
    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        self.shared.borrow_mut().events.drain(..).collect()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    // -- teardown -----------------------------------------------------------

    /// Unsubscribe everything and unmount every section. Idempotent.
    pub fn teardown(&mut self) {
        if std::mem::replace(&mut self.torn_down, true) {
            return;
        }
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }
        self.unmount_field();
        let sections = std::mem::take(&mut self.shared.borrow_mut().sections);
        for mut section in sections {
            section.triggers.teardown_all();
        }
        self.scroll.borrow_mut().teardown();
        crate::info!("stage torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn subscribe_with(
    clock: &FrameClock,
    phase: Phase,
    shared: &Rc<RefCell<Shared>>,
    mut f: impl FnMut(&mut Shared, &ClockTick) + 'static,
) -> Subscription {
    let weak: Weak<RefCell<Shared>> = Rc::downgrade(shared);
    clock.subscribe_in(phase, move |tick| {
        if let Some(shared) = weak.upgrade() {
            f(&mut *shared.borrow_mut(), tick);
        }
    })
}

fn subscribe_mapping(
    clock: &FrameClock,
    shared: &Rc<RefCell<Shared>>,
    scroll: &Rc<RefCell<ScrollSimulator>>,
) -> Subscription {
    let scroll = Rc::downgrade(scroll);
    subscribe_with(clock, Phase::Mapping, shared, move |shared, _| {
        let Some(scroll) = scroll.upgrade() else {
            return;
        };
        let refresh = scroll.borrow_mut().take_refresh_request();
        if refresh && let Some(limit) = shared.refresh_layout() {
            scroll.borrow_mut().set_limit(limit);
        }
        let state = scroll.borrow().state();
        shared.evaluate_mappings(&state);
    })
}

fn subscribe_loader(
    clock: &FrameClock,
    shared: &Rc<RefCell<Shared>>,
    scroll: &Rc<RefCell<ScrollSimulator>>,
) -> Subscription {
    let scroll = Rc::downgrade(scroll);
    subscribe_with(clock, Phase::Loader, shared, move |shared, tick| {
        if shared.advance_loader(tick)
            && let Some(scroll) = scroll.upgrade()
        {
            scroll.borrow_mut().enable();
        }
    })
}

fn subscribe_observers(
    clock: &FrameClock,
    shared: &Rc<RefCell<Shared>>,
    scroll: &Rc<RefCell<ScrollSimulator>>,
) -> Subscription {
    let scroll = Rc::downgrade(scroll);
    subscribe_with(clock, Phase::Observers, shared, move |shared, _| {
        if let Some(scroll) = scroll.upgrade() {
            let offset = scroll.borrow().virtual_offset();
            shared.observe(offset);
        }
    })
}
