#![forbid(unsafe_code)]

//! Scroll-linked values.
//!
//! A registered element turns the current virtual scroll offset into a
//! *progress* number, then each of its channels maps progress through a
//! [`ProgressMapping`] into a style value. Optionally a channel follows its
//! mapped value through a [`Spring`] instead of jumping to it.
//!
//! Progress sources:
//!
//! - [`ScrollSource::Element`]: framer-style anchor pairs. `start end`
//!   (element top meets viewport bottom) to `end start` (element bottom
//!   meets viewport top) is the usual "while on screen" window.
//! - [`ScrollSource::Page`]: the raw virtual offset in pixels.
//! - [`ScrollSource::PageProgress`]: offset over the scrollable extent.
//!
//! # Invariants
//!
//! 1. Mapped outputs are clamped to the mapping's output range; progress
//!    outside the source range never extrapolates.
//! 2. Element bounds are measured lazily and re-measured after
//!    [`ScrollLinkedMapper::invalidate_bounds`]; nothing survives a resize.
//! 3. Missing or invalid bounds never produce NaN: the element keeps its
//!    previous targets, or the mapping's start value if it has none.

use bitflags::bitflags;

use crate::animation::Curve;
use crate::clock::ClockTick;
use crate::geometry::{Bounds, Viewport};
use crate::scroll::ScrollState;
use crate::spring::{Spring, SpringConfig};

// ---------------------------------------------------------------------------
// Channels and styles
// ---------------------------------------------------------------------------

/// A style property driven by the motion core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Horizontal offset in pixels.
    TranslateX,
    /// Vertical offset in pixels.
    TranslateY,
    /// Opacity in [0, 1].
    Opacity,
    /// Uniform scale factor.
    Scale,
    /// Rotation about the X axis in degrees.
    Rotate,
}

impl Channel {
    /// Every channel.
    pub const ALL: [Channel; 5] = [
        Channel::TranslateX,
        Channel::TranslateY,
        Channel::Opacity,
        Channel::Scale,
        Channel::Rotate,
    ];

    /// Value that leaves the element unchanged.
    pub const fn identity(self) -> f64 {
        match self {
            Channel::Opacity | Channel::Scale => 1.0,
            _ => 0.0,
        }
    }

    /// Single-bit set for this channel.
    pub const fn flag(self) -> ChannelSet {
        match self {
            Channel::TranslateX => ChannelSet::TRANSLATE_X,
            Channel::TranslateY => ChannelSet::TRANSLATE_Y,
            Channel::Opacity => ChannelSet::OPACITY,
            Channel::Scale => ChannelSet::SCALE,
            Channel::Rotate => ChannelSet::ROTATE,
        }
    }
}

bitflags! {
    /// A set of [`Channel`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChannelSet: u8 {
        const TRANSLATE_X = 0b0_0001;
        const TRANSLATE_Y = 0b0_0010;
        const OPACITY     = 0b0_0100;
        const SCALE       = 0b0_1000;
        const ROTATE      = 0b1_0000;
    }
}

impl ChannelSet {
    /// Iterate the channels in the set, in [`Channel::ALL`] order.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL
            .into_iter()
            .filter(move |c| self.contains(c.flag()))
    }
}

/// Style values the host applies to an element.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComputedStyle {
    pub translate_x: f64,
    pub translate_y: f64,
    pub opacity: f64,
    pub scale: f64,
    pub rotate: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ComputedStyle {
    /// No offset, fully opaque, unscaled, unrotated.
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        opacity: 1.0,
        scale: 1.0,
        rotate: 0.0,
    };

    /// Read one channel.
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::TranslateX => self.translate_x,
            Channel::TranslateY => self.translate_y,
            Channel::Opacity => self.opacity,
            Channel::Scale => self.scale,
            Channel::Rotate => self.rotate,
        }
    }

    /// Write one channel.
    pub fn set(&mut self, channel: Channel, value: f64) {
        let slot = match channel {
            Channel::TranslateX => &mut self.translate_x,
            Channel::TranslateY => &mut self.translate_y,
            Channel::Opacity => &mut self.opacity,
            Channel::Scale => &mut self.scale,
            Channel::Rotate => &mut self.rotate,
        };
        *slot = value;
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, channel: Channel, value: f64) -> Self {
        self.set(channel, value);
        self
    }

    /// Per-channel linear interpolation; `t` is not clamped.
    pub fn lerp(&self, to: &ComputedStyle, t: f64) -> ComputedStyle {
        let mut out = *self;
        for channel in Channel::ALL {
            let a = self.get(channel);
            let b = to.get(channel);
            out.set(channel, a + (b - a) * t);
        }
        out
    }

    /// Channels whose values differ from `other`.
    pub fn diff(&self, other: &ComputedStyle) -> ChannelSet {
        Channel::ALL
            .into_iter()
            .filter(|&c| self.get(c) != other.get(c))
            .fold(ChannelSet::empty(), |acc, c| acc | c.flag())
    }
}

// ---------------------------------------------------------------------------
// ProgressMapping
// ---------------------------------------------------------------------------

/// Maps progress onto output values through a piecewise curve.
///
/// A mapping is a list of `(progress, output)` stops sorted by progress.
/// Between neighbouring stops the output is interpolated through `curve`;
/// outside the first and last stop it holds the end value. Two stops give
/// the usual `source range -> output range` form, more give keyframes such
/// as `[0, 0.5, 1] -> [10, 0, -10]`.
#[derive(Debug, Clone)]
pub struct ProgressMapping {
    stops: Vec<[f64; 2]>,
    curve: Curve,
}

impl ProgressMapping {
    /// Linear mapping from `source_range` onto `output_range`.
    pub fn new(source_range: [f64; 2], output_range: [f64; 2]) -> Self {
        Self::keyframes(&[
            (source_range[0], output_range[0]),
            (source_range[1], output_range[1]),
        ])
    }

    /// Mapping through `(progress, output)` stops. Stops are sorted by
    /// progress; stops sharing a progress value keep their given order and
    /// form a step.
    pub fn keyframes(stops: &[(f64, f64)]) -> Self {
        let mut stops: Vec<[f64; 2]> = stops.iter().map(|&(p, o)| [p, o]).collect();
        stops.sort_by(|a, b| a[0].total_cmp(&b[0]));
        Self {
            stops,
            curve: Curve::Linear,
        }
    }

    /// Set the curve applied within each segment.
    #[must_use]
    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = curve;
        self
    }

    /// Lowest and highest output over all stops.
    pub fn output_bounds(&self) -> [f64; 2] {
        self.stops.iter().fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], [_, o]| {
            [lo.min(*o), hi.max(*o)]
        })
    }

    /// Evaluate at `progress`.
    ///
    /// The result always lies between the two stops around `progress`, so
    /// it never leaves [`output_bounds`](Self::output_bounds). A repeated
    /// progress value behaves as a step; NaN progress maps to the first
    /// stop's output. An empty mapping yields 0.
    pub fn map(&self, progress: f64) -> f64 {
        let (Some(&[first_p, first_o]), Some(&[last_p, last_o])) =
            (self.stops.first(), self.stops.last())
        else {
            return 0.0;
        };
        if progress.is_nan() || self.stops.iter().any(|[p, _]| !p.is_finite()) {
            return first_o;
        }
        if progress < first_p {
            return first_o;
        }
        if progress >= last_p {
            return last_o;
        }
        for pair in self.stops.windows(2) {
            let ([p0, o0], [p1, o1]) = (pair[0], pair[1]);
            if progress < p1 {
                let t = ((progress - p0) / (p1 - p0)).clamp(0.0, 1.0);
                let out = o0 + (o1 - o0) * self.curve.apply(t);
                return if out.is_nan() { o0 } else { out.clamp(o0.min(o1), o0.max(o1)) };
            }
        }
        last_o
    }
}

// ---------------------------------------------------------------------------
// Progress sources
// ---------------------------------------------------------------------------

/// A point on the element paired with a point on the viewport, each as a
/// fraction of its height (0 = top, 1 = bottom).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Anchor {
    pub element: f64,
    pub viewport: f64,
}

impl Anchor {
    /// Element top at viewport top.
    pub const START_START: Self = Self::new(0.0, 0.0);
    /// Element top at viewport bottom.
    pub const START_END: Self = Self::new(0.0, 1.0);
    /// Element bottom at viewport top.
    pub const END_START: Self = Self::new(1.0, 0.0);
    /// Element bottom at viewport bottom.
    pub const END_END: Self = Self::new(1.0, 1.0);
    /// Element center at viewport center.
    pub const CENTER_CENTER: Self = Self::new(0.5, 0.5);

    pub const fn new(element: f64, viewport: f64) -> Self {
        Self { element, viewport }
    }

    /// Scroll offset at which this anchor lines up.
    pub fn offset(&self, bounds: &Bounds, viewport: &Viewport) -> f64 {
        bounds.top() + self.element * bounds.height - self.viewport * viewport.height
    }
}

/// Where an element's progress comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollSource {
    /// Progress 0 when the first anchor lines up, 1 at the second.
    Element([Anchor; 2]),
    /// Progress is the virtual offset in pixels.
    Page,
    /// Progress is the virtual offset over the scrollable extent.
    PageProgress,
}

impl ScrollSource {
    /// Entire time the element overlaps the viewport.
    pub const ON_SCREEN: Self = Self::Element([Anchor::START_END, Anchor::END_START]);
    /// From the element's top at the viewport top until it has scrolled
    /// out above.
    pub const LEAVING: Self = Self::Element([Anchor::START_START, Anchor::END_START]);
}

/// Measured geometry supplied by the host.
pub trait LayoutProvider {
    /// Current document bounds of the element registered under `key`, or
    /// `None` if it is not laid out.
    fn bounds(&self, key: &str) -> Option<Bounds>;

    /// Full document height, if known.
    fn document_height(&self) -> Option<f64> {
        None
    }
}

/// Compute progress for `source`. `None` when the geometry it needs is
/// missing.
pub fn source_progress(
    source: &ScrollSource,
    offset: f64,
    bounds: Option<&Bounds>,
    viewport: &Viewport,
    document_height: Option<f64>,
) -> Option<f64> {
    if !offset.is_finite() {
        return None;
    }
    match source {
        ScrollSource::Page => Some(offset),
        ScrollSource::PageProgress => {
            let extent = document_height? - viewport.height;
            if !extent.is_finite() {
                return None;
            }
            if extent <= 0.0 {
                return Some(1.0);
            }
            Some((offset / extent).clamp(0.0, 1.0))
        }
        ScrollSource::Element([a, b]) => {
            let bounds = bounds.filter(|b| b.is_valid())?;
            let start = a.offset(bounds, viewport);
            let end = b.offset(bounds, viewport);
            if !start.is_finite() || !end.is_finite() {
                return None;
            }
            if start == end {
                return Some(if offset < start { 0.0 } else { 1.0 });
            }
            Some((offset - start) / (end - start))
        }
    }
}

// ---------------------------------------------------------------------------
// Registrations
// ---------------------------------------------------------------------------

/// One channel of a mapped element.
#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub channel: Channel,
    pub mapping: ProgressMapping,
    /// Follow the mapped value through a spring instead of jumping to it.
    pub smoothing: Option<SpringConfig>,
}

/// Declaration of a scroll-linked element.
#[derive(Debug, Clone)]
pub struct MappedElement {
    key: String,
    source: ScrollSource,
    bindings: Vec<ChannelBinding>,
}

impl MappedElement {
    /// Start a declaration for the element measured under `key`.
    pub fn new(key: impl Into<String>, source: ScrollSource) -> Self {
        Self {
            key: key.into(),
            source,
            bindings: Vec::new(),
        }
    }

    /// Drive `channel` directly from `mapping`.
    #[must_use]
    pub fn bind(mut self, channel: Channel, mapping: ProgressMapping) -> Self {
        self.bindings.push(ChannelBinding {
            channel,
            mapping,
            smoothing: None,
        });
        self
    }

    /// Drive `channel` through a spring that follows `mapping`.
    #[must_use]
    pub fn bind_smoothed(
        mut self,
        channel: Channel,
        mapping: ProgressMapping,
        spring: SpringConfig,
    ) -> Self {
        self.bindings.push(ChannelBinding {
            channel,
            mapping,
            smoothing: Some(spring),
        });
        self
    }

    /// Layout key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Channels driven by this element.
    pub fn channels(&self) -> ChannelSet {
        self.bindings
            .iter()
            .fold(ChannelSet::empty(), |acc, b| acc | b.channel.flag())
    }
}

#[derive(Debug)]
struct Tracked {
    decl: MappedElement,
    bounds: Option<Bounds>,
    stale: bool,
    progress: Option<f64>,
    springs: Vec<Option<Spring>>,
    style: ComputedStyle,
}

impl Tracked {
    fn new(decl: MappedElement) -> Self {
        let springs = vec![None; decl.bindings.len()];
        Self {
            decl,
            bounds: None,
            stale: true,
            progress: None,
            springs,
            style: ComputedStyle::IDENTITY,
        }
    }
}

/// Evaluates every registered scroll-linked element.
#[derive(Debug, Default)]
pub struct ScrollLinkedMapper {
    elements: Vec<Tracked>,
}

impl ScrollLinkedMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element. A previous registration under the same key is
    /// replaced.
    pub fn register(&mut self, element: MappedElement) {
        self.remove(element.key());
        self.elements.push(Tracked::new(element));
    }

    /// Forget an element. Returns whether it was registered.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.elements.len();
        self.elements.retain(|t| t.decl.key != key);
        before != self.elements.len()
    }

    /// Number of registered elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Drop every cached measurement; the next evaluation re-measures.
    pub fn invalidate_bounds(&mut self) {
        for t in &mut self.elements {
            t.stale = true;
        }
    }

    /// Recompute every element's targets from the current scroll state.
    pub fn evaluate(
        &mut self,
        scroll: &ScrollState,
        viewport: Viewport,
        layout: &dyn LayoutProvider,
    ) {
        let document_height = layout.document_height();
        for t in &mut self.elements {
            if t.stale {
                t.bounds = layout.bounds(&t.decl.key).filter(Bounds::is_valid);
                t.stale = t.bounds.is_none();
            }
            let progress = source_progress(
                &t.decl.source,
                scroll.virtual_offset,
                t.bounds.as_ref(),
                &viewport,
                document_height,
            );
            let progress = match (progress, t.progress) {
                (Some(p), _) => p,
                // Keep the last good state.
                (None, Some(_)) => continue,
                (None, None) => f64::NAN,
            };
            if progress.is_finite() {
                t.progress = Some(progress);
            }
            for (binding, spring) in t.decl.bindings.iter().zip(t.springs.iter_mut()) {
                let target = binding.mapping.map(progress);
                let Some(config) = binding.smoothing else {
                    t.style.set(binding.channel, target);
                    continue;
                };
                match spring {
                    Some(spring) => spring.set_target(target),
                    None => {
                        *spring = Some(Spring::new(target, config));
                        t.style.set(binding.channel, target);
                    }
                }
            }
        }
    }

    /// Step every smoothing spring by one tick.
    pub fn advance(&mut self, tick: &ClockTick) {
        for t in &mut self.elements {
            for (binding, spring) in t.decl.bindings.iter().zip(t.springs.iter_mut()) {
                if let Some(spring) = spring {
                    spring.tick(tick);
                    t.style.set(binding.channel, spring.value());
                }
            }
        }
    }

    /// Whether every smoothing spring has settled.
    pub fn is_at_rest(&self) -> bool {
        self.elements
            .iter()
            .flat_map(|t| t.springs.iter().flatten())
            .all(Spring::is_at_rest)
    }

    /// Current style of an element.
    pub fn style(&self, key: &str) -> Option<ComputedStyle> {
        self.find(key).map(|t| t.style)
    }

    /// Last finite progress of an element.
    pub fn progress(&self, key: &str) -> Option<f64> {
        self.find(key).and_then(|t| t.progress)
    }

    /// Every element's current style.
    pub fn styles(&self) -> impl Iterator<Item = (&str, ComputedStyle)> {
        self.elements.iter().map(|t| (t.decl.key.as_str(), t.style))
    }

    fn find(&self, key: &str) -> Option<&Tracked> {
        self.elements.iter().find(|t| t.decl.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Layout {
        bounds: HashMap<String, Bounds>,
        document: Option<f64>,
        measured: Cell<u32>,
    }

    impl LayoutProvider for Layout {
        fn bounds(&self, key: &str) -> Option<Bounds> {
            self.measured.set(self.measured.get() + 1);
            self.bounds.get(key).copied()
        }

        fn document_height(&self) -> Option<f64> {
            self.document
        }
    }

    fn at(offset: f64) -> ScrollState {
        ScrollState {
            raw_offset: offset,
            virtual_offset: offset,
            velocity: 0.0,
        }
    }

    const VIEW: Viewport = Viewport::new(1200.0, 800.0);

    #[test]
    fn mapping_clamps_outside_window() {
        let m = ProgressMapping::new([0.0, 1.0], [100.0, -100.0]);
        assert_eq!(m.map(-3.0), 100.0);
        assert_eq!(m.map(0.5), 0.0);
        assert_eq!(m.map(4.0), -100.0);
        assert_eq!(m.map(f64::NAN), 100.0);
        assert_eq!(m.map(f64::INFINITY), -100.0);
    }

    #[test]
    fn mapping_partial_window() {
        let m = ProgressMapping::new([0.0, 0.5], [1.0, 0.0]);
        assert_eq!(m.map(0.25), 0.5);
        assert_eq!(m.map(0.9), 0.0);
    }

    #[test]
    fn degenerate_source_is_a_step() {
        let m = ProgressMapping::new([0.3, 0.3], [0.0, 10.0]);
        assert_eq!(m.map(0.2), 0.0);
        assert_eq!(m.map(0.3), 10.0);
    }

    #[test]
    fn keyframes_rise_then_fall() {
        let tilt = ProgressMapping::keyframes(&[(0.0, 10.0), (0.5, 0.0), (1.0, -10.0)]);
        assert_eq!(tilt.map(0.0), 10.0);
        assert_eq!(tilt.map(0.25), 5.0);
        assert_eq!(tilt.map(0.5), 0.0);
        assert_eq!(tilt.map(0.75), -5.0);
        assert_eq!(tilt.map(2.0), -10.0);

        let scale = ProgressMapping::keyframes(&[(0.0, 0.95), (0.5, 1.0), (1.0, 0.95)]);
        assert_eq!(scale.map(0.5), 1.0);
        assert!((scale.map(0.25) - 0.975).abs() < 1e-12);
        assert!((scale.map(0.75) - 0.975).abs() < 1e-12);
        assert_eq!(scale.map(-1.0), 0.95);
        assert_eq!(scale.output_bounds(), [0.95, 1.0]);
    }

    #[test]
    fn keyframes_are_sorted_by_progress() {
        let m = ProgressMapping::keyframes(&[(1.0, 0.0), (0.0, 100.0)]);
        assert_eq!(m.map(0.0), 100.0);
        assert_eq!(m.map(0.5), 50.0);
        assert_eq!(m.map(1.0), 0.0);
    }

    #[test]
    fn single_and_empty_keyframes() {
        let one = ProgressMapping::keyframes(&[(0.4, 7.0)]);
        assert_eq!(one.map(0.0), 7.0);
        assert_eq!(one.map(1.0), 7.0);
        assert_eq!(ProgressMapping::keyframes(&[]).map(0.5), 0.0);
    }

    #[test]
    fn overshooting_curve_is_clamped() {
        let m = ProgressMapping::new([0.0, 1.0], [0.0, 1.0])
            .with_curve(Curve::Bezier(crate::animation::CubicBezier::new(0.3, 2.0, 0.6, 1.5)));
        for i in 0..=20 {
            let v = m.map(i as f64 / 20.0);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn element_progress_start_end_to_end_start() {
        let bounds = Bounds::new(0.0, 1000.0, 1200.0, 400.0);
        let p = |off: f64| {
            source_progress(&ScrollSource::ON_SCREEN, off, Some(&bounds), &VIEW, None).unwrap()
        };
        // Starts when top (1000) meets viewport bottom: offset 200.
        assert_eq!(p(200.0), 0.0);
        // Ends when bottom (1400) meets viewport top: offset 1400.
        assert_eq!(p(1400.0), 1.0);
        assert_eq!(p(800.0), 0.5);
    }

    #[test]
    fn page_progress_uses_document_height() {
        let p = source_progress(&ScrollSource::PageProgress, 600.0, None, &VIEW, Some(2000.0));
        assert_eq!(p, Some(0.5));
        assert_eq!(
            source_progress(&ScrollSource::PageProgress, 0.0, None, &VIEW, None),
            None
        );
    }

    #[test]
    fn evaluates_multiple_channels() {
        let mut layout = Layout::default();
        layout
            .bounds
            .insert("hero".into(), Bounds::new(0.0, 0.0, 1200.0, 800.0));
        let mut mapper = ScrollLinkedMapper::new();
        mapper.register(
            MappedElement::new("hero", ScrollSource::LEAVING)
                .bind(Channel::TranslateY, ProgressMapping::new([0.0, 1.0], [0.0, 300.0]))
                .bind(Channel::Opacity, ProgressMapping::new([0.0, 0.5], [1.0, 0.0]))
                .bind(Channel::Scale, ProgressMapping::new([0.0, 0.5], [1.0, 0.9])),
        );
        mapper.evaluate(&at(200.0), VIEW, &layout);
        let style = mapper.style("hero").unwrap();
        assert_eq!(style.translate_y, 75.0);
        assert_eq!(style.opacity, 0.5);
        assert!((style.scale - 0.95).abs() < 1e-12);

        mapper.evaluate(&at(5000.0), VIEW, &layout);
        let style = mapper.style("hero").unwrap();
        assert_eq!(style.translate_y, 300.0);
        assert_eq!(style.opacity, 0.0);
    }

    #[test]
    fn bounds_cached_until_invalidated() {
        let mut layout = Layout::default();
        layout
            .bounds
            .insert("about".into(), Bounds::new(0.0, 1000.0, 1200.0, 400.0));
        let mut mapper = ScrollLinkedMapper::new();
        mapper.register(
            MappedElement::new("about", ScrollSource::ON_SCREEN)
                .bind(Channel::TranslateY, ProgressMapping::new([0.0, 1.0], [100.0, -100.0])),
        );
        mapper.evaluate(&at(800.0), VIEW, &layout);
        mapper.evaluate(&at(800.0), VIEW, &layout);
        assert_eq!(layout.measured.get(), 1);
        assert_eq!(mapper.style("about").unwrap().translate_y, 0.0);

        // Resize moved the element down by 600px.
        layout
            .bounds
            .insert("about".into(), Bounds::new(0.0, 1600.0, 1200.0, 400.0));
        mapper.invalidate_bounds();
        mapper.evaluate(&at(800.0), VIEW, &layout);
        assert_eq!(layout.measured.get(), 2);
        assert_eq!(mapper.progress("about"), Some(0.0));
        assert_eq!(mapper.style("about").unwrap().translate_y, 100.0);
    }

    #[test]
    fn missing_bounds_never_produce_nan() {
        let mut layout = Layout::default();
        let mut mapper = ScrollLinkedMapper::new();
        mapper.register(
            MappedElement::new("ghost", ScrollSource::ON_SCREEN)
                .bind(Channel::Opacity, ProgressMapping::new([0.0, 1.0], [0.2, 1.0])),
        );
        mapper.evaluate(&at(100.0), VIEW, &layout);
        assert_eq!(mapper.style("ghost").unwrap().opacity, 0.2);
        assert_eq!(mapper.progress("ghost"), None);

        layout
            .bounds
            .insert("ghost".into(), Bounds::new(0.0, 0.0, 100.0, 400.0));
        mapper.evaluate(&at(600.0), VIEW, &layout);
        let settled = mapper.style("ghost").unwrap().opacity;
        assert!(settled > 0.2);

        layout
            .bounds
            .insert("ghost".into(), Bounds::new(0.0, f64::NAN, 100.0, 400.0));
        mapper.invalidate_bounds();
        mapper.evaluate(&at(900.0), VIEW, &layout);
        assert_eq!(mapper.style("ghost").unwrap().opacity, settled);
    }

    #[test]
    fn smoothed_channel_follows_through_spring() {
        let layout = Layout::default();
        let mut mapper = ScrollLinkedMapper::new();
        mapper.register(MappedElement::new("nav", ScrollSource::Page).bind_smoothed(
            Channel::TranslateY,
            ProgressMapping::new([0.0, 100.0], [0.0, 100.0]),
            SpringConfig::SOFT,
        ));
        mapper.evaluate(&at(0.0), VIEW, &layout);
        mapper.evaluate(&at(100.0), VIEW, &layout);
        assert_eq!(mapper.style("nav").unwrap().translate_y, 0.0);
        mapper.advance(&ClockTick::new(16.0, 16.0));
        let y = mapper.style("nav").unwrap().translate_y;
        assert!(y > 0.0 && y < 100.0);
        assert!(!mapper.is_at_rest());
        for i in 0..600 {
            mapper.advance(&ClockTick::new(32.0 + i as f64 * 16.0, 16.0));
        }
        assert!(mapper.is_at_rest());
        assert_eq!(mapper.style("nav").unwrap().translate_y, 100.0);
    }

    #[test]
    fn register_replaces_and_remove_forgets() {
        let mut mapper = ScrollLinkedMapper::new();
        mapper.register(MappedElement::new("a", ScrollSource::Page));
        mapper.register(MappedElement::new("a", ScrollSource::Page));
        assert_eq!(mapper.len(), 1);
        assert!(mapper.remove("a"));
        assert!(!mapper.remove("a"));
        assert!(mapper.is_empty());
    }

    #[test]
    fn style_diff_and_channel_set() {
        let a = ComputedStyle::IDENTITY;
        let b = a.with(Channel::Opacity, 0.0).with(Channel::Rotate, -40.0);
        let changed = a.diff(&b);
        assert_eq!(changed, ChannelSet::OPACITY | ChannelSet::ROTATE);
        let listed: Vec<Channel> = changed.channels().collect();
        assert_eq!(listed, vec![Channel::Opacity, Channel::Rotate]);
        assert_eq!(a.lerp(&b, 0.5).rotate, -20.0);
    }
}
