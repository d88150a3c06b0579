#![forbid(unsafe_code)]

//! Navigation support: active-section tracking and scroll-linked chrome.
//!
//! Unlike [`ViewportTrigger`](crate::trigger::ViewportTrigger) the tracker is
//! repeatable. A section becomes active each time its visible fraction
//! crosses the threshold from below, so scrolling back up re-activates
//! earlier sections.

use crate::animation::Curve;
use crate::config::{ConfigError, check_ordered, check_range};
use crate::geometry::Bounds;
use crate::mapper::ProgressMapping;
use crate::reveal::RevealSpec;

/// Navigation configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavConfig {
    /// Visible fraction at which a section becomes active.
    /// Default: 0.3
    pub threshold: f64,
    /// Scroll offsets over which the bar's chrome fades in.
    /// Default: [0, 100]
    pub chrome_range: [f64; 2],
    /// Default: [0, 0.9]
    pub background_alpha: [f64; 2],
    /// Default: [0, 1]
    pub border_alpha: [f64; 2],
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            chrome_range: [0.0, 100.0],
            background_alpha: [0.0, 0.9],
            border_alpha: [0.0, 1.0],
        }
    }
}

impl NavConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("nav.threshold", self.threshold, 0.0, 1.0)?;
        check_ordered("nav.chrome_range", self.chrome_range[0], self.chrome_range[1])?;
        for v in self.background_alpha {
            check_range("nav.background_alpha", v, 0.0, 1.0)?;
        }
        for v in self.border_alpha {
            check_range("nav.border_alpha", v, 0.0, 1.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct TrackedSection {
    id: String,
    bounds: Option<Bounds>,
    above: bool,
}

/// Tracks which section is currently highlighted in the navigation.
#[derive(Debug, Clone)]
pub struct SectionTracker {
    threshold: f64,
    sections: Vec<TrackedSection>,
    active: Option<String>,
}

impl SectionTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            sections: Vec::new(),
            active: None,
        }
    }

    /// Start tracking `id`. Declaring an existing id is a no-op.
    pub fn declare(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.sections.iter().all(|s| s.id != id) {
            self.sections.push(TrackedSection {
                id,
                bounds: None,
                above: false,
            });
        }
    }

    /// Update the measured bounds of `id`, declaring it if needed.
    pub fn set_bounds(&mut self, id: &str, bounds: Option<Bounds>) {
        let bounds = bounds.filter(Bounds::is_valid);
        match self.sections.iter_mut().find(|s| s.id == id) {
            Some(section) => section.bounds = bounds,
            None => self.sections.push(TrackedSection {
                id: id.to_string(),
                bounds,
                above: false,
            }),
        }
    }

    /// Stop tracking `id`.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.id != id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        self.sections.len() != before
    }

    /// Recompute crossings against `visible`. Returns the newly active id
    /// when it changed.
    ///
    /// When several sections cross in the same pass the one showing the
    /// largest fraction wins; ties go to the later section.
    pub fn evaluate(&mut self, visible: &Bounds) -> Option<&str> {
        let mut winner: Option<(usize, f64)> = None;
        for (idx, section) in self.sections.iter_mut().enumerate() {
            let fraction = section
                .bounds
                .map_or(0.0, |b| b.visible_fraction(visible));
            let above = fraction > 0.0 && fraction >= self.threshold;
            if above && !section.above && winner.is_none_or(|(_, best)| fraction >= best) {
                winner = Some((idx, fraction));
            }
            section.above = above;
        }
        let (idx, _) = winner?;
        let id = &self.sections[idx].id;
        if self.active.as_deref() == Some(id.as_str()) {
            return None;
        }
        crate::debug!(section = id.as_str(), "active section changed");
        self.active = Some(id.clone());
        self.active.as_deref()
    }

    /// Currently highlighted section.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Document offset of the top of `id`, for navigation clicks.
    pub fn top_of(&self, id: &str) -> Option<f64> {
        self.sections
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| s.bounds)
            .map(|b| b.top())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Navigation bar chrome at one scroll offset.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChromeStyle {
    pub background_alpha: f64,
    pub border_alpha: f64,
}

/// Scroll-linked navigation bar background and border.
#[derive(Debug, Clone)]
pub struct NavChrome {
    background: ProgressMapping,
    border: ProgressMapping,
}

impl NavChrome {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            background: ProgressMapping::new(config.chrome_range, config.background_alpha),
            border: ProgressMapping::new(config.chrome_range, config.border_alpha),
        }
    }

    /// Chrome for page scroll offset `offset`.
    pub fn at(&self, offset: f64) -> ChromeStyle {
        ChromeStyle {
            background_alpha: self.background.map(offset),
            border_alpha: self.border.map(offset),
        }
    }

    /// Entrance for the mobile menu links: rise 80px and fade in, 100ms
    /// apart, after a 300ms delay.
    pub fn menu_reveal<I, S>(links: I) -> RevealSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RevealSpec::fade_up(links, 80.0)
            .stagger_ms(100.0)
            .duration_ms(800.0)
            .delay_ms(300.0)
            .curve(Curve::EaseOutQuart)
    }
}

impl Default for NavChrome {
    fn default() -> Self {
        Self::new(&NavConfig::default())
    }
}
