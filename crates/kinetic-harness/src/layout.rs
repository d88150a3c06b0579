#![forbid(unsafe_code)]

//! Static page geometry for headless runs.

use std::collections::BTreeMap;

use kinetic_core::mapper::LayoutProvider;
use kinetic_core::Bounds;
use serde::{Deserialize, Serialize};

/// A laid-out page: named element bounds plus the document height.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub elements: BTreeMap<String, Bounds>,
}

impl PageLayout {
    /// Stack sections of the given heights top to bottom, full width.
    pub fn stacked<I, S>(width: f64, sections: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut elements = BTreeMap::new();
        let mut top = 0.0;
        for (id, height) in sections {
            elements.insert(id.into(), Bounds::new(0.0, top, width, height));
            top += height;
        }
        Self {
            width,
            height: top,
            elements,
        }
    }

    /// Add an element at `offset` from the top of `section`. Unknown
    /// sections place it relative to the document top.
    #[must_use]
    pub fn with_child(mut self, section: &str, key: impl Into<String>, offset: f64, height: f64) -> Self {
        let top = self.elements.get(section).map_or(0.0, |b| b.y) + offset;
        self.elements
            .insert(key.into(), Bounds::new(0.0, top, self.width, height));
        self
    }

    /// Top of `key`, if laid out.
    pub fn top_of(&self, key: &str) -> Option<f64> {
        self.elements.get(key).map(|b| b.y)
    }
}

impl LayoutProvider for PageLayout {
    fn bounds(&self, key: &str) -> Option<Bounds> {
        self.elements.get(key).copied()
    }

    fn document_height(&self) -> Option<f64> {
        Some(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacked_sections_are_contiguous() {
        let page = PageLayout::stacked(1200.0, [("a", 500.0), ("b", 700.0)]);
        assert_eq!(page.bounds("a"), Some(Bounds::new(0.0, 0.0, 1200.0, 500.0)));
        assert_eq!(page.bounds("b"), Some(Bounds::new(0.0, 500.0, 1200.0, 700.0)));
        assert_eq!(page.document_height(), Some(1200.0));
    }

    #[test]
    fn children_are_placed_inside_their_section() {
        let page = PageLayout::stacked(1000.0, [("a", 500.0), ("b", 700.0)]).with_child("b", "b-title", 80.0, 60.0);
        assert_eq!(page.top_of("b-title"), Some(580.0));
        assert_eq!(page.bounds("missing"), None);
    }
}
