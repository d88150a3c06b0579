#![forbid(unsafe_code)]

//! Geometric primitives in CSS pixels.
//!
//! Element bounds are expressed in document coordinates (origin at the top
//! of the page, `y` grows downward), so they do not change while scrolling.
//! The visible area at a given scroll offset is [`Viewport::visible_rect`].

/// An axis-aligned rectangle in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Bounds {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top edge. Alias for `self.y`.
    #[inline]
    pub const fn top(&self) -> f64 {
        self.y
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Left edge. Alias for `self.x`.
    #[inline]
    pub const fn left(&self) -> f64 {
        self.x
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Area in square pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Zero or negative extent on either axis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// All four components are finite and the extents are not negative.
    ///
    /// Elements that have not been laid out yet often report NaN or
    /// negative sizes; callers treat such bounds as missing.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// Check if a point is inside the rectangle (right/bottom exclusive).
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Compute the overlap with another rectangle.
    ///
    /// Returns `None` when the rectangles do not overlap. Touching edges
    /// produce a zero-area intersection.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < x || bottom < y {
            return None;
        }
        Some(Bounds::new(x, y, right - x, bottom - y))
    }

    /// Grow every side by `margin` (shrink when negative).
    ///
    /// Extents never go below zero; a rectangle shrunk past its center
    /// collapses onto the center line.
    pub fn inflate(&self, margin: f64) -> Bounds {
        let width = self.width + 2.0 * margin;
        let height = self.height + 2.0 * margin;
        let (x, width) = if width < 0.0 {
            (self.x + self.width / 2.0, 0.0)
        } else {
            (self.x - margin, width)
        };
        let (y, height) = if height < 0.0 {
            (self.y + self.height / 2.0, 0.0)
        } else {
            (self.y - margin, height)
        };
        Bounds::new(x, y, width, height)
    }

    /// Fraction of `self` that lies inside `area`, in [0, 1].
    ///
    /// Zero-area elements count as fully visible while their origin is
    /// inside `area`.
    pub fn visible_fraction(&self, area: &Bounds) -> f64 {
        if !self.is_valid() || !area.is_valid() {
            return 0.0;
        }
        if self.is_empty() {
            let inside = self.x >= area.x
                && self.x <= area.right()
                && self.y >= area.y
                && self.y <= area.bottom();
            return if inside { 1.0 } else { 0.0 };
        }
        match self.intersection(area) {
            Some(overlap) => (overlap.area() / self.area()).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

/// The size of the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

impl Viewport {
    /// Create a viewport of the given size.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Document-space rectangle visible at vertical scroll `offset`.
    #[inline]
    pub fn visible_rect(&self, offset: f64) -> Bounds {
        Bounds::new(0.0, offset, self.width.max(0.0), self.height.max(0.0))
    }

    /// Map a client-space pointer position to normalized device
    /// coordinates: x in [-1, 1] left to right, y in [-1, 1] bottom to top.
    pub fn normalize_pointer(&self, x: f64, y: f64) -> (f64, f64) {
        if !(self.width > 0.0 && self.height > 0.0) || !x.is_finite() || !y.is_finite() {
            return (0.0, 0.0);
        }
        let nx = (x / self.width) * 2.0 - 1.0;
        let ny = -(y / self.height) * 2.0 + 1.0;
        (nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_overlap() {
        let a = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let b = Bounds::new(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Bounds::new(50.0, 50.0, 50.0, 50.0)));
    }

    #[test]
    fn intersection_disjoint() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(20.0, 20.0, 5.0, 5.0);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn inflate_and_shrink() {
        let r = Bounds::new(10.0, 10.0, 100.0, 50.0);
        assert_eq!(r.inflate(5.0), Bounds::new(5.0, 5.0, 110.0, 60.0));
        assert_eq!(r.inflate(-10.0), Bounds::new(20.0, 20.0, 80.0, 30.0));
        let collapsed = r.inflate(-40.0);
        assert_eq!(collapsed.height, 0.0);
        assert_eq!(collapsed.y, 35.0);
    }

    #[test]
    fn visible_fraction_partial() {
        let element = Bounds::new(0.0, 900.0, 100.0, 200.0);
        let view = Viewport::new(100.0, 1000.0).visible_rect(0.0);
        assert!((element.visible_fraction(&view) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn visible_fraction_rejects_nan() {
        let element = Bounds::new(0.0, f64::NAN, 100.0, 200.0);
        let view = Viewport::new(100.0, 1000.0).visible_rect(0.0);
        assert_eq!(element.visible_fraction(&view), 0.0);
    }

    #[test]
    fn zero_area_element() {
        let view = Viewport::new(100.0, 100.0).visible_rect(0.0);
        assert_eq!(Bounds::new(10.0, 10.0, 0.0, 0.0).visible_fraction(&view), 1.0);
        assert_eq!(Bounds::new(10.0, 500.0, 0.0, 0.0).visible_fraction(&view), 0.0);
    }

    #[test]
    fn normalize_pointer_corners() {
        let vp = Viewport::new(200.0, 100.0);
        assert_eq!(vp.normalize_pointer(0.0, 0.0), (-1.0, 1.0));
        assert_eq!(vp.normalize_pointer(200.0, 100.0), (1.0, -1.0));
        assert_eq!(vp.normalize_pointer(100.0, 50.0), (0.0, 0.0));
        assert_eq!(Viewport::default().normalize_pointer(5.0, 5.0), (0.0, 0.0));
    }
}
