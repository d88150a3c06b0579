#![forbid(unsafe_code)]

//! CSS-style cubic Bézier easing.
//!
//! The curve runs from (0, 0) to (1, 1) through two control points. Solving
//! for `y` at a given `x` uses a few Newton iterations and falls back to
//! bisection when the derivative is too flat.

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_MIN_SLOPE: f64 = 1e-6;
const SUBDIVISION_PRECISION: f64 = 1e-7;
const SUBDIVISION_MAX_ITERATIONS: usize = 20;

/// `cubic-bezier(x1, y1, x2, y2)`.
///
/// `x1` and `x2` are clamped to [0, 1] so the curve stays a function of `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl CubicBezier {
    /// Create a curve from its two control points.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let finite = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        Self {
            x1: finite(x1, 0.0).clamp(0.0, 1.0),
            y1: finite(y1, 0.0),
            x2: finite(x2, 1.0).clamp(0.0, 1.0),
            y2: finite(y2, 1.0),
        }
    }

    /// `cubic-bezier(0.16, 1, 0.3, 1)`: very fast start, long soft landing.
    pub fn soft_out() -> Self {
        Self::new(0.16, 1.0, 0.3, 1.0)
    }

    /// `cubic-bezier(0.76, 0, 0.24, 1)`: symmetric in-out used for overlays.
    pub fn curtain() -> Self {
        Self::new(0.76, 0.0, 0.24, 1.0)
    }

    /// Control points as `(x1, y1, x2, y2)`.
    pub fn control_points(&self) -> (f64, f64, f64, f64) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    /// Evaluate `y` for `x` in [0, 1].
    pub fn apply(&self, x: f64) -> f64 {
        if x.is_nan() || x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        if self.x1 == self.y1 && self.x2 == self.y2 {
            return x;
        }
        let t = self.solve_t(x);
        sample(self.y1, self.y2, t)
    }

    fn solve_t(&self, x: f64) -> f64 {
        let mut t = x;
        for _ in 0..NEWTON_ITERATIONS {
            let slope = slope(self.x1, self.x2, t);
            if slope.abs() < NEWTON_MIN_SLOPE {
                break;
            }
            let err = sample(self.x1, self.x2, t) - x;
            if err.abs() < SUBDIVISION_PRECISION {
                return t;
            }
            t -= err / slope;
        }

        let (mut lo, mut hi) = (0.0, 1.0);
        t = x;
        for _ in 0..SUBDIVISION_MAX_ITERATIONS {
            let err = sample(self.x1, self.x2, t) - x;
            if err.abs() < SUBDIVISION_PRECISION {
                break;
            }
            if err > 0.0 {
                hi = t;
            } else {
                lo = t;
            }
            t = (lo + hi) / 2.0;
        }
        t
    }
}

// B(t) for one axis with endpoints 0 and 1.
#[inline]
fn sample(p1: f64, p2: f64, t: f64) -> f64 {
    let c = 3.0 * p1;
    let b = 3.0 * (p2 - p1) - c;
    let a = 1.0 - c - b;
    ((a * t + b) * t + c) * t
}

#[inline]
fn slope(p1: f64, p2: f64, t: f64) -> f64 {
    let c = 3.0 * p1;
    let b = 3.0 * (p2 - p1) - c;
    let a = 1.0 - c - b;
    (3.0 * a * t + 2.0 * b) * t + c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_exact() {
        let curve = CubicBezier::soft_out();
        assert_eq!(curve.apply(0.0), 0.0);
        assert_eq!(curve.apply(1.0), 1.0);
        assert_eq!(curve.apply(-3.0), 0.0);
        assert_eq!(curve.apply(7.0), 1.0);
    }

    #[test]
    fn diagonal_is_linear() {
        let curve = CubicBezier::new(0.3, 0.3, 0.7, 0.7);
        assert!((curve.apply(0.42) - 0.42).abs() < 1e-12);
    }

    #[test]
    fn soft_out_front_loads_progress() {
        let curve = CubicBezier::soft_out();
        assert!(curve.apply(0.2) > 0.6);
    }

    #[test]
    fn curtain_is_symmetric() {
        let curve = CubicBezier::curtain();
        let a = curve.apply(0.25);
        let b = curve.apply(0.75);
        assert!((a + b - 1.0).abs() < 1e-4, "a={a} b={b}");
        assert!((curve.apply(0.5) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn monotonic_for_monotone_controls() {
        let curve = CubicBezier::curtain();
        let mut prev = 0.0;
        for i in 0..=200 {
            let v = curve.apply(i as f64 / 200.0);
            assert!(v >= prev - 1e-9);
            prev = v;
        }
    }

    #[test]
    fn control_x_clamped() {
        let curve = CubicBezier::new(-1.0, 0.0, 2.0, 1.0);
        let (x1, _, x2, _) = curve.control_points();
        assert_eq!(x1, 0.0);
        assert_eq!(x2, 1.0);
    }
}
