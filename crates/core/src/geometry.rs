//! Normalized page geometry.
//!
//! All sizing decisions are made in page-fraction coordinates with a top-left
//! origin: `left` grows rightwards, `top` grows downwards, and the page is the
//! unit square. Pixel measurements are converted through [`crate::raster`].

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing page-fraction coordinates.
pub const GEOM_EPSILON: f64 = 1e-9;

/// Axis-aligned box in normalized page coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Horizontal or vertical axis of a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

impl NormBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Builds a box from its four edges.
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            width: right - left,
            height: bottom - top,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Start coordinate along an axis.
    pub fn start(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.left,
            Axis::Vertical => self.top,
        }
    }

    /// End coordinate along an axis.
    pub fn end(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.right(),
            Axis::Vertical => self.bottom(),
        }
    }

    /// Extent along an axis.
    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Returns a copy with the span along `axis` replaced by `[start, end)`.
    pub fn with_span(&self, axis: Axis, start: f64, end: f64) -> NormBox {
        match axis {
            Axis::Horizontal => NormBox::new(start, self.top, end - start, self.height),
            Axis::Vertical => NormBox::new(self.left, start, self.width, end - start),
        }
    }

    /// True when every component is finite and width and height are positive.
    pub fn is_non_degenerate(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// True when the box lies inside the unit page.
    pub fn is_within_page(&self) -> bool {
        self.left >= -GEOM_EPSILON
            && self.top >= -GEOM_EPSILON
            && self.right() <= 1.0 + GEOM_EPSILON
            && self.bottom() <= 1.0 + GEOM_EPSILON
    }

    /// Intersection with another box, only when its area is non-zero.
    pub fn intersection(&self, other: &NormBox) -> Option<NormBox> {
        let left = self.left.max(other.left);
        let right = self.right().min(other.right());
        let top = self.top.max(other.top);
        let bottom = self.bottom().min(other.bottom());
        if right - left > GEOM_EPSILON && bottom - top > GEOM_EPSILON {
            Some(NormBox::from_edges(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn intersection_area(&self, other: &NormBox) -> f64 {
        self.intersection(other).map_or(0.0, |o| o.area())
    }

    pub fn overlaps(&self, other: &NormBox) -> bool {
        self.intersection(other).is_some()
    }
}

/// Result of fitting one axis of a box onto the page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpanFit {
    pub start: f64,
    pub end: f64,
    /// Part of the span was outside `[0, 1]` and was cut or shifted.
    pub clamped: bool,
    /// The requested span was empty, negative or non-finite.
    pub collapsed: bool,
}

/// Fits `[start, end)` inside `[0, 1]` with a length of at least `floor`.
///
/// Overhang is cut first; a span that ends up shorter than `floor` is grown
/// back to `floor`, shifting inward when it would leave the page.
pub(crate) fn fit_span(start: f64, end: f64, floor: f64) -> SpanFit {
    let mut clamped = false;
    let mut collapsed = false;
    let (mut a, mut b) = if start.is_finite() && end.is_finite() {
        (start, end)
    } else {
        collapsed = true;
        (0.0, 0.0)
    };

    if a < 0.0 {
        a = 0.0;
        clamped = true;
    }
    if a > 1.0 {
        a = 1.0;
        clamped = true;
    }
    if b > 1.0 {
        b = 1.0;
        clamped = true;
    }
    if b < 0.0 {
        b = 0.0;
        clamped = true;
    }
    if b - a <= 0.0 {
        collapsed = true;
        b = a;
    }

    let floor = floor.clamp(0.0, 1.0);
    if b - a < floor {
        b = a + floor;
        if b > 1.0 {
            b = 1.0;
            a = 1.0 - floor;
            clamped = true;
        }
    }

    SpanFit {
        start: a,
        end: b,
        clamped,
        collapsed,
    }
}
