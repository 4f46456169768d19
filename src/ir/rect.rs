//! Axis-aligned rectangles in XYWH form.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// An axis-aligned rectangle with its top-left corner at (`x`, `y`).
///
/// The `TSpace` parameter should be one of [`Pixel`](super::Pixel),
/// [`Percent`](super::Percent) or [`Physical`](super::Physical), so that
/// source-unit values cannot leak into canvas output unconverted.
///
/// The constructor does not reject negative sizes; sources are sloppy and
/// [`Rect::clip_to`] is where pixel output gets made well-formed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect<TSpace> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Rect<TSpace> {
    /// Creates a rectangle from its top-left corner and size.
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            _space: PhantomData,
        }
    }

    /// Creates a rectangle from two corners (`x1`, `y1`) and (`x2`, `y2`).
    ///
    /// This is how hOCR `bbox` properties are written.
    #[inline]
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// A zero-area rectangle anchored at (`x`, `y`).
    #[inline]
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns the area of the rectangle.
    ///
    /// May be negative if the rectangle is malformed.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Returns true if all values are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Returns true if `other` lies entirely inside `self` (edges inclusive).
    pub fn contains(&self, other: &Rect<TSpace>) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect<TSpace>) -> Rect<TSpace> {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Clips the rectangle into `[0, max_width] × [0, max_height]`.
    ///
    /// Negative sizes are flipped first, non-finite values collapse to zero.
    /// The result always satisfies `0 <= x`, `0 <= y`,
    /// `x + width <= max_width` and `y + height <= max_height`.
    pub fn clip_to(&self, max_width: f64, max_height: f64) -> Rect<TSpace> {
        let (x1, x2) = clip_span(self.x, self.width, max_width);
        let (y1, y2) = clip_span(self.y, self.height, max_height);
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }
}

fn clip_span(start: f64, len: f64, max: f64) -> (f64, f64) {
    let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
    let start = if start.is_finite() { start } else { 0.0 };
    let end = if len.is_finite() { start + len } else { start };
    let (lo, hi) = if end < start { (end, start) } else { (start, end) };
    (lo.clamp(0.0, max), hi.clamp(0.0, max))
}

impl<TSpace> std::fmt::Debug for Rect<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rect")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for Rect<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

// Custom serde implementation to avoid TSpace: Serialize/Deserialize bounds
impl<TSpace> Serialize for Rect<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Rect", 4)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for Rect<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RectData {
            x: f64,
            y: f64,
            width: f64,
            height: f64,
        }
        let data = RectData::deserialize(deserializer)?;
        Ok(Rect::new(data.x, data.y, data.width, data.height))
    }
}
