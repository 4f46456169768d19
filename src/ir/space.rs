//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! between the unit systems source documents declare and the canvas pixel
//! space every parser normalizes into.

use std::fmt;

/// Marker type for canvas pixel coordinates (absolute values).
///
/// This is the only space that leaves a parser: every rectangle in a
/// [`ParsedText`](super::ParsedText) is in pixel space, origin top-left.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for percentage coordinates (0.0 to 100.0).
///
/// Used by `xywh=percent:` media fragments on IIIF annotation targets.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Percent {}

/// Marker type for coordinates in a document's declared measurement unit.
///
/// ALTO files may declare `pixel`, `mm10` or `inch1200`; values stay in this
/// space until a [`UnitConverter`](super::UnitConverter) maps them onto the
/// canvas.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Physical {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {} // This is unreachable since Pixel has no variants
    }
}

impl fmt::Debug for Percent {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Physical {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
