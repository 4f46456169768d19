//! Conversion of source-unit coordinates into canvas pixel space.
//!
//! Every source declares geometry in its own unit system. The converter is
//! an explicit per-axis scale so that the physical-to-pixel ratio a parse
//! used can be inspected and tested instead of hiding in a constant.

use super::rect::Rect;
use super::space::{Percent, Physical, Pixel};
use super::CanvasSize;

/// DPI assumed for physical units when a document declares no page extent.
pub const DEFAULT_FALLBACK_DPI: f64 = 300.0;

/// Measurement units an ALTO document can declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeasurementUnit {
    /// Plain pixels.
    #[default]
    Pixel,
    /// Tenths of a millimetre.
    Mm10,
    /// 1/1200 of an inch.
    Inch1200,
}

impl MeasurementUnit {
    /// Parses the `MeasurementUnit` element text. Unknown units return `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pixel" | "px" => Some(Self::Pixel),
            "mm10" => Some(Self::Mm10),
            "inch1200" => Some(Self::Inch1200),
            _ => None,
        }
    }

    /// Pixels per unit at the given resolution.
    pub fn pixels_per_unit(&self, dpi: f64) -> f64 {
        match self {
            Self::Pixel => 1.0,
            Self::Mm10 => dpi / 254.0,
            Self::Inch1200 => dpi / 1200.0,
        }
    }
}

/// Per-axis scale from a source unit system onto canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitConverter {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::identity()
    }
}

impl UnitConverter {
    /// A converter that leaves values unchanged.
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// A uniform converter.
    pub fn uniform(scale: f64) -> Self {
        Self {
            scale_x: scale,
            scale_y: scale,
        }
    }

    /// Maps a declared source extent onto the canvas:
    /// `pixel = value × canvas_pixels / source_units`, per axis.
    ///
    /// Falls back to identity on an axis whose source extent is not a
    /// positive finite number.
    pub fn from_extent(source_width: f64, source_height: f64, canvas: CanvasSize) -> Self {
        Self {
            scale_x: axis_ratio(f64::from(canvas.width), source_width),
            scale_y: axis_ratio(f64::from(canvas.height), source_height),
        }
    }

    /// Converter for a unit at a given resolution, used when no extent is declared.
    pub fn from_unit(unit: MeasurementUnit, dpi: f64) -> Self {
        Self::uniform(unit.pixels_per_unit(dpi))
    }

    #[inline]
    pub fn x(&self, value: f64) -> f64 {
        value * self.scale_x
    }

    #[inline]
    pub fn y(&self, value: f64) -> f64 {
        value * self.scale_y
    }

    /// Converts a rectangle in document units to canvas pixels.
    pub fn to_pixel(&self, rect: &Rect<Physical>) -> Rect<Pixel> {
        Rect::new(
            self.x(rect.x),
            self.y(rect.y),
            self.x(rect.width),
            self.y(rect.height),
        )
    }

    /// Rescales a rectangle that is already in pixels of a different raster
    /// (e.g. an hOCR page scanned at another resolution than the canvas).
    pub fn rescale(&self, rect: &Rect<Pixel>) -> Rect<Pixel> {
        Rect::new(
            self.x(rect.x),
            self.y(rect.y),
            self.x(rect.width),
            self.y(rect.height),
        )
    }
}

/// Converts a percentage rectangle (0..100 on each axis) into canvas pixels.
pub fn percent_to_pixel(rect: &Rect<Percent>, canvas: CanvasSize) -> Rect<Pixel> {
    let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));
    Rect::new(
        rect.x * w / 100.0,
        rect.y * h / 100.0,
        rect.width * w / 100.0,
        rect.height * h / 100.0,
    )
}

fn axis_ratio(canvas_pixels: f64, source_units: f64) -> f64 {
    if canvas_pixels > 0.0 && source_units.is_finite() && source_units > 0.0 {
        canvas_pixels / source_units
    } else {
        1.0
    }
}
