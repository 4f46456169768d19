//! Normalized text model for OCR and transcription sources.
//!
//! This module defines the canonical, dialect-agnostic representation of the
//! text that sits on a canvas. ALTO XML, hOCR and IIIF annotations all parse
//! into the same [`ParsedText`]: lines in reading order, optionally split into
//! words, every rectangle in canvas pixel space.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Rectangles carry a coordinate-space marker so that
//!    source units (ALTO `mm10`, IIIF `percent:`) cannot be mixed with canvas
//!    pixels at compile time. Conversion goes through [`units`].
//!
//! 2. **Clipped Output**: Every parser finishes through
//!    [`ParsedText::clipped`], so all output rectangles lie within
//!    `[0, width] × [0, height]` whatever the source declared.
//!
//! 3. **Pure Parsing**: Parsers take a string and a canvas size and return a
//!    value. Fetching, caching and resolution of external references happen
//!    elsewhere.
//!
//! # Example
//!
//! ```
//! use textlayer::ir::{parse_source, CanvasSize, Rect, SourceDialect};
//!
//! let hocr = r#"<div class="ocr_page" title="bbox 0 0 100 100">
//!   <span class="ocr_line" title="bbox 10 10 90 20">
//!     <span class="ocrx_word" title="bbox 10 10 40 20">Hello</span>
//!   </span>
//! </div>"#;
//!
//! let parsed = parse_source(SourceDialect::Hocr, hocr, CanvasSize::new(100, 100)).unwrap();
//! assert_eq!(parsed.lines[0].text, "Hello");
//! assert_eq!(parsed.lines[0].rect, Rect::new(10.0, 10.0, 80.0, 10.0));
//! ```

mod dialect;
mod ids;
pub mod io_alto_xml;
pub mod io_hocr;
pub mod io_iiif_annotations;
mod model;
mod rect;
mod space;
pub mod units;

// Re-export core types for convenient access
pub use dialect::{parse_source, parse_source_with, SourceDialect};
pub use ids::{CanvasId, WindowId};
pub use model::{CanvasSize, Line, ParsedText, Word};
pub use rect::Rect;
pub use space::{Percent, Physical, Pixel};
pub use units::{MeasurementUnit, UnitConverter};
