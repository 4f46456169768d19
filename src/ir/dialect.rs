//! Source dialects and dispatch to their parsers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::io_alto_xml::{self, AltoOptions};
use super::{io_hocr, io_iiif_annotations, CanvasSize, ParsedText};
use crate::error::TextLayerError;

/// The markup dialects a text source can be written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceDialect {
    Alto,
    Hocr,
    IiifAnnotation,
}

impl SourceDialect {
    /// Human-readable name for the dialect.
    pub fn name(&self) -> &'static str {
        match self {
            SourceDialect::Alto => "ALTO",
            SourceDialect::Hocr => "hOCR",
            SourceDialect::IiifAnnotation => "IIIF annotation",
        }
    }

    /// Classifies a declared media type.
    ///
    /// Returns `None` for absent or ambiguous types such as `text/xml` or
    /// `text/html`, which need [`SourceDialect::sniff`]. A `profile`
    /// parameter on the media type is honoured.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let lowered = media_type.trim().to_ascii_lowercase();
        let mut parts = lowered.split(';').map(str::trim);
        let essence = parts.next().unwrap_or_default();

        let by_essence = match essence {
            "application/xml+alto" | "application/alto+xml" | "text/xml+alto" => Some(Self::Alto),
            "text/vnd.hocr+html" | "text/html+hocr" | "application/vnd.hocr+html" => {
                Some(Self::Hocr)
            }
            _ => None,
        };
        if by_essence.is_some() {
            return by_essence;
        }

        let profile = parts
            .filter_map(|param| param.strip_prefix("profile="))
            .map(|value| value.trim_matches('"'))
            .next();
        if let Some(dialect) = profile.and_then(Self::from_profile) {
            return Some(dialect);
        }

        match essence {
            "application/ld+json" | "application/json" => Some(Self::IiifAnnotation),
            _ => None,
        }
    }

    /// Classifies a `profile` URI such as the ALTO schema namespace.
    pub fn from_profile(profile: &str) -> Option<Self> {
        let lowered = profile.to_ascii_lowercase();
        if lowered.contains("alto") {
            Some(Self::Alto)
        } else if lowered.contains("hocr") {
            Some(Self::Hocr)
        } else if lowered.contains("iiif.io/api/presentation") {
            Some(Self::IiifAnnotation)
        } else {
            None
        }
    }

    /// Guesses the dialect from the content itself.
    pub fn sniff(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Some(Self::IiifAnnotation);
        }
        let head: String = trimmed.chars().take(4096).collect();
        let head = head.to_ascii_lowercase();
        if head.contains("<alto") || head.contains(":alto") {
            Some(Self::Alto)
        } else if head.contains("ocr_page")
            || head.contains("ocr_line")
            || head.contains("ocrx_word")
            || head.contains("ocr-system")
        {
            Some(Self::Hocr)
        } else {
            None
        }
    }

    /// Picks a dialect: declared media type first, content sniffing otherwise.
    pub fn detect(media_type: Option<&str>, raw: &str) -> Result<Self, TextLayerError> {
        media_type
            .and_then(Self::from_media_type)
            .or_else(|| Self::sniff(raw))
            .ok_or_else(|| {
                TextLayerError::UnsupportedFormat(format!(
                    "could not determine text dialect (declared media type: {})",
                    media_type.unwrap_or("none")
                ))
            })
    }
}

impl fmt::Display for SourceDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses `raw` with the parser for `dialect`.
///
/// IIIF input here is taken as-is: external resources are not resolved and
/// non-text annotations are filtered out. The orchestrator resolves external
/// content before it gets this far.
pub fn parse_source(
    dialect: SourceDialect,
    raw: &str,
    canvas: CanvasSize,
) -> Result<ParsedText, TextLayerError> {
    parse_source_with(dialect, raw, canvas, &AltoOptions::default())
}

/// [`parse_source`] with explicit ALTO options.
pub fn parse_source_with(
    dialect: SourceDialect,
    raw: &str,
    canvas: CanvasSize,
    alto: &AltoOptions,
) -> Result<ParsedText, TextLayerError> {
    match dialect {
        SourceDialect::Alto => io_alto_xml::parse_alto_str(raw, canvas, alto),
        SourceDialect::Hocr => io_hocr::parse_hocr_str(raw, canvas),
        SourceDialect::IiifAnnotation => {
            io_iiif_annotations::parse_annotation_list_str(raw, canvas)
        }
    }
}
