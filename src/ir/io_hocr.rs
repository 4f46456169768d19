//! hOCR reader.
//!
//! hOCR is ordinary HTML where OCR structure is carried by class names
//! (`ocr_page`, `ocr_line`, `ocrx_word`, ...) and geometry by the `title`
//! attribute (`bbox x1 y1 x2 y2; x_wconf 93`). Coordinates are pixels of
//! the scanned page; when the page bbox differs from the canvas they are
//! rescaled.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use super::units::UnitConverter;
use super::{CanvasSize, Line, ParsedText, Pixel, Rect, SourceDialect, Word};
use crate::error::TextLayerError;

/// Class names that mark a line-level element.
const LINE_CLASSES: [&str; 5] = [
    "ocr_line",
    "ocrx_line",
    "ocr_caption",
    "ocr_textfloat",
    "ocr_header",
];

const WORD_CLASS: &str = "ocrx_word";

/// Parse hOCR markup into the normalized text model.
pub fn parse_hocr_str(html: &str, canvas: CanvasSize) -> Result<ParsedText, TextLayerError> {
    let document = Html::parse_document(html);

    let page_selector = selector(".ocr_page")?;
    let line_selector = selector(
        &LINE_CLASSES
            .iter()
            .map(|class| format!(".{class}"))
            .collect::<Vec<_>>()
            .join(", "),
    )?;
    let word_selector = selector(&format!(".{WORD_CLASS}"))?;

    let page = document.select(&page_selector).next();
    let line_nodes: Vec<ElementRef<'_>> = document
        .select(&line_selector)
        .filter(|line| !has_line_ancestor(*line))
        .collect();

    if page.is_none() && line_nodes.is_empty() {
        return Err(malformed("no ocr_page or line elements found"));
    }

    let page_bbox = match page {
        Some(page) => TitleProps::parse(page)?.bbox,
        None => None,
    };

    let mut raw_lines = Vec::with_capacity(line_nodes.len());
    for line_node in line_nodes {
        raw_lines.push(parse_line(line_node, &word_selector)?);
    }

    let (converter, extent) = match (page_bbox, canvas.is_empty()) {
        (Some(page), false) => (
            UnitConverter::from_extent(page.width, page.height, canvas),
            canvas,
        ),
        (None, false) => (UnitConverter::identity(), canvas),
        (page, true) => {
            let covered = page.unwrap_or_else(|| {
                raw_lines
                    .iter()
                    .fold(Rect::point(0.0, 0.0), |acc, line| acc.union(&line.rect))
            });
            let extent = CanvasSize::new(
                to_pixel_dim(covered.right()),
                to_pixel_dim(covered.bottom()),
            );
            (UnitConverter::identity(), extent)
        }
    };

    let lines = raw_lines
        .into_iter()
        .map(|mut line| {
            line.rect = converter.rescale(&line.rect);
            for word in &mut line.words {
                word.rect = converter.rescale(&word.rect);
            }
            line
        })
        .collect();

    Ok(ParsedText::clipped(extent, lines))
}

/// Parse hOCR from bytes (must be valid UTF-8).
pub fn from_hocr_slice(bytes: &[u8], canvas: CanvasSize) -> Result<ParsedText, TextLayerError> {
    let html = std::str::from_utf8(bytes)
        .map_err(|source| malformed(format!("input is not valid UTF-8: {source}")))?;
    parse_hocr_str(html, canvas)
}

fn parse_line(line_node: ElementRef<'_>, word_selector: &Selector) -> Result<Line, TextLayerError> {
    let props = TitleProps::parse(line_node)?;
    let line_style = props.style();

    let mut words = Vec::new();
    let mut word_props = Vec::new();
    for word_node in line_node.select(word_selector) {
        let text = normalize_whitespace(word_node.text());
        if text.is_empty() {
            continue;
        }
        word_props.push((TitleProps::parse(word_node)?, text));
    }

    let line_rect = props.bbox.unwrap_or_else(|| {
        word_props
            .iter()
            .filter_map(|(props, _)| props.bbox)
            .reduce(|acc, rect| acc.union(&rect))
            .unwrap_or_else(|| Rect::point(0.0, 0.0))
    });

    for (props, text) in word_props {
        let mut word = Word::new(
            props
                .bbox
                .unwrap_or_else(|| Rect::point(line_rect.x, line_rect.y)),
            text,
        );
        word.confidence = props.confidence;
        word.style = props.style();
        words.push(word);
    }

    let mut line = if words.is_empty() {
        Line::text_only(line_rect, normalize_whitespace(line_node.text()))
    } else {
        Line::from_words(line_rect, words)
    };
    line.style = line_style;
    Ok(line)
}

/// Properties encoded in an hOCR `title` attribute.
#[derive(Debug, Default)]
struct TitleProps {
    bbox: Option<Rect<Pixel>>,
    confidence: Option<f64>,
    font: Option<String>,
    font_size: Option<String>,
}

impl TitleProps {
    fn parse(element: ElementRef<'_>) -> Result<Self, TextLayerError> {
        let mut props = TitleProps::default();
        let Some(title) = element.value().attr("title") else {
            return Ok(props);
        };

        for property in title.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = match property.split_once(char::is_whitespace) {
                Some((key, value)) => (key.trim_end_matches(':'), value.trim()),
                None => (property.trim_end_matches(':'), ""),
            };
            match key {
                "bbox" => props.bbox = Some(parse_bbox(value)?),
                "x_wconf" => {
                    props.confidence = value
                        .parse::<f64>()
                        .ok()
                        .filter(|wconf| wconf.is_finite())
                        .map(|wconf| (wconf / 100.0).clamp(0.0, 1.0));
                }
                "x_font" => props.font = Some(value.trim_matches('"').to_string()),
                "x_fsize" => props.font_size = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(props)
    }

    fn style(&self) -> BTreeMap<String, String> {
        let mut style = BTreeMap::new();
        if let Some(font) = self.font.as_ref().filter(|font| !font.is_empty()) {
            style.insert("font-family".to_string(), font.clone());
        }
        if let Some(size) = self.font_size.as_ref().filter(|size| !size.is_empty()) {
            style.insert("font-size".to_string(), size.clone());
        }
        style
    }
}

fn parse_bbox(raw: &str) -> Result<Rect<Pixel>, TextLayerError> {
    let values = raw
        .split_whitespace()
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    malformed(format!(
                        "invalid bbox value '{part}' in '{raw}'; expected a number"
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [x1, y1, x2, y2] => Ok(Rect::from_corners(*x1, *y1, *x2, *y2)),
        _ => Err(malformed(format!(
            "bbox '{raw}' must have exactly four coordinates"
        ))),
    }
}

fn has_line_ancestor(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().classes().any(|class| LINE_CLASSES.contains(&class)))
}

fn normalize_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_pixel_dim(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.ceil().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

fn selector(css: &str) -> Result<Selector, TextLayerError> {
    Selector::parse(css).map_err(|source| malformed(format!("invalid selector '{css}': {source:?}")))
}

fn malformed(message: impl Into<String>) -> TextLayerError {
    TextLayerError::malformed(SourceDialect::Hocr, message)
}
