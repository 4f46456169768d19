//! ALTO XML reader.
//!
//! Walks `Layout/Page` down through print space, (composed) text blocks and
//! text lines. Every `TextLine` becomes a [`Line`], every `String` and `HYP`
//! becomes a [`Word`]. Coordinates are taken in the document's declared
//! measurement unit and mapped onto the canvas with a [`UnitConverter`].

use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use super::units::{MeasurementUnit, UnitConverter, DEFAULT_FALLBACK_DPI};
use super::{CanvasSize, Line, ParsedText, Physical, Rect, SourceDialect, Word};
use crate::error::TextLayerError;

/// Knobs for ALTO parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct AltoOptions {
    /// Resolution assumed for physical units when the page declares no extent.
    pub fallback_dpi: f64,
}

impl Default for AltoOptions {
    fn default() -> Self {
        Self {
            fallback_dpi: DEFAULT_FALLBACK_DPI,
        }
    }
}

/// Parse ALTO XML into the normalized text model.
pub fn parse_alto_str(
    xml: &str,
    canvas: CanvasSize,
    opts: &AltoOptions,
) -> Result<ParsedText, TextLayerError> {
    let document = Document::parse(xml).map_err(|source| malformed(source.to_string()))?;

    let root = document.root_element();
    if !root.tag_name().name().eq_ignore_ascii_case("alto") {
        return Err(malformed("missing <alto> root element"));
    }

    let unit = match child_element(root, "Description")
        .and_then(|description| optional_child_text(description, "MeasurementUnit"))
    {
        Some(raw) => MeasurementUnit::parse(&raw)
            .ok_or_else(|| malformed(format!("unsupported <MeasurementUnit> '{raw}'")))?,
        None => MeasurementUnit::Pixel,
    };

    let styles = collect_text_styles(root);

    let page = child_element(root, "Layout")
        .and_then(|layout| child_element(layout, "Page"))
        .ok_or_else(|| malformed("missing <Page> in <Layout>"))?;

    let declared_extent = match page_extent(page)? {
        Some(extent) => Some(extent),
        None => match child_element(page, "PrintSpace") {
            Some(print_space) => page_extent(print_space)?,
            None => None,
        },
    };

    let mut raw_lines = Vec::new();
    for line_node in page
        .descendants()
        .filter(|node| is_element_named(node, "TextLine"))
    {
        raw_lines.push(parse_text_line(line_node, &styles)?);
    }

    let (converter, extent) = match (declared_extent, canvas.is_empty()) {
        (Some((width, height)), false) => {
            (UnitConverter::from_extent(width, height, canvas), canvas)
        }
        (None, false) => (UnitConverter::from_unit(unit, opts.fallback_dpi), canvas),
        (declared, true) => {
            let converter = UnitConverter::from_unit(unit, opts.fallback_dpi);
            let (width, height) = declared.unwrap_or_else(|| content_extent(&raw_lines));
            let extent = CanvasSize::new(
                to_pixel_dim(converter.x(width)),
                to_pixel_dim(converter.y(height)),
            );
            (converter, extent)
        }
    };

    let lines = raw_lines
        .into_iter()
        .map(|raw| raw.into_line(&converter))
        .collect();

    Ok(ParsedText::clipped(extent, lines))
}

/// Parse ALTO XML from bytes (must be valid UTF-8).
pub fn from_alto_slice(bytes: &[u8], canvas: CanvasSize) -> Result<ParsedText, TextLayerError> {
    let xml = std::str::from_utf8(bytes)
        .map_err(|source| malformed(format!("input is not valid UTF-8: {source}")))?;
    parse_alto_str(xml, canvas, &AltoOptions::default())
}

#[derive(Debug)]
struct RawLine {
    rect: Rect<Physical>,
    text: String,
    words: Vec<RawWord>,
    style: BTreeMap<String, String>,
}

#[derive(Debug)]
struct RawWord {
    rect: Rect<Physical>,
    text: String,
    confidence: Option<f64>,
    style: BTreeMap<String, String>,
}

impl RawLine {
    fn into_line(self, converter: &UnitConverter) -> Line {
        let words = self
            .words
            .into_iter()
            .map(|raw| Word {
                rect: converter.to_pixel(&raw.rect),
                text: raw.text,
                confidence: raw.confidence,
                style: raw.style,
            })
            .collect();
        let mut line = Line::from_words(converter.to_pixel(&self.rect), words);
        line.text = self.text;
        line.style = self.style;
        line
    }
}

fn parse_text_line(
    line_node: Node<'_, '_>,
    styles: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<RawLine, TextLayerError> {
    let rect = element_rect(line_node, "<TextLine>")?;

    let line_style = style_refs(line_node)
        .or_else(|| {
            line_node
                .ancestors()
                .skip(1)
                .find(|node| is_element_named(node, "TextBlock"))
                .and_then(style_refs)
        })
        .map(|refs| resolve_styles(&refs, styles))
        .unwrap_or_default();

    let mut words = Vec::new();
    let mut text = String::new();

    // SP elements only separate strings; a hyphen (HYP) attaches to the
    // string before it.
    for child in line_node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "String" => {
                let content = child.attribute("CONTENT").unwrap_or_default().to_string();
                if !text.is_empty() && !text.ends_with(char::is_whitespace) {
                    text.push(' ');
                }
                text.push_str(&content);
                words.push(parse_word(child, content, &line_style, styles, "<String>")?);
            }
            "HYP" => {
                let content = child.attribute("CONTENT").unwrap_or("-").to_string();
                text.push_str(&content);
                words.push(parse_word(child, content, &line_style, styles, "<HYP>")?);
            }
            _ => {}
        }
    }

    Ok(RawLine {
        rect,
        text,
        words,
        style: line_style,
    })
}

fn parse_word(
    node: Node<'_, '_>,
    text: String,
    line_style: &BTreeMap<String, String>,
    styles: &BTreeMap<String, BTreeMap<String, String>>,
    context: &str,
) -> Result<RawWord, TextLayerError> {
    let confidence = node
        .attribute("WC")
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|wc| wc.is_finite());

    let style = match style_refs(node) {
        Some(refs) => resolve_styles(&refs, styles),
        None => line_style.clone(),
    };

    Ok(RawWord {
        rect: element_rect(node, context)?,
        text,
        confidence,
        style,
    })
}

/// Position of an element, or a zero-area rectangle at the nearest
/// positioned ancestor when any of the four attributes is missing.
fn element_rect(node: Node<'_, '_>, context: &str) -> Result<Rect<Physical>, TextLayerError> {
    let hpos = optional_f64_attr(node, "HPOS", context)?;
    let vpos = optional_f64_attr(node, "VPOS", context)?;
    let width = optional_f64_attr(node, "WIDTH", context)?;
    let height = optional_f64_attr(node, "HEIGHT", context)?;

    if let (Some(x), Some(y), Some(w), Some(h)) = (hpos, vpos, width, height) {
        return Ok(Rect::new(x, y, w, h));
    }

    for ancestor in node.ancestors().skip(1).filter(Node::is_element) {
        let x = ancestor
            .attribute("HPOS")
            .and_then(|raw| raw.trim().parse::<f64>().ok());
        let y = ancestor
            .attribute("VPOS")
            .and_then(|raw| raw.trim().parse::<f64>().ok());
        if let (Some(x), Some(y)) = (x, y) {
            return Ok(Rect::point(x, y));
        }
    }

    Ok(Rect::point(0.0, 0.0))
}

fn page_extent(node: Node<'_, '_>) -> Result<Option<(f64, f64)>, TextLayerError> {
    let context = format!("<{}>", node.tag_name().name());
    let width = optional_f64_attr(node, "WIDTH", &context)?;
    let height = optional_f64_attr(node, "HEIGHT", &context)?;
    Ok(match (width, height) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some((w, h)),
        _ => None,
    })
}

fn content_extent(lines: &[RawLine]) -> (f64, f64) {
    lines.iter().fold((0.0, 0.0), |(w, h), line| {
        (f64::max(w, line.rect.right()), f64::max(h, line.rect.bottom()))
    })
}

fn to_pixel_dim(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.ceil().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

fn collect_text_styles(root: Node<'_, '_>) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut styles = BTreeMap::new();
    let Some(styles_node) = child_element(root, "Styles") else {
        return styles;
    };

    for style in styles_node
        .children()
        .filter(|node| is_element_named(node, "TextStyle"))
    {
        let Some(id) = style.attribute("ID") else {
            continue;
        };
        let mut hints = BTreeMap::new();
        for (attr, key) in [
            ("FONTFAMILY", "font-family"),
            ("FONTSIZE", "font-size"),
            ("FONTSTYLE", "font-style"),
        ] {
            if let Some(value) = style.attribute(attr).map(str::trim).filter(|v| !v.is_empty()) {
                hints.insert(key.to_string(), value.to_string());
            }
        }
        if let Some(color) = style
            .attribute("FONTCOLOR")
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            let color = if color.starts_with('#') {
                color.to_string()
            } else {
                format!("#{color}")
            };
            hints.insert("color".to_string(), color);
        }
        styles.insert(id.to_string(), hints);
    }

    styles
}

fn style_refs(node: Node<'_, '_>) -> Option<Vec<String>> {
    node.attribute("STYLEREFS")
        .map(|raw| raw.split_whitespace().map(ToOwned::to_owned).collect::<Vec<_>>())
        .filter(|refs| !refs.is_empty())
}

fn resolve_styles(
    refs: &[String],
    styles: &BTreeMap<String, BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut hints = BTreeMap::new();
    for id in refs {
        if let Some(style) = styles.get(id) {
            for (key, value) in style {
                hints.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }
    hints
}

fn optional_f64_attr(
    node: Node<'_, '_>,
    attr: &str,
    context: &str,
) -> Result<Option<f64>, TextLayerError> {
    match node.attribute(attr).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| {
                malformed(format!(
                    "invalid {attr} value '{raw}' in {context}; expected a number"
                ))
            }),
    }
}

fn is_element_named(node: &Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_element_named(child, tag))
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn malformed(message: impl Into<String>) -> TextLayerError {
    TextLayerError::malformed(SourceDialect::Alto, message)
}
