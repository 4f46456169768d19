//! IIIF annotation reader (Presentation API v2 and v3).
//!
//! Input is a list of annotations whose content is already inline; the
//! resolver in [`crate::resolve`] takes care of external references before
//! anything reaches this module. Geometry comes from `xywh=` media
//! fragments on the annotation target.
//!
//! Granularity is signalled by `dcType` (v2) or `textGranularity` (v3):
//! - `Line` annotations become lines in document order
//! - `Word` annotations attach to the smallest line that contains them,
//!   else to the nearest preceding line
//! - untyped annotations with content become one full-canvas line

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;
use serde_json::Value;

use super::units::percent_to_pixel;
use super::{CanvasSize, Line, ParsedText, Percent, Pixel, Rect, SourceDialect, Word};
use crate::error::TextLayerError;

/// Parse a serialized annotation list (v2 `sc:AnnotationList`, v3
/// `AnnotationPage`, or a bare JSON array of annotations).
///
/// Non-text annotations are dropped before parsing.
pub fn parse_annotation_list_str(
    json: &str,
    canvas: CanvasSize,
) -> Result<ParsedText, TextLayerError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|source| malformed(format!("invalid JSON: {source}")))?;
    if !value.is_object() && !value.is_array() {
        return Err(malformed("expected an annotation list object or array"));
    }
    let annotations = text_bearing_resources(&value);
    parse_iiif_annotations(&annotations, canvas)
}

/// Parse an annotation list from bytes.
pub fn from_iiif_slice(bytes: &[u8], canvas: CanvasSize) -> Result<ParsedText, TextLayerError> {
    let json = std::str::from_utf8(bytes)
        .map_err(|source| malformed(format!("input is not valid UTF-8: {source}")))?;
    parse_annotation_list_str(json, canvas)
}

/// The annotations of a list: `resources` (v2), `items` (v3), or the
/// elements of a bare array.
pub fn annotation_list_items(list: &Value) -> &[Value] {
    match list {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("resources")
            .or_else(|| map.get("items"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    }
}

/// Keeps the annotations that carry text, in their original order.
///
/// An annotation is text-bearing when its motivation is `supplementing`,
/// its content is typed `cnt:ContentAsText` or `TextualBody`, or it declares
/// a `Line`/`Word` granularity. Anything motivated by `painting` is dropped.
pub fn text_bearing_resources(list: &Value) -> Vec<Value> {
    annotation_list_items(list)
        .iter()
        .filter(|anno| is_text_bearing(anno))
        .cloned()
        .collect()
}

/// True when the annotation is motivated by `painting` (the image itself).
pub(crate) fn is_painting(anno: &Value) -> bool {
    motivations(anno).iter().any(|m| m == "painting")
}

fn is_text_bearing(anno: &Value) -> bool {
    if is_painting(anno) {
        return false;
    }
    let motivations = motivations(anno);
    if motivations.iter().any(|m| m == "supplementing") {
        return true;
    }
    if granularity(anno).is_some() {
        return true;
    }
    content_refs(anno).into_iter().any(|content| {
        type_names(content).any(|ty| {
            let ty = ty.to_ascii_lowercase();
            ty == "cnt:contentastext" || ty == "textualbody"
        })
    })
}

/// Parse a pre-filtered, pre-resolved list of annotations.
pub fn parse_iiif_annotations(
    annotations: &[Value],
    canvas: CanvasSize,
) -> Result<ParsedText, TextLayerError> {
    let mut entries = Vec::with_capacity(annotations.len());
    for anno in annotations {
        if let Some(entry) = parse_entry(anno)? {
            entries.push(entry);
        }
    }

    let extent = if canvas.is_empty() {
        if entries
            .iter()
            .any(|entry| matches!(entry.target, Some(Target::Percent(_))))
        {
            return Err(malformed(
                "percent xywh targets need a canvas size to map onto",
            ));
        }
        let covered = entries
            .iter()
            .filter_map(|entry| match entry.target {
                Some(Target::Pixel(rect)) => Some(rect),
                _ => None,
            })
            .fold(Rect::point(0.0, 0.0), |acc, rect| acc.union(&rect));
        CanvasSize::new(to_pixel_dim(covered.right()), to_pixel_dim(covered.bottom()))
    } else {
        canvas
    };
    let full_canvas = Rect::new(0.0, 0.0, f64::from(extent.width), f64::from(extent.height));

    let has_lines = entries.iter().any(|e| e.granularity == Some(Granularity::Line));

    // First pass: lines in document order. Words remember how many typed
    // lines precede them.
    let mut lines: Vec<Line> = Vec::new();
    let mut attach_targets: Vec<usize> = Vec::new();
    let mut pending_words: Vec<(Word, usize)> = Vec::new();

    for entry in entries {
        let rect = entry
            .target
            .map(|target| target.to_pixel(extent))
            .unwrap_or(full_canvas);
        match entry.granularity {
            Some(Granularity::Line) => {
                attach_targets.push(lines.len());
                lines.push(Line::text_only(rect, entry.text));
            }
            Some(Granularity::Word) if has_lines => {
                if !entry.text.is_empty() {
                    pending_words.push((Word::new(rect, entry.text), attach_targets.len()));
                }
            }
            Some(Granularity::Word) => {
                if !entry.text.is_empty() {
                    lines.push(Line::from_words(rect, vec![Word::new(rect, entry.text)]));
                }
            }
            None => {
                if !entry.text.is_empty() {
                    lines.push(Line::text_only(full_canvas, entry.text));
                }
            }
        }
    }

    // Second pass: attach words.
    for (word, preceding) in pending_words {
        let target = attachment_target(&lines, &attach_targets, &word.rect, preceding);
        if let Some(line_idx) = target {
            lines[line_idx].push_word(word);
        }
    }

    Ok(ParsedText::clipped(extent, lines))
}

/// Picks the line a word belongs to.
///
/// `preceding` is the number of typed lines that appear before the word in
/// document order.
fn attachment_target(
    lines: &[Line],
    attach_targets: &[usize],
    word_rect: &Rect<Pixel>,
    preceding: usize,
) -> Option<usize> {
    // Distance in document order; preceding lines win ties over following ones.
    let rank = |pos: usize| -> (bool, usize) {
        if pos < preceding {
            (false, preceding - 1 - pos)
        } else {
            (true, pos - preceding)
        }
    };

    let containing = attach_targets
        .iter()
        .enumerate()
        .filter(|&(_, &idx)| lines[idx].rect.contains(word_rect))
        .min_by(|&(pos_a, &a), &(pos_b, &b)| {
            lines[a]
                .rect
                .area()
                .total_cmp(&lines[b].rect.area())
                .then_with(|| rank(pos_a).cmp(&rank(pos_b)))
        })
        .map(|(_, idx)| *idx);

    containing.or_else(|| {
        if preceding > 0 {
            attach_targets.get(preceding - 1).copied()
        } else {
            attach_targets.first().copied()
        }
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Granularity {
    Line,
    Word,
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Pixel(Rect<Pixel>),
    Percent(Rect<Percent>),
}

impl Target {
    fn to_pixel(self, canvas: CanvasSize) -> Rect<Pixel> {
        match self {
            Target::Pixel(rect) => rect,
            Target::Percent(rect) => percent_to_pixel(&rect, canvas),
        }
    }
}

#[derive(Debug)]
struct Entry {
    granularity: Option<Granularity>,
    target: Option<Target>,
    text: String,
}

fn parse_entry(anno: &Value) -> Result<Option<Entry>, TextLayerError> {
    if !anno.is_object() {
        return Ok(None);
    }
    let target = anno
        .get("on")
        .or_else(|| anno.get("target"))
        .map(parse_target)
        .transpose()?
        .flatten();

    let text = content_refs(anno)
        .into_iter()
        .find_map(content_text)
        .unwrap_or_default();

    Ok(Some(Entry {
        granularity: granularity(anno),
        target,
        text,
    }))
}

fn granularity(anno: &Value) -> Option<Granularity> {
    let declared = |value: &Value| {
        value
            .get("dcType")
            .or_else(|| value.get("textGranularity"))
            .and_then(Value::as_str)
            .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "line" => Some(Granularity::Line),
                "word" => Some(Granularity::Word),
                _ => None,
            })
    };
    declared(anno).or_else(|| content_refs(anno).into_iter().find_map(declared))
}

fn motivations(anno: &Value) -> Vec<String> {
    let normalize = |raw: &str| {
        raw.rsplit(':')
            .next()
            .unwrap_or(raw)
            .trim()
            .to_ascii_lowercase()
    };
    match anno.get("motivation") {
        Some(Value::String(raw)) => vec![normalize(raw)],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(normalize).collect(),
        _ => Vec::new(),
    }
}

/// Content objects of an annotation: `resource` (v2) or `body` (v3),
/// either a single object or an array of objects.
fn content_refs(anno: &Value) -> Vec<&Value> {
    match anno.get("resource").or_else(|| anno.get("body")) {
        Some(Value::Array(items)) => items.iter().filter(|item| item.is_object()).collect(),
        Some(content @ Value::Object(_)) => vec![content],
        _ => Vec::new(),
    }
}

fn type_names(value: &Value) -> impl Iterator<Item = &str> {
    ["@type", "type"]
        .into_iter()
        .filter_map(move |key| value.get(key))
        .flat_map(|ty| match ty {
            Value::String(name) => vec![name.as_str()],
            Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        })
}

/// Inline text of a content object, reduced to plain text when it is HTML.
fn content_text(content: &Value) -> Option<String> {
    let raw = ["chars", "value", "content"]
        .into_iter()
        .find_map(|key| content.get(key).and_then(Value::as_str))?;

    let is_html = content
        .get("format")
        .and_then(Value::as_str)
        .is_some_and(|format| format.eq_ignore_ascii_case("text/html"))
        || (raw.contains('<') && raw.contains('>'));

    let text = if is_html { html_to_text(raw) } else { raw.trim().to_string() };
    Some(text)
}

fn html_to_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_target(target: &Value) -> Result<Option<Target>, TextLayerError> {
    match target {
        Value::String(uri) => parse_xywh(uri),
        Value::Array(items) => {
            for item in items {
                if let Some(rect) = parse_target(item)? {
                    return Ok(Some(rect));
                }
            }
            Ok(None)
        }
        Value::Object(map) => {
            let selectors = match map.get("selector") {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(selector) => vec![selector],
                None => Vec::new(),
            };
            for selector in selectors {
                if let Some(value) = selector.get("value").and_then(Value::as_str) {
                    if let Some(rect) = parse_xywh(value)? {
                        return Ok(Some(rect));
                    }
                }
            }
            match map.get("@id").or_else(|| map.get("id")).and_then(Value::as_str) {
                Some(uri) => parse_xywh(uri),
                None => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

/// Parses an `xywh=` media fragment. Strings without one yield `None`.
fn parse_xywh(raw: &str) -> Result<Option<Target>, TextLayerError> {
    static XYWH_RE: OnceLock<Regex> = OnceLock::new();
    let xywh_re = XYWH_RE.get_or_init(|| {
        Regex::new(r"xywh=(?:(pixel|percent):)?([^&\s]*)").expect("valid xywh regex")
    });

    let Some(caps) = xywh_re.captures(raw) else {
        return Ok(None);
    };
    let values = caps[2]
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    malformed(format!(
                        "invalid xywh value '{part}' in '{raw}'; expected a number"
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [x, y, w, h] = values.as_slice() else {
        return Err(malformed(format!(
            "xywh fragment in '{raw}' must have exactly four values"
        )));
    };

    Ok(Some(match caps.get(1).map(|unit| unit.as_str()) {
        Some("percent") => Target::Percent(Rect::new(*x, *y, *w, *h)),
        _ => Target::Pixel(Rect::new(*x, *y, *w, *h)),
    }))
}

fn to_pixel_dim(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.ceil().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

fn malformed(message: impl Into<String>) -> TextLayerError {
    TextLayerError::malformed(SourceDialect::IiifAnnotation, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(xywh: &str, text: &str) -> Value {
        json!({
            "@type": "oa:Annotation",
            "motivation": "sc:supplementing",
            "dcType": "Line",
            "resource": { "@type": "cnt:ContentAsText", "chars": text },
            "on": format!("https://example.org/canvas/1#xywh={xywh}"),
        })
    }

    fn word(xywh: &str, text: &str) -> Value {
        json!({
            "motivation": "supplementing",
            "dcType": "Word",
            "resource": { "@type": "cnt:ContentAsText", "chars": text },
            "on": format!("https://example.org/canvas/1#xywh={xywh}"),
        })
    }

    #[test]
    fn filter_keeps_text_bearing_and_drops_painting() {
        let list = json!({
            "resources": [
                { "motivation": "supplementing", "resource": {} },
                { "resource": { "@type": "cnt:contentAsText" } },
                { "dcType": "Line", "resource": {} },
                { "dcType": "Word", "resource": {} },
                { "motivation": "painting", "resource": {} },
            ]
        });
        let kept = text_bearing_resources(&list);
        assert_eq!(kept.len(), 4);
        assert_eq!(kept[..], annotation_list_items(&list)[..4]);
    }

    #[test]
    fn painting_wins_over_granularity() {
        let list = json!([{ "motivation": ["painting"], "dcType": "Line", "resource": {} }]);
        assert!(text_bearing_resources(&list).is_empty());
    }

    #[test]
    fn words_attach_to_smallest_containing_line() {
        let annos = vec![
            line("0,0,1000,200", ""),
            line("0,0,500,50", ""),
            word("10,10,50,20", "first"),
            word("600,100,50,20", "second"),
        ];
        let parsed = parse_iiif_annotations(&annos, CanvasSize::new(1000, 1000)).expect("parse");

        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[1].text, "first");
        assert_eq!(parsed.lines[0].text, "second");
        assert_eq!(parsed.lines[0].words[0].rect, Rect::new(600.0, 100.0, 50.0, 20.0));
    }

    #[test]
    fn words_outside_every_line_go_to_nearest_preceding() {
        let annos = vec![
            line("0,0,100,20", "one"),
            line("0,100,100,20", "two"),
            word("500,500,10,10", "stray"),
        ];
        let parsed = parse_iiif_annotations(&annos, CanvasSize::new(1000, 1000)).expect("parse");
        assert_eq!(parsed.lines[1].words.len(), 1);
        assert_eq!(parsed.lines[1].text, "two");
    }

    #[test]
    fn words_without_lines_become_lines() {
        let annos = vec![word("1,2,3,4", "alone"), word("10,2,3,4", "again")];
        let parsed = parse_iiif_annotations(&annos, CanvasSize::new(100, 100)).expect("parse");
        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[0].text, "alone");
        assert_eq!(parsed.lines[0].rect, Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn untyped_content_spans_the_canvas() {
        let annos = vec![json!({
            "motivation": "supplementing",
            "resource": { "@type": "cnt:ContentAsText", "format": "text/html", "chars": "<p>Full <b>page</b></p>" },
            "on": "https://example.org/canvas/1",
        })];
        let parsed = parse_iiif_annotations(&annos, CanvasSize::new(800, 600)).expect("parse");
        assert_eq!(parsed.lines[0].text, "Full page");
        assert_eq!(parsed.lines[0].rect, Rect::new(0.0, 0.0, 800.0, 600.0));
    }

    #[test]
    fn v3_selector_and_percent_fragments() {
        let annos = vec![json!({
            "type": "Annotation",
            "motivation": "supplementing",
            "textGranularity": "line",
            "body": { "type": "TextualBody", "value": "v3 line" },
            "target": {
                "source": "https://example.org/canvas/1",
                "selector": { "type": "FragmentSelector", "value": "xywh=percent:10,20,50,5" }
            }
        })];
        let parsed = parse_iiif_annotations(&annos, CanvasSize::new(1000, 2000)).expect("parse");
        assert_eq!(parsed.lines[0].rect, Rect::new(100.0, 400.0, 500.0, 100.0));
        assert_eq!(parsed.lines[0].text, "v3 line");
    }

    #[test]
    fn empty_canvas_uses_union_of_targets() {
        let annos = vec![line("0,0,300,20", "a"), line("0,40,250,20", "b")];
        let parsed = parse_iiif_annotations(&annos, CanvasSize::default()).expect("parse");
        assert_eq!((parsed.width, parsed.height), (300, 60));
    }

    #[test]
    fn percent_targets_without_canvas_are_malformed() {
        let annos = vec![json!({
            "motivation": "supplementing",
            "dcType": "Line",
            "resource": { "chars": "somewhere" },
            "on": "https://example.org/canvas/9#xywh=percent:10,10,50,5"
        })];
        let err = parse_iiif_annotations(&annos, CanvasSize::default()).expect_err("should fail");
        assert!(err.to_string().contains("need a canvas size"));
    }

    #[test]
    fn non_numeric_fragment_is_malformed() {
        let annos = vec![line("1,2,three,4", "bad")];
        let err = parse_iiif_annotations(&annos, CanvasSize::new(10, 10)).expect_err("should fail");
        assert!(matches!(
            err,
            TextLayerError::MalformedSource {
                dialect: SourceDialect::IiifAnnotation,
                ..
            }
        ));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_annotation_list_str("{not json", CanvasSize::new(10, 10))
            .expect_err("should fail");
        assert!(err.to_string().contains("invalid JSON"));
    }
}
