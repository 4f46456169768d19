#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use textlayer::ir::{CanvasSize, ParsedText};

/// Slack for float rounding when comparing against canvas edges.
pub const EPS_EDGE: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_canvas() -> impl Strategy<Value = CanvasSize> {
    (1u32..=4000, 1u32..=4000).prop_map(|(w, h)| CanvasSize::new(w, h))
}

/// Corner boxes that may be inverted or reach well past any canvas.
pub fn arb_corners() -> impl Strategy<Value = (i32, i32, i32, i32)> {
    (-500i32..5000, -500i32..5000, -500i32..5000, -500i32..5000)
}

/// Non-negative XYWH boxes, often overflowing the canvas.
pub fn arb_xywh() -> impl Strategy<Value = (u32, u32, u32, u32)> {
    (0u32..5000, 0u32..5000, 0u32..3000, 0u32..3000)
}

/// An hOCR page whose `bbox` matches `page` and holds one word per line.
pub fn hocr_document(page: (u32, u32), lines: &[(i32, i32, i32, i32)]) -> String {
    let mut html = format!(
        "<html><body><div class=\"ocr_page\" title=\"bbox 0 0 {} {}\">",
        page.0, page.1
    );
    for (i, (x1, y1, x2, y2)) in lines.iter().enumerate() {
        html.push_str(&format!(
            "<span class=\"ocr_line\" title=\"bbox {x1} {y1} {x2} {y2}\">\
             <span class=\"ocrx_word\" title=\"bbox {x1} {y1} {x2} {y2}; x_wconf 80\">w{i}</span>\
             </span>"
        ));
    }
    html.push_str("</div></body></html>");
    html
}

/// A IIIF v2 annotation list of line annotations on a single canvas.
pub fn iiif_document(lines: &[(u32, u32, u32, u32)]) -> String {
    let resources: Vec<serde_json::Value> = lines
        .iter()
        .enumerate()
        .map(|(i, (x, y, w, h))| {
            serde_json::json!({
                "@type": "oa:Annotation",
                "motivation": "sc:supplementing",
                "dcType": "Line",
                "resource": { "@type": "cnt:ContentAsText", "chars": format!("line {i}") },
                "on": format!("https://example.org/canvas/1#xywh={x},{y},{w},{h}")
            })
        })
        .collect();
    serde_json::json!({
        "@type": "sc:AnnotationList",
        "resources": resources
    })
    .to_string()
}

/// Checks that every line and word rectangle lies inside the page.
pub fn assert_within_canvas(parsed: &ParsedText) -> Result<(), String> {
    let (max_w, max_h) = (f64::from(parsed.width), f64::from(parsed.height));
    let rects = parsed
        .lines
        .iter()
        .flat_map(|line| std::iter::once(&line.rect).chain(line.words.iter().map(|w| &w.rect)));
    for rect in rects {
        let ok = rect.x >= 0.0
            && rect.y >= 0.0
            && rect.width >= 0.0
            && rect.height >= 0.0
            && rect.right() <= max_w + EPS_EDGE
            && rect.bottom() <= max_h + EPS_EDGE;
        if !ok {
            return Err(format!("{rect:?} escapes {max_w}x{max_h} canvas"));
        }
    }
    Ok(())
}
