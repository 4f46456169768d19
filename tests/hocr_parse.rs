use textlayer::ir::io_hocr::{from_hocr_slice, parse_hocr_str};
use textlayer::ir::{CanvasSize, Rect, SourceDialect};

mod common;

#[test]
fn hocr_fixture_lines_words_and_captions() {
    let html = common::fixture("hocr_page.html");
    let parsed = parse_hocr_str(&html, CanvasSize::new(1000, 1500)).expect("parse hocr");

    assert_eq!(parsed.lines.len(), 3);
    assert_eq!(parsed.lines[0].text, "Call me");
    assert_eq!(parsed.lines[0].rect, Rect::new(100.0, 200.0, 500.0, 30.0));
    assert_eq!(parsed.lines[0].words[1].confidence, Some(0.9));
    assert_eq!(parsed.lines[1].text, "Ishmael.");

    let caption = &parsed.lines[2];
    assert!(caption.words.is_empty());
    assert_eq!(caption.text, "Figure 1: the whale");
    assert_eq!(parsed.word_count(), 3);
}

#[test]
fn hocr_page_is_scaled_to_smaller_canvas() {
    let html = common::fixture("hocr_page.html");
    let parsed = parse_hocr_str(&html, CanvasSize::new(500, 750)).expect("parse hocr");
    assert_eq!(parsed.lines[0].rect, Rect::new(50.0, 100.0, 250.0, 15.0));
    assert_eq!(parsed.lines[0].words[0].rect, Rect::new(50.0, 100.0, 100.0, 15.0));
}

#[test]
fn hocr_is_sniffed_from_plain_html() {
    let html = common::fixture("hocr_page.html");
    assert_eq!(
        SourceDialect::detect(Some("text/html; charset=utf-8"), &html).expect("detect"),
        SourceDialect::Hocr
    );
}

#[test]
fn hocr_slice_rejects_invalid_utf8() {
    let err = from_hocr_slice(&[0xff, 0xfe, 0x00], CanvasSize::new(10, 10)).expect_err("should fail");
    assert!(err.to_string().contains("not valid UTF-8"));
}
