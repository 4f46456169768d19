//! The same page described in ALTO (mm10) and hOCR (pixels) must normalize
//! to the same geometry.

use textlayer::ir::io_alto_xml::{parse_alto_str, AltoOptions};
use textlayer::ir::io_hocr::parse_hocr_str;
use textlayer::ir::io_iiif_annotations::parse_annotation_list_str;
use textlayer::ir::CanvasSize;

mod common;

#[test]
fn alto_mm10_and_hocr_pixel_lines_agree() {
    let canvas = CanvasSize::new(1000, 1500);
    let alto = parse_alto_str(&common::fixture("alto_mm10.xml"), canvas, &AltoOptions::default())
        .expect("parse alto");
    let hocr = parse_hocr_str(&common::fixture("hocr_page.html"), canvas).expect("parse hocr");

    for (a, h) in alto.lines.iter().zip(&hocr.lines) {
        assert_eq!(a.rect, h.rect);
        assert_eq!(a.text, h.text);
        assert_eq!(a.words.len(), h.words.len());
        for (aw, hw) in a.words.iter().zip(&h.words) {
            assert_eq!(aw.rect, hw.rect);
            assert_eq!(aw.text, hw.text);
        }
    }
    assert_eq!((alto.width, alto.height), (hocr.width, hocr.height));
}

#[test]
fn first_line_agrees_across_all_dialects() {
    let canvas = CanvasSize::new(1000, 1500);
    let alto = parse_alto_str(&common::fixture("alto_mm10.xml"), canvas, &AltoOptions::default())
        .expect("parse alto");
    let iiif = parse_annotation_list_str(&common::fixture("iiif_list.json"), canvas)
        .expect("parse iiif");

    assert_eq!(alto.lines[0].rect, iiif.lines[0].rect);
    assert_eq!(alto.lines[0].words[0].rect, iiif.lines[0].words[0].rect);
}
