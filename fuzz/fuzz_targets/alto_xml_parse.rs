//! Fuzz target for ALTO XML parsing.
//!
//! Feeds arbitrary bytes to the parser with a fixed canvas, checking for
//! panics and for rectangles that escape the canvas.

#![no_main]

use libfuzzer_sys::fuzz_target;
use textlayer::ir::io_alto_xml::from_alto_slice;
use textlayer::ir::CanvasSize;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(parsed) = from_alto_slice(data, CanvasSize::new(1000, 1500)) {
        for line in &parsed.lines {
            assert!(line.rect.right() <= 1000.0 + 1e-6 && line.rect.bottom() <= 1500.0 + 1e-6);
        }
    }
});
