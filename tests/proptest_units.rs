use proptest::prelude::*;
use textlayer::ir::units::percent_to_pixel;
use textlayer::ir::{CanvasSize, MeasurementUnit, Percent, Physical, Rect, UnitConverter};

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn physical_units_scale_linearly(
        (x, y, w, h) in (0.0f64..1e4, 0.0f64..1e4, 0.0f64..1e4, 0.0f64..1e4),
        dpi in 72.0f64..1200.0,
    ) {
        let rect = Rect::<Physical>::new(x, y, w, h);
        for (unit, per_inch) in [(MeasurementUnit::Mm10, 254.0), (MeasurementUnit::Inch1200, 1200.0)] {
            let px = UnitConverter::from_unit(unit, dpi).to_pixel(&rect);
            let scale = dpi / per_inch;
            let tol = 1e-9 * (1.0 + x.max(y).max(w).max(h) * scale);
            prop_assert!((px.x - x * scale).abs() <= tol);
            prop_assert!((px.y - y * scale).abs() <= tol);
            prop_assert!((px.width - w * scale).abs() <= tol);
            prop_assert!((px.height - h * scale).abs() <= tol);
        }
    }

    #[test]
    fn percent_regions_land_on_canvas(
        canvas in proptest_helpers::arb_canvas(),
        (fx, fy, fw, fh) in (0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0),
    ) {
        let x = fx * 100.0;
        let y = fy * 100.0;
        let rect = Rect::<Percent>::new(x, y, fw * (100.0 - x), fh * (100.0 - y));
        let px = percent_to_pixel(&rect, canvas);
        let tol = 1e-6;
        prop_assert!(px.x >= -tol && px.y >= -tol);
        prop_assert!(px.right() <= f64::from(canvas.width) + tol);
        prop_assert!(px.bottom() <= f64::from(canvas.height) + tol);
    }

    #[test]
    fn extent_converter_maps_source_corner_to_canvas_corner(
        source in (1.0f64..1e5, 1.0f64..1e5),
        canvas in proptest_helpers::arb_canvas(),
    ) {
        let conv = UnitConverter::from_extent(source.0, source.1, CanvasSize::new(canvas.width, canvas.height));
        prop_assert!((conv.x(source.0) - f64::from(canvas.width)).abs() <= 1e-6);
        prop_assert!((conv.y(source.1) - f64::from(canvas.height)).abs() <= 1e-6);
    }
}
