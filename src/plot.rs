//! Visualization of one tube report

use crate::curve::Curve;
use crate::report::TubeReport;
use anyhow::Result;
use plotters::prelude::*;
use std::path::Path;

/// Finite (min, max) over the x and y values of `curves`, padded when flat
fn bounds<'a>(curves: impl IntoIterator<Item = &'a Curve>) -> ((f64, f64), (f64, f64)) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for (px, py) in curves.into_iter().flat_map(Curve::points) {
        if px.is_finite() && py.is_finite() {
            x = (x.0.min(px), x.1.max(px));
            y = (y.0.min(py), y.1.max(py));
        }
    }
    (pad(x), pad(y))
}

fn pad((lo, hi): (f64, f64)) -> (f64, f64) {
    if !(lo <= hi) {
        return (0.0, 1.0);
    }
    let margin = ((hi - lo) * 0.05).max(1e-12);
    (lo - margin, hi + margin)
}

/// Draws reference, tube and test curve on top, error samples below
pub fn plot_tube(report: &TubeReport, out_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(out_path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let (top, bottom) = root.split_vertically(560);

    let mut curves = vec![&report.reference, &report.lower, &report.upper];
    curves.extend(report.test.as_ref());
    let ((x0, x1), (y0, y1)) = bounds(curves);

    let caption = format!("{} ({}, {})", report.result_name, report.algorithm, report.validity);
    let mut chart = ChartBuilder::on(&top)
        .margin(20)
        .caption(caption, ("sans-serif", 28))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart.configure_mesh().x_desc("Time").y_desc(report.result_name.as_str()).draw()?;

    let series = [
        (&report.lower, "Lower", BLUE),
        (&report.upper, "Upper", GREEN),
        (&report.reference, "Reference", BLACK),
    ];
    for (curve, label, color) in series {
        chart
            .draw_series(LineSeries::new(curve.points(), &color))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    if let Some(test) = &report.test {
        chart
            .draw_series(LineSeries::new(test.points(), &MAGENTA))?
            .label("Test")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MAGENTA));
    }
    chart.configure_series_labels().background_style(WHITE.mix(0.8)).border_style(BLACK).draw()?;

    let (_, (e0, e1)) = bounds([&report.errors]);
    let mut errors = ChartBuilder::on(&bottom)
        .margin(20)
        .caption(format!("Errors: {}", report.error_count()), ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, e0.min(0.0)..e1.max(1e-12))?;
    errors.configure_mesh().x_desc("Time").y_desc("deviation").draw()?;
    errors.draw_series(report.errors.points().map(|p| Circle::new(p, 3, RED.filled())))?;

    root.present()?;
    Ok(())
}
