//! Linear interpolation of one curve onto another abscissa grid

use crate::curve::Curve;

/// Interpolates `(source_x, source_y)` at every value of `target_x`.
///
/// Both grids are expected ascending; the bracketing cursor only moves
/// forward. There is no extrapolation past the end of the source: the
/// output stops at the first target beyond `source_x.last()`, so it may be
/// shorter than `target_x`. A target hitting a source abscissa returns the
/// source value exactly.
pub fn interpolate(source_x: &[f64], source_y: &[f64], target_x: &[f64]) -> Vec<f64> {
    let n = source_x.len().min(source_y.len());
    let mut out = Vec::with_capacity(target_x.len());
    match n {
        0 => return out,
        1 => {
            out.extend(target_x.iter().take_while(|&&t| t <= source_x[0]).map(|_| source_y[0]));
            return out;
        }
        _ => {}
    }

    let last = source_x[n - 1];
    let mut j = 1;
    for &t in target_x {
        if t > last {
            break;
        }
        while j < n - 1 && source_x[j] < t {
            j += 1;
        }
        let (x0, y0) = (source_x[j - 1], source_y[j - 1]);
        let (x1, y1) = (source_x[j], source_y[j]);
        let v = if (x1 - x0) * (t - x0) == 0.0 {
            y0
        } else if t == x1 {
            y1
        } else {
            y0 + (y1 - y0) / (x1 - x0) * (t - x0)
        };
        out.push(v);
    }
    out
}

/// Resamples `curve` onto `target_x`, keeping its name. The result covers
/// only the targets that could be interpolated.
pub fn calibrate(curve: &Curve, target_x: &[f64]) -> Curve {
    let y = interpolate(curve.x(), curve.y(), target_x);
    let x = target_x[..y.len()].to_vec();
    Curve::new(curve.name(), x, y)
}
