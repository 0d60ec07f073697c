//! Ellipse envelope: every reference point is the center of an ellipse with
//! semi-axes `(delta, delta * S)`, where `delta` is the tube's half-width and
//! `S` scales slopes by the reference curve's value range over its time
//! range. The half-height of the tube size plays no part here. Each boundary is a chain of
//! lines tangent to those ellipses, one per reference interval.
//!
//! Intervals with (numerically) equal slopes are merged. Otherwise the
//! junction of two consecutive tangent lines is computed; if it does not
//! advance in x, the previous interval is hidden and is folded away until
//! the boundary moves forward again.

use super::{is_non_decreasing, Envelope, Side, CONSOLIDATION_CEILING};
use crate::curve::Curve;
use crate::error::{Result, TubeError};
use tracing::{debug, warn};

/// Relative step used to separate duplicate timestamps
const X_REL_EPS: f64 = 1e-15;
/// Slopes closer than this (relative) are treated as equal
const SLOPE_REL_EPS: f64 = 2e-15;
/// Merging of nearly-equal slopes only spans fewer reference points than this
const MERGE_SPAN: usize = 100;
/// Floor of S times the time span
const MIN_SLOPE_SCALE: f64 = 0.0004;

/// Reference interval `(start, end)` with the slope of its tangent line.
/// `end >= start`; a zero-length interval seeds a jump at the first point.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Interval {
    start: usize,
    end: usize,
    slope: f64,
}

impl Interval {
    fn new(start: usize, end: usize, slope: f64) -> Self {
        debug_assert!(end >= start, "interval end {end} precedes start {start}");
        Self { start, end, slope }
    }
}

/// Constants shared by both boundaries during one computation
#[derive(Clone, Copy, Debug)]
struct Params {
    delta: f64,
    s: f64,
    min_step: f64,
    /// Folds allowed per new interval
    ceiling: usize,
}

impl Params {
    /// Vertical offset of a tangent line with slope `m` from its reference segment
    #[inline]
    fn offset(&self, m: f64) -> f64 {
        self.delta * (m * m + self.s * self.s).sqrt()
    }

    /// Horizontal offset of the tangent point at a jump
    #[inline]
    fn jump_shift(&self, m: f64) -> f64 {
        self.delta * m / (self.s + (m * m + self.s * self.s).sqrt())
    }
}

/// Working buffers of one boundary. `xs.len() == intervals.len()` while
/// intervals are processed; `xs[0]` is the start point and `xs[k]` the
/// junction between intervals `k - 1` and `k`.
struct Boundary {
    side: Side,
    intervals: Vec<Interval>,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Boundary {
    fn new(side: Side, capacity: usize) -> Self {
        Self {
            side,
            intervals: Vec::with_capacity(capacity),
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, x: f64, y: f64) {
        self.xs.push(x);
        self.ys.push(y);
    }

    fn last_slope(&self) -> f64 {
        self.intervals.last().map_or(0.0, |iv| iv.slope)
    }

    fn last_start(&self) -> usize {
        self.intervals.last().map_or(0, |iv| iv.start)
    }

    /// First interval of an ordinary (non-jump) start
    fn seed(&mut self, x2: f64, y2: f64, m: f64, p: &Params) {
        let sg = self.side.sign();
        self.push(x2 - p.delta, y2 - m * p.delta + sg * p.offset(m));
    }

    /// First interval is a jump: horizontal offset segment before the vertical
    fn seed_jump(&mut self, x2: f64, y2: f64, m: f64, i: usize, p: &Params) {
        let sg = self.side.sign();
        if let Some(first) = self.intervals.first_mut() {
            *first = Interval::new(i - 1, i - 1, 0.0);
        }
        self.push(x2 - p.delta - p.min_step, y2 + sg * p.delta * p.s);
        self.intervals.push(Interval::new(i - 1, i, m));
        self.push(x2 - sg * p.jump_shift(m), y2 + sg * p.delta * p.s);
    }

    /// Adds the junction for the newest interval, merging or folding as needed.
    /// `(x2, y2)` is the reference point shared by the last two intervals.
    fn extend(&mut self, x: &[f64], y: &[f64], x2: f64, y2: f64, p: &Params) {
        let sg = self.side.sign();
        let mut index = self.intervals.len() - 1;
        if index == 0 {
            return;
        }
        let m1 = self.intervals[index].slope;
        let m2 = self.intervals[index - 1].slope;
        let diff = (m1 - m2).abs();
        let span = self.intervals[index].end - self.intervals[index - 1].start;

        if diff == 0.0 || (diff < SLOPE_REL_EPS * m1.abs().max(m2.abs()) && span < MERGE_SPAN) {
            // merge: the previous interval absorbs the new one
            let end = self.intervals[index].end;
            self.intervals.pop();
            let prev = &mut self.intervals[index - 1];
            prev.end = end;
            prev.slope = (y[end] - y[prev.start]) / (x[end] - x[prev.start]);
            return;
        }

        // split: junction of the two tangent lines
        let r1 = (m1 * m1 + p.s * p.s).sqrt();
        let r2 = (m2 * m2 + p.s * p.s).sqrt();
        let mut jx = x2 - sg * p.delta * (m1 + m2) / (r2 + r1);
        let mut jy = if m1 * m2 < 0.0 {
            y2 + sg * p.delta * (m1 * r2 - m2 * r1) / (m1 - m2)
        } else {
            y2 + sg * p.s * p.s * p.delta * (m1 + m2) / (m1 * r2 + m2 * r1)
        };

        let (px, py) = (self.xs[index - 1], self.ys[index - 1]);
        if jx == px && jy != py {
            // force strict progress in x
            jx = px + p.min_step;
            jy = y2 + m1 * (jx - x2) + sg * p.delta * r1;
            self.intervals[index - 1].slope = (jy - py) / p.min_step;
        }
        self.push(jx, jy);

        // fold while the junction does not advance past the previous one
        let mut folds = 0;
        while index > 0 && self.xs[index] <= self.xs[index - 1] {
            if folds == p.ceiling {
                warn!(side = self.side.label(), index, "ellipse fold ceiling reached");
                break;
            }
            folds += 1;

            self.intervals.remove(index - 1);
            self.xs.remove(index);
            self.ys.remove(index);
            index -= 1;

            if index == 0 {
                self.xs[0] = x[0] - p.delta;
                self.ys[0] = y2 + m1 * (self.xs[0] - x2) + sg * p.delta * r1;
                break;
            }

            let m2 = self.intervals[index - 1].slope;
            let (x3, y3) = (self.xs[index - 1], self.ys[index - 1]);
            if m2 == m1 {
                // parallel lines never meet; keep folding
                self.xs[index] = x3;
                self.ys[index] = y3;
                continue;
            }
            let d = sg * p.delta * r1;
            self.xs[index] = (m2 * x3 - m1 * x2 + y2 - y3 + d) / (m2 - m1);
            self.ys[index] = (m2 * m1 * (x3 - x2) + m2 * (y2 + d) - m1 * y3) / (m2 - m1);
        }
    }

    /// Terminal points after the last interval
    fn finish(&mut self, xn: f64, yn: f64, jump: bool, p: &Params) {
        let sg = self.side.sign();
        let m = self.last_slope();
        if jump {
            self.push(xn - sg * p.jump_shift(m), yn + sg * p.delta * p.s);
            self.push(xn + p.delta + p.min_step, yn + sg * p.delta * p.s);
        } else {
            let (lx, ly) = (self.xs[self.xs.len() - 1], self.ys[self.ys.len() - 1]);
            self.push(xn + p.delta, ly + m * (xn + p.delta - lx));
        }
    }

    fn into_curve(self) -> Curve {
        if !is_non_decreasing(&self.xs) {
            warn!(side = self.side.label(), "ellipse boundary moves backward in x");
        }
        Curve::new(self.side.label(), self.xs, self.ys)
    }
}

/// Computes Lower and Upper for `reference` with half-width `delta`
pub fn envelope(reference: &Curve, delta: f64) -> Result<Envelope> {
    envelope_with_ceiling(reference, delta, CONSOLIDATION_CEILING)
}

/// [`envelope`] with at most `ceiling` folds per interval. A boundary whose
/// folding is cut short is still returned, possibly stepping backward in x.
pub fn envelope_with_ceiling(reference: &Curve, delta: f64, ceiling: usize) -> Result<Envelope> {
    let n = reference.len();
    if n < 2 {
        return Err(TubeError::TubeCalculation(
            "ellipse tube needs at least two reference points".into(),
        ));
    }
    let mut x = reference.x().to_vec();
    let y = reference.y();

    let (t_start, t_stop) = (x[0], x[n - 1]);
    let span = (t_stop - t_start).abs() + t_start.abs();
    if !(span > 0.0) || !span.is_finite() {
        return Err(TubeError::TubeCalculation(format!(
            "reference time axis spans nothing (start={t_start}, stop={t_stop})"
        )));
    }
    let (min_y, max_y) = reference
        .y_range()
        .ok_or_else(|| TubeError::TubeCalculation("reference curve holds no values".into()))?;
    let s = (((max_y - min_y).abs() + min_y.abs()) / span).max(MIN_SLOPE_SCALE / span);
    let p = Params { delta, s, min_step: span * X_REL_EPS, ceiling };
    debug!(delta, s, min_step = p.min_step, "ellipse parameters");

    let mut upper = Boundary::new(Side::Upper, n);
    let mut lower = Boundary::new(Side::Lower, n);
    let mut jump = false;

    for i in 1..n {
        let mut x1 = x[i];
        let y1 = y[i];
        let (x2, y2) = (x[i - 1], y[i - 1]);
        jump = false;

        let repeated = x1 <= x2 && y1 == y2;
        if repeated && upper.xs.is_empty() {
            continue;
        }
        let slope = if repeated {
            // repeated point: push it past both open intervals, keep the slope
            x1 = x1
                .max(x[upper.last_start()] + p.min_step)
                .max(x[lower.last_start()] + p.min_step);
            x[i] = x1;
            upper.last_slope()
        } else {
            if x1 <= x2 {
                jump = true;
                x1 = x2 + p.min_step;
                x[i] = x1;
            }
            (y1 - y2) / (x1 - x2)
        };
        let lower_slope = if x1 <= x2 && y1 == y2 { lower.last_slope() } else { slope };

        upper.intervals.push(Interval::new(i - 1, i, slope));
        lower.intervals.push(Interval::new(i - 1, i, lower_slope));

        if upper.xs.is_empty() {
            if jump {
                upper.seed_jump(x2, y2, slope, i, &p);
                lower.seed_jump(x2, y2, slope, i, &p);
            } else {
                upper.seed(x2, y2, slope, &p);
                lower.seed(x2, y2, slope, &p);
            }
        } else {
            upper.extend(&x, y, x2, y2, &p);
            lower.extend(&x, y, x2, y2, &p);
        }
    }

    if upper.xs.is_empty() || lower.xs.is_empty() {
        return Err(TubeError::TubeCalculation(
            "reference curve has no distinct consecutive points".into(),
        ));
    }

    let (xn, yn) = (x[n - 1], y[n - 1]);
    upper.finish(xn, yn, jump, &p);
    lower.finish(xn, yn, jump, &p);

    Ok(Envelope { lower: lower.into_curve(), upper: upper.into_curve() })
}
