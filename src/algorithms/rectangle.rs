//! Rectangle envelope: every reference point is the center of an
//! axis-aligned rectangle of half-width `size.half_width` and half-height
//! `size.half_height`; Lower runs beneath and Upper above all rectangles.
//!
//! Corners are emitted per reference point from the slope signs before and
//! after it. Corner placement can make the polyline step backward in x, so
//! a post-pass ([`remove_backward_loops`]) cuts those loops at the
//! intersection of the enclosing segments.

use super::{is_non_decreasing, Envelope, Side, CONSOLIDATION_CEILING};
use crate::curve::Curve;
use crate::error::{Result, TubeError};
use crate::tube_size::TubeSize;
use tracing::{debug, warn};

/// Outcome of [`remove_backward_loops`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopRemoval {
    /// Number of backward segments that were cut
    pub loops: usize,
    /// True if the iteration ceiling stopped the pass early
    pub exhausted: bool,
}

/// Computes Lower and Upper for `reference`
pub fn envelope(reference: &Curve, size: &TubeSize) -> Result<Envelope> {
    let lower = boundary(reference, size, Side::Lower)?;
    let upper = boundary(reference, size, Side::Upper)?;
    Ok(Envelope { lower, upper })
}

/// Sign of `v` as -1, 0 or 1 (zero stays zero, unlike `f64::signum`)
#[inline]
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Slope sign and slope of segment (i, i + 1); vertical segments get an infinite slope
fn slope_at(x: &[f64], y: &[f64], i: usize) -> (i8, f64) {
    let s = sign(y[i + 1] - y[i]);
    let m = if x[i + 1] - x[i] != 0.0 {
        (y[i + 1] - y[i]) / (x[i + 1] - x[i])
    } else if s > 0 {
        f64::INFINITY
    } else {
        f64::NEG_INFINITY
    };
    (s, m)
}

/// Builds one boundary curve (corners, then loop removal)
pub fn boundary(reference: &Curve, size: &TubeSize, side: Side) -> Result<Curve> {
    let (mut bx, mut by) = corners(reference.x(), reference.y(), size, side)?;
    let removal = remove_backward_loops(&mut bx, &mut by, side);
    debug!(side = side.label(), loops = removal.loops, points = bx.len(), "rectangle boundary built");
    if !is_non_decreasing(&bx) {
        warn!(side = side.label(), "boundary still moves backward in x after loop removal");
    }
    Ok(Curve::new(side.label(), bx, by))
}

fn corners(x: &[f64], y: &[f64], size: &TubeSize, side: Side) -> Result<(Vec<f64>, Vec<f64>)> {
    let n = x.len().min(y.len());
    let w = size.half_width;
    let h = side.sign() * size.half_height;
    let identical = |i: usize| x[i] - x[i + 1] == 0.0 && y[i] - y[i + 1] == 0.0;

    // skip identical points at the beginning
    let mut b = 0;
    while b + 1 < n && identical(b) {
        b += 1;
    }
    if b + 1 >= n {
        return Err(TubeError::TubeCalculation(
            "reference curve needs at least two distinct points".into(),
        ));
    }

    let mut bx = Vec::with_capacity(2 * n);
    let mut by = Vec::with_capacity(2 * n);

    // start: rectangle around the first distinct point
    let (mut s0, mut m0) = slope_at(x, y, b);
    bx.push(x[b] - w);
    by.push(y[b] + h);
    if side.oriented(s0) == 1 {
        bx.push(x[b] + w);
        by.push(y[b] + h);
    }

    for i in b + 1..n - 1 {
        if identical(i) {
            continue;
        }
        let (s1, m1) = slope_at(x, y, i);

        // equal slopes on both sides: the point lies on a straight run
        if m0 != m1 {
            let left = (x[i] - w, y[i] + h);
            let right = (x[i] + w, y[i] + h);
            let (t0, t1) = (side.oriented(s0), side.oriented(s1));
            let added = if t0 != -1 && t1 != -1 {
                [Some(right), None]
            } else if t0 != 1 && t1 != 1 {
                [Some(left), None]
            } else if t0 == -1 && t1 == 1 {
                [Some(left), Some(right)]
            } else {
                [Some(right), Some(left)]
            };
            for (px, py) in added.into_iter().flatten() {
                bx.push(px);
                by.push(py);
            }

            // collapse a flat run that the next corner would continue
            let last = by.len() - 1;
            if y[i + 1] + h == by[last] {
                if s0 * s1 == -1 && last >= 2 && by[last - 2] == by[last] {
                    bx.truncate(last - 1);
                    by.truncate(last - 1);
                } else if s0 * s1 != -1 && last >= 1 && by[last - 1] == by[last] {
                    bx.truncate(last);
                    by.truncate(last);
                }
            }
        }
        s0 = s1;
        m0 = m1;
    }

    // end: rectangle around the last point
    let (xn, yn) = (x[n - 1], y[n - 1]);
    if side.oriented(s0) == -1 {
        bx.push(xn - w);
        by.push(yn + h);
        // continue the final slope outward so a steep tail does not produce a short edge
        let tail = by[by.len() - 1];
        let rise = if m0.is_finite() { w * m0 * 2.0 } else { 0.0 };
        bx.push(xn + w);
        by.push(tail + rise);
    } else {
        bx.push(xn + w);
        by.push(yn + h);
    }
    Ok((bx, by))
}

/// Removes loops where the polyline steps backward in x.
///
/// For each backward segment `(j, j + 1)` the enclosing segments
/// `(i - 1, i)` and `(k - 1, k)` are located, points `i..k` are deleted and
/// their intersection is spliced in. Runs until no backward segment is
/// left or the iteration ceiling is reached. A second pass over the output
/// is a no-op.
pub fn remove_backward_loops(x: &mut Vec<f64>, y: &mut Vec<f64>, side: Side) -> LoopRemoval {
    let budget = x.len() + CONSOLIDATION_CEILING;
    remove_backward_loops_within(x, y, side, budget)
}

/// [`remove_backward_loops`] with an explicit cap on the number of cuts.
/// Once the cap is hit the polyline is left as it is and `exhausted` is set.
pub fn remove_backward_loops_within(
    x: &mut Vec<f64>,
    y: &mut Vec<f64>,
    side: Side,
    budget: usize,
) -> LoopRemoval {
    let mut removal = LoopRemoval::default();
    let mut j = 1;
    while j + 2 < x.len() {
        if x[j + 1] < x[j] {
            if removal.loops == budget {
                warn!(side = side.label(), loops = removal.loops, "loop removal ceiling reached");
                removal.exhausted = true;
                break;
            }
            removal.loops += 1;
            j = excise_loop(x, y, j, side);
        }
        j += 1;
    }
    removal
}

/// Cuts the loop around backward segment `(j, j + 1)`; returns the index to resume from
fn excise_loop(x: &mut Vec<f64>, y: &mut Vec<f64>, j: usize, side: Side) -> usize {
    let n = x.len();

    // 1. find i, k with i <= j < j + 1 <= k - 1 such that (i - 1, i) crosses (k - 1, k)
    let mut i = j;
    let mut i_prev = i;
    while i > 1 && x[j + 1] < x[i - 1] {
        i -= 1;
    }

    let mut k_max = j + 1;
    while x[k_max] < x[j] && k_max < n - 1 {
        k_max += 1;
    }

    let mut k = j + 1;
    let mut level = y[i - 1];
    while side.inside(level, y[k]) && k < k_max {
        i_prev = i;
        k += 1;
        while i < j && advances(x, y, i, k, side) {
            i += 1;
        }
        level = if x[i] - x[i - 1] != 0.0 {
            lerp(x[i - 1], y[i - 1], x[i], y[i], x[k])
        } else {
            y[i]
        };
    }

    // k located; i is on the polyline (i_prev - 1, i)
    i = if i_prev > 1 { i_prev - 1 } else { i_prev };
    let k_vertical = x[k] == x[k - 1];
    if !k_vertical {
        level = lerp(x[k - 1], y[k - 1], x[k], y[k], x[i]);
    }
    while i + 1 < k
        && ((!k_vertical && side.inside(y[i], level)) || (k_vertical && x[i] < x[k]))
    {
        i += 1;
        if !k_vertical {
            level = lerp(x[k - 1], y[k - 1], x[k], y[k], x[i]);
        }
    }

    // 2. intersection of (i - 1, i) and (k - 1, k)
    let cross = intersection(
        (x[i - 1], y[i - 1]),
        (x[i], y[i]),
        (x[k - 1], y[k - 1]),
        (x[k], y[k]),
    );

    // 3. delete i..k
    x.drain(i..k);
    y.drain(i..k);

    // 4. splice in the intersection unless it is already there
    if let Some((ix, iy)) = cross {
        if x[i] != ix || y[i] != iy {
            x.insert(i, ix);
            y.insert(i, iy);
        }
    }

    // 5. collapse a doubled point
    if x[i - 1] == x[i] && y[i - 1] == y[i] {
        x.remove(i);
        y.remove(i);
        return i - 1;
    }
    i
}

/// Whether the i cursor must move past point `i` while scanning for `k`
fn advances(x: &[f64], y: &[f64], i: usize, k: usize, side: Side) -> bool {
    if x[i] < x[k] {
        return true;
    }
    // on a shared vertical, keep going unless k itself starts a vertical drop outward
    let vertical_next = k + 1 < x.len() && x[k] == x[k + 1] && side.inside(y[k + 1], y[k]);
    x[i] == x[k] && side.inside(y[i], y[k]) && !vertical_next
}

#[inline]
fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, at: f64) -> f64 {
    (y1 - y0) / (x1 - x0) * (at - x0) + y0
}

/// Intersection of the lines through two segments.
///
/// None when both are vertical or the slopes are equal; the loop is then
/// excised without a replacement point.
fn intersection(a0: (f64, f64), a1: (f64, f64), b0: (f64, f64), b1: (f64, f64)) -> Option<(f64, f64)> {
    let a_vertical = a1.0 == a0.0;
    let b_vertical = b1.0 == b0.0;
    match (a_vertical, b_vertical) {
        (true, true) => None,
        (true, false) => Some((a1.0, b0.1 + (a1.0 - b0.0) * (b1.1 - b0.1) / (b1.0 - b0.0))),
        (false, true) => Some((b1.0, a0.1 + (b1.0 - a0.0) * (a1.1 - a0.1) / (a1.0 - a0.0))),
        (false, false) => {
            let a = (a1.1 - a0.1) / (a1.0 - a0.0);
            let b = (b1.1 - b0.1) / (b1.0 - b0.0);
            if a == b {
                return None;
            }
            let ix = (a * a0.0 - b * b0.0 - a0.1 + b0.1) / (a - b);
            // evaluate on the flatter segment
            let iy = if a.abs() > b.abs() { b * (ix - b0.0) + b0.1 } else { a * (ix - a0.0) + a0.1 };
            Some((ix, iy))
        }
    }
}
