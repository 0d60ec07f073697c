//! Curve representation shared by every stage of the pipeline

use serde::{Deserialize, Serialize};

/// A named, index-aligned pair of coordinate sequences.
///
/// Built once and read-only afterwards. Mismatched input lengths are
/// truncated to the shorter one; an empty input yields an invalid curve
/// (see [`Curve::is_valid`]) instead of an error, so callers can decide
/// which pipeline stage failed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    name: String,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Curve {
    /// Builds a curve, truncating the longer sequence to the shorter length
    pub fn new(name: impl Into<String>, mut x: Vec<f64>, mut y: Vec<f64>) -> Self {
        let n = x.len().min(y.len());
        x.truncate(n);
        y.truncate(n);
        Self { name: name.into(), x, y }
    }

    /// Builds a curve from borrowed slices (copies)
    pub fn from_slices(name: impl Into<String>, x: &[f64], y: &[f64]) -> Self {
        Self::new(name, x.to_vec(), y.to_vec())
    }

    /// An empty, invalid curve
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new(), Vec::new())
    }

    /// Curve name
    pub fn name(&self) -> &str { &self.name }
    /// Abscissa values
    pub fn x(&self) -> &[f64] { &self.x }
    /// Ordinate values
    pub fn y(&self) -> &[f64] { &self.y }
    /// Number of points
    pub fn len(&self) -> usize { self.x.len() }
    /// True when the curve holds no points
    pub fn is_empty(&self) -> bool { self.x.is_empty() }

    /// True when both sequences are non-empty and of equal length
    pub fn is_valid(&self) -> bool {
        !self.x.is_empty() && self.x.len() == self.y.len()
    }

    /// Non-decreasing check on x. Advisory only.
    pub fn is_monotone_in_x(&self) -> bool {
        if self.x.is_empty() {
            return false;
        }
        self.x.windows(2).all(|w| w[0] <= w[1])
    }

    /// Iterator over (x, y) pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// (min, max) of x, None when empty
    pub fn x_range(&self) -> Option<(f64, f64)> { min_max(&self.x) }

    /// (min, max) of y, None when empty
    pub fn y_range(&self) -> Option<(f64, f64)> { min_max(&self.y) }

    /// Consumes the curve and returns its coordinate vectors
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) { (self.x, self.y) }
}

fn min_max(v: &[f64]) -> Option<(f64, f64)> {
    let first = *v.first()?;
    Some(v.iter().fold((first, first), |(lo, hi), &a| (lo.min(a), hi.max(a))))
}
