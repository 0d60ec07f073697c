//! Envelope construction: Lower and Upper boundary curves around a reference
//!
//! Two variants exist. [`Algorithm::Rectangle`] encloses an axis-aligned
//! rectangle around every reference point (weighted maximum norm).
//! [`Algorithm::Ellipse`] encloses an ellipse instead (weighted Euclidean
//! norm) and yields a smoother tube.

use crate::curve::Curve;
use crate::error::{Result, TubeError};
use crate::report::TubeReport;
use crate::tube_size::TubeSize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ellipse variant
pub mod ellipse;
/// Rectangle variant and backward-loop removal
pub mod rectangle;

/// Upper bound on consolidation steps for a single fold or loop scan.
/// Reaching it stops consolidating and keeps the best-effort boundary.
pub const CONSOLIDATION_CEILING: usize = 500;

/// Tube construction algorithm
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Rectangles around the reference points
    #[default]
    Rectangle,
    /// Ellipses around the reference points
    Ellipse,
}

impl Algorithm {
    /// Computes Lower and Upper for `reference` with the given size
    pub fn envelope(self, reference: &Curve, size: &TubeSize) -> Result<Envelope> {
        if !reference.is_valid() {
            return Err(TubeError::TubeCalculation(format!(
                "reference curve '{}' holds no data",
                reference.name()
            )));
        }
        if !size.is_valid() {
            return Err(size.failure());
        }
        match self {
            Algorithm::Rectangle => rectangle::envelope(reference, size),
            Algorithm::Ellipse => ellipse::envelope(reference, size.half_width),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Rectangle => f.write_str("rectangle"),
            Algorithm::Ellipse => f.write_str("ellipse"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = TubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rectangle" | "rect" => Ok(Algorithm::Rectangle),
            "ellipse" => Ok(Algorithm::Ellipse),
            other => Err(TubeError::Config(format!("unknown algorithm: {other}"))),
        }
    }
}

/// Lower and Upper boundary curves
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Lower tube curve
    pub lower: Curve,
    /// Upper tube curve
    pub upper: Curve,
}

/// Which boundary of the tube is being built
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Beneath the reference
    Lower,
    /// Above the reference
    Upper,
}

impl Side {
    /// +1 above the reference, -1 beneath it
    #[inline]
    pub(crate) fn sign(self) -> f64 {
        match self {
            Side::Lower => -1.0,
            Side::Upper => 1.0,
        }
    }

    /// Slope sign as seen from this side: the upper boundary is the mirror image of the lower one
    #[inline]
    pub(crate) fn oriented(self, s: i8) -> i8 {
        match self {
            Side::Lower => s,
            Side::Upper => -s,
        }
    }

    /// `a` lies strictly towards the reference from `b` (above for Lower, below for Upper)
    #[inline]
    pub(crate) fn inside(self, a: f64, b: f64) -> bool {
        match self {
            Side::Lower => a < b,
            Side::Upper => a > b,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Side::Lower => "Lower",
            Side::Upper => "Upper",
        }
    }
}

/// Builds the tube for `reference` and wraps it in a fresh report
pub fn compute(algorithm: Algorithm, reference: &Curve, size: &TubeSize) -> Result<TubeReport> {
    let envelope = algorithm.envelope(reference, size)?;
    let mut report = TubeReport::new(reference.name(), reference.clone(), algorithm);
    report.size = Some(*size);
    report.lower = envelope.lower;
    report.upper = envelope.upper;
    Ok(report)
}

/// True if x never decreases
pub(crate) fn is_non_decreasing(x: &[f64]) -> bool {
    x.windows(2).all(|w| w[0] <= w[1])
}
