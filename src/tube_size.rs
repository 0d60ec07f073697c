//! Tube size: absolute half-width and half-height of the tolerance band

use crate::curve::Curve;
use crate::error::{Result, TubeError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Guards single-sample curves under the legacy policy, where base_x would be zero
const LEGACY_EPSILON: f64 = 1e-12;

/// Dimension a tolerance value primarily sizes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Half-width (time direction)
    #[default]
    X,
    /// Half-height (value direction)
    Y,
}

/// Whether a tolerance value is a fraction of a base or an absolute measure
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relativity {
    /// Fraction in [0, 1] of the normalization base
    #[default]
    Relative,
    /// Absolute width/height
    Absolute,
}

/// Formula used to derive bases and ratio from the reference curve
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasePolicy {
    /// base_x from the x range, base_y from the y range floored by the nominal value
    #[default]
    Standard,
    /// Historical formula that also folds in |min_x| and |min_y|
    Legacy,
}

impl FromStr for Axis {
    type Err = TubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            other => Err(TubeError::Config(format!("unknown axis: {other}"))),
        }
    }
}

impl FromStr for Relativity {
    type Err = TubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "relative" | "rel" => Ok(Relativity::Relative),
            "absolute" | "abs" => Ok(Relativity::Absolute),
            other => Err(TubeError::Config(format!("unknown relativity: {other}"))),
        }
    }
}

impl FromStr for BasePolicy {
    type Err = TubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(BasePolicy::Standard),
            "legacy" => Ok(BasePolicy::Legacy),
            other => Err(TubeError::Config(format!("unknown base policy: {other}"))),
        }
    }
}

/// Half-width / half-height of the tube plus the normalization constants
/// used to derive them.
///
/// Invariant when valid: `ratio > 0`, both half dimensions `>= 0` and
/// `half_height == ratio * half_width` (up to rounding).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TubeSize {
    /// Half width of the rectangle / ellipse in x direction
    pub half_width: f64,
    /// Half height of the rectangle / ellipse in y direction
    pub half_height: f64,
    /// Base of relative values in x direction
    pub base_x: f64,
    /// Base of relative values in y direction
    pub base_y: f64,
    /// half_height / half_width
    pub ratio: f64,
    valid: bool,
}

impl TubeSize {
    /// Derives bases and ratio from `reference`.
    ///
    /// `nominal` floors base_y for near-constant reference curves. The size
    /// itself is not valid until one of the `calculate_*` methods succeeds.
    pub fn new(reference: &Curve, nominal: f64, policy: BasePolicy) -> Self {
        let mut size = Self::from_bases(0.0, 0.0, 0.0);
        size.compute_bases(reference, nominal, policy);
        size
    }

    /// Builds a size from explicit bases and ratio
    pub fn from_bases(base_x: f64, base_y: f64, ratio: f64) -> Self {
        Self { half_width: 0.0, half_height: 0.0, base_x, base_y, ratio, valid: false }
    }

    /// True once a `calculate_*` call succeeded
    pub fn is_valid(&self) -> bool { self.valid }

    /// Recomputes base_x, base_y and ratio from the reference curve
    pub fn compute_bases(&mut self, reference: &Curve, nominal: f64, policy: BasePolicy) {
        self.valid = false;
        let (Some((min_x, max_x)), Some((min_y, max_y))) = (reference.x_range(), reference.y_range()) else {
            self.base_x = 0.0;
            self.base_y = 0.0;
            self.ratio = 0.0;
            return;
        };
        match policy {
            BasePolicy::Standard => {
                let mut base_x = max_x - min_x;
                if base_x == 0.0 {
                    base_x = max_x.abs();
                }
                if base_x == 0.0 {
                    base_x = 1.0;
                }
                self.base_x = base_x;
                self.base_y = (max_y - min_y).max(nominal);
            }
            BasePolicy::Legacy => {
                self.base_x = (max_x - min_x).max(min_x.abs()).max(LEGACY_EPSILON);
                self.base_y = (max_y - min_y).max(min_y.abs()).max(nominal);
            }
        }
        self.ratio = if self.base_x != 0.0 { self.base_y / self.base_x } else { 0.0 };
    }

    /// Derives both half dimensions from one value on `axis`.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` if the ratio or the
    /// selected base is not positive, and `Err(OutOfRange)` if a relative
    /// value lies outside [0, 1].
    pub fn calculate_from_one(&mut self, value: f64, axis: Axis, relativity: Relativity) -> Result<bool> {
        self.valid = false;
        if relativity == Relativity::Relative {
            check_fraction(value)?;
        }
        if !(self.ratio > 0.0) || !value.is_finite() {
            return Ok(false);
        }
        match (relativity, axis) {
            (Relativity::Relative, Axis::X) => {
                if !(self.base_x > 0.0) {
                    return Ok(false);
                }
                self.half_width = value * self.base_x;
                self.half_height = self.ratio * self.half_width;
            }
            (Relativity::Relative, Axis::Y) => {
                if !(self.base_y > 0.0) {
                    return Ok(false);
                }
                self.half_height = value * self.base_y;
                self.half_width = self.half_height / self.ratio;
            }
            (Relativity::Absolute, _) if value < 0.0 => return Ok(false),
            (Relativity::Absolute, Axis::X) => {
                self.half_width = value;
                self.half_height = value * self.ratio;
            }
            (Relativity::Absolute, Axis::Y) => {
                self.half_height = value;
                self.half_width = value / self.ratio;
            }
        }
        self.valid = true;
        Ok(true)
    }

    /// Sets both half dimensions directly.
    ///
    /// Relative mode needs both bases `> 0` and both fractions in [0, 1].
    /// Absolute mode succeeds for any finite, non-negative pair. The ratio
    /// is refreshed to `half_height / half_width` when the width is positive.
    pub fn calculate_from_two(&mut self, x: f64, y: f64, relativity: Relativity) -> Result<bool> {
        self.valid = false;
        match relativity {
            Relativity::Relative => {
                check_fraction(y)?;
                check_fraction(x)?;
                if !(self.base_x > 0.0 && self.base_y > 0.0) {
                    return Ok(false);
                }
                self.half_width = x * self.base_x;
                self.half_height = y * self.base_y;
            }
            Relativity::Absolute => {
                if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
                    return Ok(false);
                }
                self.half_width = x;
                self.half_height = y;
            }
        }
        if self.half_width > 0.0 {
            self.ratio = self.half_height / self.half_width;
        }
        self.valid = true;
        Ok(true)
    }

    /// The error describing why this size is not usable
    pub fn failure(&self) -> TubeError {
        TubeError::TubeSize { ratio: self.ratio, base_x: self.base_x, base_y: self.base_y }
    }
}

fn check_fraction(value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TubeError::OutOfRange { value })
    }
}
