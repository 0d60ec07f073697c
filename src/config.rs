//! Tolerance and input configuration

use crate::algorithms::Algorithm;
use crate::curve::Curve;
use crate::error::{Result, TubeError};
use crate::tube_size::{Axis, BasePolicy, Relativity, TubeSize};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// How a tube is sized and built. Missing JSON fields take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Tolerance on `axis`, or on X when `value_y` is set
    pub value: f64,
    /// Tolerance on Y; when present both dimensions are set directly
    pub value_y: Option<f64>,
    /// Dimension `value` applies to
    pub axis: Axis,
    /// Relative fraction or absolute size
    pub relativity: Relativity,
    /// Envelope algorithm
    pub algorithm: Algorithm,
    /// Floor of base_y for near-constant references
    pub nominal: f64,
    /// Base/ratio formula
    pub base_policy: BasePolicy,
    /// Replaces the computed base_x
    pub base_x: Option<f64>,
    /// Replaces the computed base_y
    pub base_y: Option<f64>,
    /// Replaces the computed ratio
    pub ratio: Option<f64>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            value: 0.002,
            value_y: None,
            axis: Axis::X,
            relativity: Relativity::Relative,
            algorithm: Algorithm::Rectangle,
            nominal: 0.001,
            base_policy: BasePolicy::Standard,
            base_x: None,
            base_y: None,
            ratio: None,
        }
    }
}

impl CompareOptions {
    /// Reads options from a JSON document
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let options: Self = serde_json::from_reader(BufReader::new(file))?;
        options.validate()?;
        Ok(options)
    }

    /// Rejects values no tube can be built from
    pub fn validate(&self) -> Result<()> {
        let finite = |name: &str, v: f64| {
            if v.is_finite() {
                Ok(())
            } else {
                Err(TubeError::Config(format!("{name} must be finite (got {v})")))
            }
        };
        finite("value", self.value)?;
        if let Some(v) = self.value_y {
            finite("value_y", v)?;
        }
        if !(self.nominal > 0.0) || !self.nominal.is_finite() {
            return Err(TubeError::Config(format!("nominal must be finite and > 0 (got {})", self.nominal)));
        }
        for (name, v) in [("base_x", self.base_x), ("base_y", self.base_y), ("ratio", self.ratio)] {
            if let Some(v) = v {
                finite(name, v)?;
            }
        }
        if self.relativity == Relativity::Relative {
            for v in std::iter::once(self.value).chain(self.value_y) {
                if !(0.0..=1.0).contains(&v) {
                    return Err(TubeError::OutOfRange { value: v });
                }
            }
        }
        Ok(())
    }

    /// Derives the tube size for `reference`.
    ///
    /// Overrides replace the computed bases; the ratio follows overridden
    /// bases unless it is overridden itself.
    pub fn tube_size(&self, reference: &Curve) -> Result<TubeSize> {
        let mut size = TubeSize::new(reference, self.nominal, self.base_policy);
        if let Some(bx) = self.base_x {
            size.base_x = bx;
        }
        if let Some(by) = self.base_y {
            size.base_y = by;
        }
        if let Some(ratio) = self.ratio {
            size.ratio = ratio;
        } else if self.base_x.is_some() || self.base_y.is_some() {
            size.ratio = if size.base_x != 0.0 { size.base_y / size.base_x } else { 0.0 };
        }

        let ok = match self.value_y {
            Some(vy) => size.calculate_from_two(self.value, vy, self.relativity)?,
            None => size.calculate_from_one(self.value, self.axis, self.relativity)?,
        };
        if ok {
            Ok(size)
        } else {
            Err(size.failure())
        }
    }
}

/// Layout of the delimited result files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Field delimiter
    pub delimiter: char,
    /// Decimal separator of numeric cells
    pub decimal_separator: char,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { delimiter: ';', decimal_separator: '.' }
    }
}

impl ReadOptions {
    /// Delimiter as the single byte the reader expects
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(TubeError::Config(format!("delimiter must be ASCII (got {:?})", self.delimiter)))
        }
    }

    /// Rejects a decimal separator equal to the delimiter
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.delimiter == self.decimal_separator {
            return Err(TubeError::Config(format!(
                "delimiter and decimal separator are both {:?}",
                self.delimiter
            )));
        }
        Ok(())
    }
}
