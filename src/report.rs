//! Per-variable tube reports and their batch aggregate

use crate::algorithms::Algorithm;
use crate::curve::Curve;
use crate::error::TubeError;
use crate::tube_size::TubeSize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of one comparison
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Validity {
    /// Not compared (missing input or failed stage)
    #[default]
    Undefined,
    /// Every test sample inside the tube
    Valid,
    /// At least one test sample outside the tube
    Invalid,
}

/// Pipeline stage that failed, `None` when every stage completed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorStep {
    /// Reading or assembling curves
    DataImport,
    /// Bases, ratio or tolerance value
    TubeSize,
    /// Envelope construction
    Tube,
    /// Calibration or comparison
    Validation,
    /// No failure
    #[default]
    None,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ErrorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything known about one result variable after the pipeline ran
#[derive(Clone, Debug, PartialEq)]
pub struct TubeReport {
    /// Name of the result variable
    pub result_name: String,
    /// Reference curve the tube surrounds
    pub reference: Curve,
    /// Test curve, if one was compared
    pub test: Option<Curve>,
    /// Tube size used for construction
    pub size: Option<TubeSize>,
    /// Lower boundary
    pub lower: Curve,
    /// Upper boundary
    pub upper: Curve,
    /// Sparse out-of-tube samples: (time, deviation)
    pub errors: Curve,
    /// Verdict
    pub validity: Validity,
    /// Envelope algorithm
    pub algorithm: Algorithm,
    /// First failed stage
    pub error_step: ErrorStep,
    /// Normalized integral of the deviations
    pub delta_error: f64,
}

impl TubeReport {
    /// Empty report for `name`; boundaries and errors start out empty
    pub fn new(name: impl Into<String>, reference: Curve, algorithm: Algorithm) -> Self {
        Self {
            result_name: name.into(),
            reference,
            test: None,
            size: None,
            lower: Curve::empty("Lower"),
            upper: Curve::empty("Upper"),
            errors: Curve::empty("Errors"),
            validity: Validity::Undefined,
            algorithm,
            error_step: ErrorStep::None,
            delta_error: 0.0,
        }
    }

    /// Records a stage failure; the verdict becomes `Undefined`
    pub fn fail(&mut self, err: &TubeError) {
        self.error_step = err.step();
        self.validity = Validity::Undefined;
    }

    /// Number of out-of-tube samples
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Flat summary for serialization
    pub fn summary_row(&self) -> SummaryRow {
        SummaryRow {
            variable: self.result_name.clone(),
            algorithm: self.algorithm,
            validity: self.validity,
            error_step: self.error_step,
            errors: self.error_count(),
            delta_error: self.delta_error,
            half_width: self.size.map(|s| s.half_width),
            half_height: self.size.map(|s| s.half_height),
        }
    }
}

/// How error samples are written out. Never affects the comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorDisplay {
    /// Deviation magnitude
    #[default]
    Magnitude,
    /// 1.0 for every out-of-tube sample
    Flag,
}

impl ErrorDisplay {
    /// Applies the display mode to an error curve
    pub fn apply(self, errors: &Curve) -> Curve {
        match self {
            ErrorDisplay::Magnitude => errors.clone(),
            ErrorDisplay::Flag => Curve::new(errors.name(), errors.x().to_vec(), vec![1.0; errors.len()]),
        }
    }
}

/// One line of the batch summary
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub variable: String,
    pub algorithm: Algorithm,
    pub validity: Validity,
    pub error_step: ErrorStep,
    pub errors: usize,
    pub delta_error: f64,
    pub half_width: Option<f64>,
    pub half_height: Option<f64>,
}

/// Process-level result of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// No invalid variable
    Passed,
    /// At least one invalid variable
    Failed,
    /// Nothing could be compared
    NoTestData,
}

impl BatchOutcome {
    /// Exit status of the binary
    pub fn exit_code(self) -> u8 {
        match self {
            BatchOutcome::Passed => 0,
            BatchOutcome::Failed => 1,
            BatchOutcome::NoTestData => 2,
        }
    }

    /// Word used in the comparison flag file name
    pub fn label(self) -> &'static str {
        match self {
            BatchOutcome::Passed => "passed",
            BatchOutcome::Failed => "failed",
            BatchOutcome::NoTestData => "na",
        }
    }
}

/// Reports of every compared variable, in reference column order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    /// One report per variable
    pub reports: Vec<TubeReport>,
}

impl BatchReport {
    fn count(&self, validity: Validity) -> usize {
        self.reports.iter().filter(|r| r.validity == validity).count()
    }

    /// Variables inside their tube
    pub fn valid(&self) -> usize { self.count(Validity::Valid) }
    /// Variables leaving their tube
    pub fn invalid(&self) -> usize { self.count(Validity::Invalid) }
    /// Variables never compared
    pub fn undefined(&self) -> usize { self.count(Validity::Undefined) }

    /// Variables with a failed stage
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.error_step != ErrorStep::None).count()
    }

    /// valid / (valid + invalid); None when nothing was compared
    pub fn success_rate(&self) -> Option<f64> {
        let (valid, invalid) = (self.valid(), self.invalid());
        if valid + invalid == 0 {
            None
        } else {
            Some(valid as f64 / (valid + invalid) as f64)
        }
    }

    /// Aggregate verdict; a batch without a single Valid or Invalid
    /// variable, empty ones included, compared nothing
    pub fn outcome(&self) -> BatchOutcome {
        if self.invalid() > 0 {
            BatchOutcome::Failed
        } else if self.valid() == 0 {
            BatchOutcome::NoTestData
        } else {
            BatchOutcome::Passed
        }
    }

    /// Report with the largest delta error, if any
    pub fn worst(&self) -> Option<&TubeReport> {
        self.reports
            .iter()
            .filter(|r| r.delta_error > 0.0)
            .max_by(|a, b| a.delta_error.total_cmp(&b.delta_error))
    }

    /// Reports with a positive delta error, largest first
    pub fn failed_by_severity(&self) -> Vec<&TubeReport> {
        let mut v: Vec<&TubeReport> = self.reports.iter().filter(|r| r.delta_error > 0.0).collect();
        v.sort_by(|a, b| b.delta_error.total_cmp(&a.delta_error));
        v
    }

    /// Serializable aggregate
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            rows: self.reports.iter().map(TubeReport::summary_row).collect(),
            valid: self.valid(),
            invalid: self.invalid(),
            undefined: self.undefined(),
            failed: self.failed(),
            success_rate: self.success_rate(),
            outcome: self.outcome(),
        }
    }
}

/// JSON document written next to the tube files
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub rows: Vec<SummaryRow>,
    pub valid: usize,
    pub invalid: usize,
    pub undefined: usize,
    pub failed: usize,
    pub success_rate: Option<f64>,
    pub outcome: BatchOutcome,
}
