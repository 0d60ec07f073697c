//! Point-wise comparison of a test curve against calibrated tube boundaries

use crate::calibrate::interpolate;
use crate::curve::Curve;
use crate::error::{Result, TubeError};
use crate::report::{TubeReport, Validity};
use tracing::{debug, info, warn};

/// Floor added to the test magnitude when normalizing the delta error
const DELTA_NORM_FLOOR: f64 = 1e-3;

/// Outcome of one comparison
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    /// Number of samples outside the tube
    pub error_count: usize,
    /// Out-of-tube samples only: (time, deviation magnitude)
    pub errors: Curve,
    /// Deviation per compared sample, 0 inside the tube
    pub deviations: Vec<f64>,
    /// Normalized, time-integrated deviation
    pub delta_error: f64,
}

impl Comparison {
    /// True when no sample left the tube
    pub fn is_valid(&self) -> bool {
        self.error_count == 0
    }
}

/// Compares `test` against `lower`/`upper`, all sampled on `time`.
///
/// Only the common prefix of the four slices is compared.
pub fn compare(lower: &[f64], upper: &[f64], test: &[f64], time: &[f64]) -> Comparison {
    let m = lower.len().min(upper.len()).min(test.len()).min(time.len());
    let mut deviations = Vec::with_capacity(m);
    let (mut err_x, mut err_y) = (Vec::new(), Vec::new());

    for i in 0..m {
        let v = test[i];
        let d = if v < lower[i] {
            (lower[i] - v).abs()
        } else if v > upper[i] {
            (upper[i] - v).abs()
        } else {
            0.0
        };
        if v < lower[i] || v > upper[i] {
            err_x.push(time[i]);
            err_y.push(d);
        }
        deviations.push(d);
    }

    let delta_error = delta_error(&deviations, &test[..m], &time[..m]);
    Comparison {
        error_count: err_x.len(),
        errors: Curve::new("Errors", err_x, err_y),
        deviations,
        delta_error,
    }
}

/// Trapezoidal weight of every interior deviation, normalized by the largest test magnitude.
/// The first and last samples carry no weight.
pub fn delta_error(deviations: &[f64], test: &[f64], time: &[f64]) -> f64 {
    let m = deviations.len().min(test.len()).min(time.len());
    if m < 3 {
        return 0.0;
    }
    let area: f64 = (1..m - 1)
        .map(|i| deviations[i].abs() * ((time[i] - time[i - 1]).abs() + (time[i + 1] - time[i]).abs()) / 2.0)
        .sum();
    let peak = test[..m].iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    area / (DELTA_NORM_FLOOR + peak)
}

/// Calibrates the tube of `report` onto `test.x` and records the verdict.
///
/// Fails with [`TubeError::Validation`] when either boundary or the test
/// curve is missing, or when the boundaries do not overlap the test grid.
pub fn validate_report(report: &mut TubeReport, test: &Curve) -> Result<()> {
    if !report.lower.is_valid() || !report.upper.is_valid() {
        return Err(TubeError::Validation(format!(
            "'{}' has no tube boundaries",
            report.result_name
        )));
    }
    if !test.is_valid() {
        return Err(TubeError::Validation(format!(
            "test curve for '{}' holds no data",
            report.result_name
        )));
    }

    let time = test.x();
    let lower = interpolate(report.lower.x(), report.lower.y(), time);
    let upper = interpolate(report.upper.x(), report.upper.y(), time);
    let m = lower.len().min(upper.len());
    if m == 0 {
        return Err(TubeError::Validation(format!(
            "tube of '{}' does not overlap the test time axis",
            report.result_name
        )));
    }
    if m < time.len() {
        warn!(
            variable = %report.result_name,
            compared = m,
            samples = time.len(),
            "test curve extends past the tube; trailing samples not compared"
        );
    }

    let cmp = compare(&lower, &upper, test.y(), time);
    debug!(variable = %report.result_name, errors = cmp.error_count, delta = cmp.delta_error, "compared");
    report.validity = if cmp.is_valid() { Validity::Valid } else { Validity::Invalid };
    match report.validity {
        Validity::Valid => info!(variable = %report.result_name, "valid"),
        _ => warn!(
            variable = %report.result_name,
            errors = cmp.error_count,
            "invalid: samples found outside the tube"
        ),
    }
    report.errors = cmp.errors;
    report.delta_error = cmp.delta_error;
    report.test = Some(test.clone());
    Ok(())
}
