//! Per-variable pipeline and batch fan-out
//!
//! Every stage failure is recorded on the variable's report and the batch
//! goes on. Only a relative tolerance outside [0, 1] is returned to the
//! caller, since it would fail identically for every variable.

use crate::algorithms::compute;
use crate::config::CompareOptions;
use crate::curve::Curve;
use crate::dataset::ResultSet;
use crate::error::{Result, TubeError};
use crate::report::{BatchReport, TubeReport};
use crate::validate::validate_report;
use rayon::prelude::*;
use tracing::{debug, error, warn};

/// Builds the tube around `reference` and, when given, validates `test` against it.
///
/// Without a test curve the tube is still computed; the report then ends
/// with `error_step = Validation` and `validity = Undefined`. A test curve
/// without data ends with `error_step = DataImport`.
pub fn compare_curves(reference: Curve, test: Option<Curve>, options: &CompareOptions) -> Result<TubeReport> {
    let name = reference.name().to_string();

    if !reference.is_valid() {
        let err = TubeError::DataImport(format!("reference curve '{name}' holds no data"));
        return Ok(failed(TubeReport::new(name, reference, options.algorithm), err));
    }

    let size = match options.tube_size(&reference) {
        Ok(size) => size,
        Err(err @ TubeError::OutOfRange { .. }) => return Err(err),
        Err(err) => return Ok(failed(TubeReport::new(name, reference, options.algorithm), err)),
    };
    debug!(variable = %name, half_width = size.half_width, half_height = size.half_height, "tube size");

    let mut report = match compute(options.algorithm, &reference, &size) {
        Ok(report) => report,
        Err(err) => {
            let mut report = TubeReport::new(name, reference, options.algorithm);
            report.size = Some(size);
            return Ok(failed(report, err));
        }
    };

    let Some(test) = test else {
        debug!(variable = %name, "no test curve, tube only");
        report.fail(&TubeError::Validation(format!("no test curve for '{name}'")));
        return Ok(report);
    };
    if !test.is_valid() {
        let err = TubeError::DataImport(format!("test curve '{name}' holds no data"));
        report.test = Some(test);
        return Ok(failed(report, err));
    }
    if let Err(err) = validate_report(&mut report, &test) {
        report.test = Some(test);
        return Ok(failed(report, err));
    }
    Ok(report)
}

fn failed(mut report: TubeReport, err: TubeError) -> TubeReport {
    error!(variable = %report.result_name, step = %err.step(), "{err}");
    report.fail(&err);
    report
}

/// Compares every variable of `reference` (or only `only`) against `test`.
///
/// A variable missing from `test` is skipped with a warning. Variables run
/// in parallel; the reports keep reference column order.
pub fn compare_sets(
    reference: &ResultSet,
    test: Option<&ResultSet>,
    options: &CompareOptions,
    only: Option<&str>,
) -> Result<BatchReport> {
    options.validate()?;

    let mut jobs = Vec::new();
    for name in reference.names() {
        if only.is_some_and(|o| o != name) {
            continue;
        }
        let Some(curve) = reference.curve(name) else { continue };
        match test {
            None => jobs.push((curve, None)),
            Some(set) => match set.curve(name) {
                Some(t) => jobs.push((curve, Some(t))),
                None => warn!(variable = %name, "not found in test data, skipped"),
            },
        }
    }
    if let Some(name) = only {
        if jobs.is_empty() {
            return Err(TubeError::DataImport(format!("result variable '{name}' not found")));
        }
    }

    let reports = jobs
        .into_par_iter()
        .map(|(reference, test)| compare_curves(reference, test, options))
        .collect::<Result<Vec<_>>>()?;
    Ok(BatchReport { reports })
}
