//! Delimited result files: reading result sets, writing tubes and summaries

use crate::config::ReadOptions;
use crate::curve::Curve;
use crate::error::{Result, TubeError};
use crate::report::{BatchReport, ErrorDisplay, TubeReport};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Time axis plus named result columns, as read from one file.
///
/// Columns may be shorter than the time axis when a cell could not be
/// parsed; the column ends at that row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    time_name: String,
    time: Vec<f64>,
    columns: Vec<(String, Vec<f64>)>,
}

impl ResultSet {
    /// Builds a set from in-memory columns
    pub fn from_columns(time_name: impl Into<String>, time: Vec<f64>, columns: Vec<(String, Vec<f64>)>) -> Self {
        Self { time_name: time_name.into(), time, columns }
    }

    /// Reads a delimited file: header first, `#` lines are comments, the
    /// first column is the time axis.
    pub fn read(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        options.validate()?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(options.delimiter_byte()?)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let header = rdr.headers()?.clone();
        let names: Vec<String> = header.iter().map(clean_name).collect();
        if names.len() < 2 {
            return Err(TubeError::DataImport(format!(
                "{}: need a time column and at least one result column",
                path.display()
            )));
        }
        let mut seen = HashSet::new();
        for name in &names {
            if name.is_empty() {
                return Err(TubeError::DataImport(format!("{}: empty column name", path.display())));
            }
            if !seen.insert(name.as_str()) {
                return Err(TubeError::DataImport(format!(
                    "{}: duplicate column '{name}'",
                    path.display()
                )));
            }
            if name.parse::<f64>().is_ok() {
                warn!(file = %path.display(), column = %name, "header looks numeric; is the first line data?");
            }
        }

        let mut time = Vec::new();
        let mut columns: Vec<(String, Vec<f64>)> = names[1..].iter().map(|n| (n.clone(), Vec::new())).collect();
        let mut open = vec![true; columns.len()];

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let Some(t) = record.get(0).and_then(|c| parse_cell(c, options.decimal_separator)) else {
                warn!(file = %path.display(), row, "unreadable time value, reading stopped");
                break;
            };
            time.push(t);
            for (idx, (name, values)) in columns.iter_mut().enumerate() {
                if !open[idx] {
                    continue;
                }
                match record.get(idx + 1).and_then(|c| parse_cell(c, options.decimal_separator)) {
                    Some(v) => values.push(v),
                    None => {
                        debug!(file = %path.display(), column = %name, row, "column ends at unreadable cell");
                        open[idx] = false;
                    }
                }
            }
        }

        if time.len() < 2 {
            return Err(TubeError::DataImport(format!(
                "{}: fewer than two data rows",
                path.display()
            )));
        }
        debug!(file = %path.display(), rows = time.len(), columns = columns.len(), "result set read");
        Ok(Self { time_name: names[0].clone(), time, columns })
    }

    /// Name of the time column
    pub fn time_name(&self) -> &str { &self.time_name }

    /// Number of data rows
    pub fn rows(&self) -> usize { self.time.len() }

    /// Result variable names in column order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Curve of one variable against the time axis
    pub fn curve(&self, name: &str) -> Option<Curve> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, values)| Curve::new(n.clone(), self.time.clone(), values.clone()))
    }
}

fn clean_name(cell: &str) -> String {
    cell.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace()).to_string()
}

fn parse_cell(cell: &str, decimal_separator: char) -> Option<f64> {
    let cell = cell.trim();
    if decimal_separator == '.' {
        cell.parse().ok()
    } else {
        cell.replace(decimal_separator, ".").parse().ok()
    }
}

/// File-system friendly form of a variable name
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

#[derive(Serialize)]
struct TubeRow<'a> {
    series: &'a str,
    x: f64,
    y: f64,
}

/// Writes reference, boundaries, test and errors of `report` as long-format
/// CSV (`series,x,y`) to `<dir>/<variable>.csv`
pub fn write_tube_csv(dir: impl AsRef<Path>, report: &TubeReport, display: ErrorDisplay) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("{}.csv", file_stem(&report.result_name)));
    let mut wtr = csv::Writer::from_path(&path)?;
    let errors = display.apply(&report.errors);
    let series = [
        ("Reference", Some(&report.reference)),
        ("Lower", Some(&report.lower)),
        ("Upper", Some(&report.upper)),
        ("Test", report.test.as_ref()),
        ("Errors", Some(&errors)),
    ];
    for (label, curve) in series {
        for (x, y) in curve.into_iter().flat_map(Curve::points) {
            wtr.serialize(TubeRow { series: label, x, y })?;
        }
    }
    wtr.flush()?;
    Ok(path)
}

/// Writes `<dir>/summary.json`
pub fn write_summary_json(dir: impl AsRef<Path>, batch: &BatchReport) -> Result<PathBuf> {
    let path = dir.as_ref().join("summary.json");
    let file = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(file, &batch.summary())?;
    Ok(path)
}

/// Writes `<dir>/compare_<result>.log` naming the biggest delta error and
/// every failed variable, largest first
pub fn write_comparison_flag(
    dir: impl AsRef<Path>,
    batch: &BatchReport,
    source: &str,
    tolerance: f64,
) -> Result<PathBuf> {
    let outcome = batch.outcome();
    let path = dir.as_ref().join(format!("compare_{}.log", outcome.label()));
    let mut file = BufWriter::new(File::create(&path)?);

    writeln!(file, "tubecompare {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "Comparison result file for {source}")?;
    writeln!(file, ". Tolerance:   {tolerance}")?;
    writeln!(file, ". Result:      {}", outcome.label())?;
    if batch.invalid() > 0 {
        if let Some(worst) = batch.worst() {
            writeln!(file, ". Biggest error: {}=>{}", worst.result_name, worst.delta_error)?;
        }
        writeln!(file, ". Failed values:")?;
        for r in batch.failed_by_severity() {
            writeln!(file, "{}=>{}", r.result_name, r.delta_error)?;
        }
    }
    file.flush()?;
    Ok(path)
}
