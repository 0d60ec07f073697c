use tubecompare::algorithms::Algorithm;
use tubecompare::compare::compare_sets;
use tubecompare::config::{CompareOptions, ReadOptions};
use tubecompare::dataset::{file_stem, write_comparison_flag, write_summary_json, write_tube_csv, ResultSet};
use tubecompare::plot::plot_tube;
use tubecompare::report::ErrorDisplay;
use tubecompare::tube_size::{Axis, BasePolicy, Relativity};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tubecompare",
    version,
    about = "Tube-based validation of simulation results against a reference"
)]
struct Args {
    /// Reference result file (first column is time)
    reference: PathBuf,
    /// Result file to validate; without it only the tubes are computed
    test: Option<PathBuf>,

    /// Tolerance on --axis, or on X when --tolerance-y is given
    #[arg(long, default_value_t = 0.002)]
    tolerance: f64,
    /// Tolerance on Y; sets both dimensions directly
    #[arg(long)]
    tolerance_y: Option<f64>,
    #[arg(long, default_value = "x")]
    axis: Axis,
    #[arg(long, default_value = "relative")]
    relativity: Relativity,
    #[arg(long, default_value = "rectangle")]
    algorithm: Algorithm,
    /// Floor of base_y for near-constant references
    #[arg(long, default_value_t = 0.001)]
    nominal: f64,
    /// Historical base/ratio formula
    #[arg(long, action = clap::ArgAction::SetTrue)]
    legacy_base: bool,
    #[arg(long)]
    base_x: Option<f64>,
    #[arg(long)]
    base_y: Option<f64>,
    #[arg(long)]
    ratio: Option<f64>,

    /// JSON file with tolerance options, replaces the tolerance flags
    #[arg(long)]
    config: Option<PathBuf>,
    /// Only compare this result variable
    #[arg(long)]
    result: Option<String>,

    #[arg(long, default_value_t = ';')]
    delimiter: char,
    /// Decimal separator of numeric cells
    #[arg(long, default_value_t = '.')]
    separator: char,

    #[arg(long, default_value = "out")]
    out_dir: String,
    #[arg(long = "no-draw", action = clap::ArgAction::SetFalse, default_value_t = true)]
    draw: bool,
    /// Write 1 instead of the deviation for every error sample
    #[arg(long, action = clap::ArgAction::SetTrue)]
    flag_errors: bool,
    /// Write compare_passed.log / compare_failed.log into --out-dir
    #[arg(long, action = clap::ArgAction::SetTrue)]
    comparison_flag: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[arg(short, long, action = clap::ArgAction::SetTrue, conflicts_with = "verbose")]
    quiet: bool,
}

fn validate_inputs(args: &Args) -> Result<()> {
    if !args.reference.is_file() {
        return Err(anyhow!("reference file not found: {}", args.reference.display()));
    }
    if let Some(test) = &args.test {
        if !test.is_file() {
            return Err(anyhow!("test file not found: {}", test.display()));
        }
    }
    if !args.tolerance.is_finite() || args.tolerance < 0.0 {
        return Err(anyhow!("tolerance must be finite and ≥ 0 (got {})", args.tolerance));
    }
    if let Some(ty) = args.tolerance_y {
        if !ty.is_finite() || ty < 0.0 {
            return Err(anyhow!("tolerance-y must be finite and ≥ 0 (got {})", ty));
        }
    }
    if args.out_dir.trim().is_empty() {
        return Err(anyhow!("out-dir must not be empty"));
    }
    Ok(())
}

fn init_tracing(args: &Args) {
    let level = if args.quiet {
        "warn"
    } else if args.verbose > 0 {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tubecompare={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn options_from_args(args: &Args) -> CompareOptions {
    CompareOptions {
        value: args.tolerance,
        value_y: args.tolerance_y,
        axis: args.axis,
        relativity: args.relativity,
        algorithm: args.algorithm,
        nominal: args.nominal,
        base_policy: if args.legacy_base { BasePolicy::Legacy } else { BasePolicy::Standard },
        base_x: args.base_x,
        base_y: args.base_y,
        ratio: args.ratio,
    }
}

/// Exit status for bad input, unreadable files or invalid options
const USAGE_FAILURE: u8 = 3;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(USAGE_FAILURE)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    validate_inputs(args)?;

    let options = match &args.config {
        Some(path) => CompareOptions::load(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => options_from_args(args),
    };
    options.validate()?;
    let read = ReadOptions { delimiter: args.delimiter, decimal_separator: args.separator };

    let reference = ResultSet::read(&args.reference, &read)
        .with_context(|| format!("reading {}", args.reference.display()))?;
    let test = match &args.test {
        Some(path) => Some(ResultSet::read(path, &read).with_context(|| format!("reading {}", path.display()))?),
        None => None,
    };

    let batch = compare_sets(&reference, test.as_ref(), &options, args.result.as_deref())?;

    create_dir_all(&args.out_dir)?;
    let display = if args.flag_errors { ErrorDisplay::Flag } else { ErrorDisplay::Magnitude };
    for report in &batch.reports {
        write_tube_csv(&args.out_dir, report, display)?;
        if args.draw {
            let png = Path::new(&args.out_dir).join(format!("{}.png", file_stem(&report.result_name)));
            if let Err(e) = plot_tube(report, &png) {
                warn!(variable = %report.result_name, "chart not written: {e:#}");
            }
        }
    }
    write_summary_json(&args.out_dir, &batch)?;
    if args.comparison_flag {
        let source = args.test.as_ref().unwrap_or(&args.reference);
        write_comparison_flag(&args.out_dir, &batch, &source.display().to_string(), options.value)?;
    }

    let outcome = batch.outcome();
    info!(
        valid = batch.valid(),
        invalid = batch.invalid(),
        undefined = batch.undefined(),
        success_rate = batch.success_rate().unwrap_or(0.0),
        ?outcome,
        "comparison finished"
    );
    Ok(ExitCode::from(outcome.exit_code()))
}
