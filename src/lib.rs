#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(missing_docs)]
//! Library entry for tubecompare.
//!
//! This crate validates simulation results against a trusted reference by
//! building a tolerance tube around the reference curve and checking that
//! every sample of the test curve stays inside it.
//!
//! # Modules
//! - [`curve`]: Curve representation
//! - [`tube_size`]: Half-width / half-height from relative or absolute tolerances
//! - [`algorithms`]: Rectangle and Ellipse envelope construction
//! - [`calibrate`]: Interpolation onto a common time grid
//! - [`validate`]: In/out-of-tube comparison and delta error
//! - [`compare`]: Per-variable pipeline and parallel batches
//! - [`dataset`]: Delimited result files in, tube files and summaries out
//! - [`plot`]: Visualization (optional in binaries)

/// Curve representation shared by every stage
pub mod curve;

/// Tube size: bases, ratio and half dimensions
pub mod tube_size;

/// Envelope algorithms
pub mod algorithms;

/// Curve-to-grid interpolation
pub mod calibrate;

/// Point-wise comparison against the tube
pub mod validate;

/// Reports and batch aggregation
pub mod report;

/// Pipeline orchestration
pub mod compare;

/// Tolerance and input configuration
pub mod config;

/// Result file reading and report writing
pub mod dataset;

/// Error taxonomy
pub mod error;

/// Visualization utilities for generating charts
pub mod plot;

pub use algorithms::{Algorithm, Envelope};
pub use compare::{compare_curves, compare_sets};
pub use config::{CompareOptions, ReadOptions};
pub use curve::Curve;
pub use error::{Result, TubeError};
pub use report::{BatchOutcome, BatchReport, ErrorStep, TubeReport, Validity};
pub use tube_size::{Axis, BasePolicy, Relativity, TubeSize};
