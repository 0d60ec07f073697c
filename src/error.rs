//! Error taxonomy for tube construction and validation

use crate::report::ErrorStep;
use thiserror::Error;

/// Errors raised by the tube pipeline and its I/O collaborators
#[derive(Debug, Error)]
pub enum TubeError {
    /// Curve missing, empty or unimportable
    #[error("data import failed: {0}")]
    DataImport(String),

    /// Relative tolerance parameter outside [0, 1]
    #[error("relative value {value} is out of expected range [0,1]")]
    OutOfRange {
        /// Offending value
        value: f64,
    },

    /// Non-positive ratio or base
    #[error("tube size calculation failed (ratio={ratio}, base_x={base_x}, base_y={base_y})")]
    TubeSize {
        /// Ratio Y/X at the time of failure
        ratio: f64,
        /// Base in x direction
        base_x: f64,
        /// Base in y direction
        base_y: f64,
    },

    /// Degenerate reference curve or failed envelope construction
    #[error("tube calculation failed: {0}")]
    TubeCalculation(String),

    /// Missing boundaries or no overlap after calibration
    #[error("validation failed: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed delimited text
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Malformed JSON
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TubeError {
    /// Pipeline stage this error belongs to
    pub fn step(&self) -> ErrorStep {
        match self {
            TubeError::DataImport(_) | TubeError::Io(_) | TubeError::Csv(_) => ErrorStep::DataImport,
            TubeError::OutOfRange { .. } | TubeError::TubeSize { .. } => ErrorStep::TubeSize,
            TubeError::TubeCalculation(_) => ErrorStep::Tube,
            TubeError::Validation(_) => ErrorStep::Validation,
            TubeError::Config(_) | TubeError::Json(_) => ErrorStep::None,
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, TubeError>;
