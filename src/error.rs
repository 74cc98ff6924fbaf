//! Error types shared by the core algorithms and the `iris` binary.
//!
//! Every failure carries enough context (guess triple, feature index and
//! position) for the calling layer to report it without re-deriving state.

use thiserror::Error;

use crate::fit::CurveFitError;

#[derive(Debug, Error)]
pub enum IrisError {
    /// Center refinement could not produce a center.
    #[error("center refinement from guess ({x:.2}, {y:.2}, r={radius:.2}) failed: {reason}")]
    Optimization {
        x: f64,
        y: f64,
        radius: f64,
        reason: String,
    },

    /// A feature window does not fit inside the curve.
    #[error(
        "feature {index} at x={x} needs samples {start}..={end}, but the curve has {len} samples"
    )]
    Bounds {
        index: usize,
        x: f64,
        start: i64,
        end: i64,
        len: usize,
    },

    /// The pseudo-Voigt fit of one feature window failed.
    #[error("pseudo-Voigt fit for feature {index} at x={x} did not converge")]
    FitConvergence {
        index: usize,
        x: f64,
        #[source]
        source: CurveFitError,
    },

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to serialize JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl IrisError {
    /// Process exit code used by the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            IrisError::InvalidArgument(_) => 2,
            IrisError::DegenerateInput(_) => 3,
            IrisError::Optimization { .. } => 4,
            IrisError::Bounds { .. } => 5,
            IrisError::FitConvergence { .. } => 6,
            IrisError::Json(_) => 7,
        }
    }
}

pub type Result<T> = std::result::Result<T, IrisError>;
