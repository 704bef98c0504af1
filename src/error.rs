//! Error taxonomy for the registration engine.
//!
//! Validation problems are fatal for a request. Convergence and registration
//! failures raised inside a cascade stage are recoverable: the orchestrator
//! absorbs them and moves on to the next stage.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a point set or transform is structurally unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{name}: expected a 2-D array of numbers, got {found}")]
    Dimensionality { name: String, found: String },

    #[error("{name}: row {row} has {found} values, expected {expected}")]
    RaggedRows {
        name: String,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("{name}: malformed input: {reason}")]
    Malformed { name: String, reason: String },

    #[error("{name}: points must have 3 coordinates, got {found}")]
    ColumnCount { name: String, found: usize },

    #[error("{name}: Insufficient points: got {actual}, need at least {required}")]
    InsufficientPoints {
        name: String,
        actual: usize,
        required: usize,
    },

    #[error("{name}: too many points ({actual} > {max})")]
    TooManyPoints {
        name: String,
        actual: usize,
        max: usize,
    },

    #[error("{name}: contains NaN or infinite values")]
    NonFinite { name: String },

    #[error("{name}: all points are zero")]
    AllZero { name: String },

    #[error("transform must be 4x4, got {rows}x{cols}")]
    TransformShape { rows: usize, cols: usize },

    #[error("transform contains NaN or infinite values")]
    TransformNonFinite,

    #[error("transform bottom row must be [0, 0, 0, 1], got {row:?}")]
    BottomRow { row: [f64; 4] },

    #[error("rotation part is not orthogonal (max deviation {deviation:.3e})")]
    NotOrthogonal { deviation: f64 },

    #[error("rotation determinant must be 1, got {determinant}")]
    Determinant { determinant: f64 },
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("ICP did not converge after {iterations} iterations (mean error {mean_error:.6e})")]
    Convergence { iterations: usize, mean_error: f64 },

    #[error("registration failed: {0}")]
    Registration(String),

    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FitError {
    pub fn registration(reason: impl Into<String>) -> Self {
        Self::Registration(reason.into())
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether a cascade stage failing with this error may fall through to the next stage.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Convergence { .. } | Self::Registration(_))
    }

    pub fn is_convergence(&self) -> bool {
        matches!(self, Self::Convergence { .. })
    }
}
