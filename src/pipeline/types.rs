use crate::analysis::Metrics;
use crate::geometry::RigidTransform;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a cascade run registered the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Source onto target.
    Forward,
    /// Target onto source; the transform is inverted before it is reported.
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "Forward"),
            Direction::Reverse => write!(f, "Reverse"),
        }
    }
}

/// How a single stage attempt ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// RMSE at or below the threshold; the cascade stopped here.
    Accepted { rmse: f64 },
    /// Completed, but the RMSE exceeded the threshold.
    AboveThreshold { rmse: f64 },
    /// Raised a recoverable error.
    Failed { reason: String, convergence: bool },
}

/// Record of one stage run, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageAttempt {
    pub stage: String,
    pub direction: Direction,
    pub outcome: StageOutcome,
    pub duration_ms: f64,
}

/// Final answer of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Maps source coordinates into target coordinates.
    pub transformation: RigidTransform,
    pub inlier_rmse: f64,
    pub max_error: f64,
    pub rmse_threshold: f64,
    /// `inlier_rmse < rmse_threshold`.
    pub is_success: bool,
    /// Direction and stage that produced the transform, e.g. "Forward closed-form+ICP".
    pub method: String,
    pub direction: Direction,
    #[serde(default)]
    pub attempts: Vec<StageAttempt>,
}

impl FitResult {
    pub fn new(
        transformation: RigidTransform,
        metrics: &Metrics,
        rmse_threshold: f64,
        stage: &str,
        direction: Direction,
    ) -> Self {
        Self {
            transformation,
            inlier_rmse: metrics.rmse,
            max_error: metrics.max_error,
            rmse_threshold,
            is_success: metrics.rmse < rmse_threshold,
            method: format!("{} {}", direction, stage),
            direction,
            attempts: Vec::new(),
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<StageAttempt>) -> Self {
        self.attempts = attempts;
        self
    }
}
