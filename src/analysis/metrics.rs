use crate::error::ValidationError;
use crate::geometry::{PointSet, RigidTransform};
use crate::spatial::{KdTreeIndex, SpatialIndex};
use crate::validation::TransformValidator;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Nearest-neighbour error statistics of a transformed source against a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub max_error: f64,
    pub mean_error: f64,
    pub median_error: f64,
}

impl Metrics {
    /// Statistics over raw distances. Returns `None` for an empty slice.
    pub fn from_distances(distances: &[f64]) -> Option<Self> {
        if distances.is_empty() {
            return None;
        }
        let n = distances.len() as f64;
        let rmse = (distances.iter().map(|d| d * d).sum::<f64>() / n).sqrt();
        let mean_error = distances.iter().sum::<f64>() / n;
        let max_error = distances.iter().copied().fold(0.0, f64::max);

        let mut sorted = distances.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median_error = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            rmse,
            max_error,
            mean_error,
            median_error,
        })
    }
}

/// Score `transform` by moving `source` and querying each point's nearest
/// neighbour in `target`. Inputs are not modified.
pub fn compute_metrics(
    source: &PointSet,
    target: &PointSet,
    transform: &RigidTransform,
) -> Result<Metrics> {
    if target.is_empty() {
        return Err(ValidationError::InsufficientPoints {
            name: "target".to_string(),
            actual: 0,
            required: 1,
        }
        .into());
    }
    let index = KdTreeIndex::build(target);
    compute_metrics_with_index(source, &index, transform)
}

/// [`compute_metrics`] against a prebuilt index over the target.
pub fn compute_metrics_with_index(
    source: &PointSet,
    index: &dyn SpatialIndex,
    transform: &RigidTransform,
) -> Result<Metrics> {
    TransformValidator::new().validate(transform)?;

    let distances: Vec<f64> = index
        .nearest_all(&transform.apply(source))
        .into_iter()
        .map(|n| n.distance)
        .collect();

    Metrics::from_distances(&distances).ok_or_else(|| {
        ValidationError::InsufficientPoints {
            name: "source".to_string(),
            actual: 0,
            required: 1,
        }
        .into()
    })
}
