//! Correspondence-free global alignment used to seed the second cascade stage.

use crate::error::FitError;
use crate::geometry::{PointSet, RigidTransform};
use crate::spatial::{KdTreeIndex, SpatialIndex};
use crate::validation::TransformValidator;
use crate::Result;
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use tracing::debug;

/// Produces a coarse source-to-target transform without known correspondences.
pub trait GlobalAligner: Send + Sync {
    fn name(&self) -> &str;

    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform>;
}

/// Aligns the principal axes of the two sets.
///
/// The axes of each covariance matrix are matched by decreasing variance.
/// Axis signs are ambiguous, so the four sign choices that keep a proper
/// rotation are scored by mean nearest-neighbour residual over a strided
/// subsample of the source, and the best one wins.
#[derive(Debug, Clone)]
pub struct PrincipalAxesAligner {
    sample_size: usize,
}

impl Default for PrincipalAxesAligner {
    fn default() -> Self {
        Self { sample_size: 1000 }
    }
}

impl PrincipalAxesAligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    fn principal_axes(points: &PointSet) -> Result<Matrix3<f64>> {
        let centroid = points.centroid().coords;
        let mut covariance = Matrix3::zeros();
        for p in points.iter() {
            let d = p.coords - centroid;
            covariance += d * d.transpose();
        }
        covariance /= points.len() as f64;

        let eigen = SymmetricEigen::new(covariance);
        if eigen.eigenvalues.iter().any(|v| !v.is_finite())
            || eigen.eigenvectors.iter().any(|v| !v.is_finite())
        {
            return Err(FitError::registration(
                "principal axes decomposition produced non-finite values",
            ));
        }

        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut axes = Matrix3::zeros();
        for (col, &src) in order.iter().enumerate() {
            axes.set_column(col, &eigen.eigenvectors.column(src));
        }
        Ok(axes)
    }

    fn candidates(source_axes: &Matrix3<f64>, target_axes: &Matrix3<f64>) -> Vec<Matrix3<f64>> {
        let orientation = (target_axes.determinant() * source_axes.determinant()).signum();
        let mut rotations = Vec::with_capacity(4);
        for sx in [1.0, -1.0] {
            for sy in [1.0, -1.0] {
                let sz = orientation * sx * sy;
                let flips = Matrix3::from_diagonal(&Vector3::new(sx, sy, sz));
                rotations.push(target_axes * flips * source_axes.transpose());
            }
        }
        rotations
    }
}

impl GlobalAligner for PrincipalAxesAligner {
    fn name(&self) -> &str {
        "principal-axes"
    }

    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform> {
        if source.is_empty() || target.is_empty() {
            return Err(FitError::registration(
                "global alignment needs non-empty point sets",
            ));
        }

        let source_axes = Self::principal_axes(source)?;
        let target_axes = Self::principal_axes(target)?;
        let source_centroid = source.centroid().coords;
        let target_centroid = target.centroid().coords;

        let index = KdTreeIndex::build(target);
        let step = (source.len() / self.sample_size).max(1);
        let sample = source.strided(step);
        let validator = TransformValidator::new();

        let mut best: Option<(RigidTransform, f64)> = None;
        for rotation in Self::candidates(&source_axes, &target_axes) {
            let transform =
                RigidTransform::from_parts(rotation, target_centroid - rotation * source_centroid);
            if validator.validate(&transform).is_err() {
                continue;
            }

            let distances = index.nearest_all(&transform.apply(&sample));
            let score = distances.iter().map(|n| n.distance).sum::<f64>() / distances.len() as f64;
            debug!(score, "Principal axes hypothesis scored");

            if best.as_ref().map_or(true, |(_, s)| score < *s) {
                best = Some((transform, score));
            }
        }

        best.map(|(transform, _)| transform).ok_or_else(|| {
            FitError::registration("no valid principal axes hypothesis")
        })
    }
}
