//! Closed-form rigid alignment of index-paired point sequences (Kabsch).

use crate::error::FitError;
use crate::geometry::{PointSet, RigidTransform};
use crate::validation::TransformValidator;
use crate::Result;
use nalgebra::{Matrix3, Point3, Vector3};
use tracing::debug;

/// Least-squares rigid transform mapping `source[i]` onto `target[i]`.
///
/// Pairing is purely by index. A reflection in the SVD solution is repaired
/// by negating the last row of `Vᵀ`. The result is checked with
/// [`TransformValidator`] and a solution that fails the check is reported as
/// a registration error.
///
/// # Errors
///
/// Returns [`FitError::Registration`] if the sequences are empty, differ in
/// length, the decomposition fails, or the solution is not a proper rotation.
pub fn solve_rigid_alignment(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Result<RigidTransform> {
    if source.is_empty() || target.is_empty() {
        return Err(FitError::registration("cannot align empty point sequences"));
    }
    if source.len() != target.len() {
        return Err(FitError::registration(format!(
            "paired point sequences must have equal length: {} vs {}",
            source.len(),
            target.len()
        )));
    }

    let source_centroid = mean(source);
    let target_centroid = mean(target);

    let mut h = Matrix3::zeros();
    for (a, b) in source.iter().zip(target) {
        h += (a.coords - source_centroid) * (b.coords - target_centroid).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| FitError::registration("SVD did not produce U"))?;
    let mut v_t = svd
        .v_t
        .ok_or_else(|| FitError::registration("SVD did not produce Vᵀ"))?;

    let mut rotation = v_t.transpose() * u.transpose();
    if rotation.determinant() < 0.0 {
        for j in 0..3 {
            v_t[(2, j)] = -v_t[(2, j)];
        }
        rotation = v_t.transpose() * u.transpose();
        debug!("Reflection corrected in closed-form solution");
    }

    let translation = target_centroid - rotation * source_centroid;
    let transform = RigidTransform::from_parts(rotation, translation);

    TransformValidator::new()
        .validate(&transform)
        .map_err(|e| FitError::registration(format!("closed-form solution rejected: {}", e)))?;

    Ok(transform)
}

/// Initial estimate used by the first cascade stage.
///
/// Both sets must already be truncated to the same length. Points are paired
/// in raw index order, so the estimate is only meaningful when that order
/// reflects true correspondence.
pub fn closed_form_alignment(source: &PointSet, target: &PointSet) -> Result<RigidTransform> {
    solve_rigid_alignment(source.points(), target.points())
}

fn mean(points: &[Point3<f64>]) -> Vector3<f64> {
    points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / points.len() as f64
}
