use crate::error::ValidationError;
use crate::geometry::RigidTransform;
use crate::Result;
use nalgebra::Matrix3;

/// Default tolerance for the orthogonality and determinant checks.
pub const RIGIDITY_TOLERANCE: f64 = 1e-6;

/// Checks that a 4x4 matrix is a proper rigid transform.
#[derive(Debug, Clone, Copy)]
pub struct TransformValidator {
    tolerance: f64,
}

impl Default for TransformValidator {
    fn default() -> Self {
        Self {
            tolerance: RIGIDITY_TOLERANCE,
        }
    }
}

impl TransformValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self, transform: &RigidTransform) -> Result<()> {
        let matrix = transform.matrix();
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::TransformNonFinite.into());
        }

        let bottom = [matrix[(3, 0)], matrix[(3, 1)], matrix[(3, 2)], matrix[(3, 3)]];
        if bottom != [0.0, 0.0, 0.0, 1.0] {
            return Err(ValidationError::BottomRow { row: bottom }.into());
        }

        let rotation = transform.rotation();
        let deviation = (rotation * rotation.transpose() - Matrix3::identity()).amax();
        if deviation > self.tolerance {
            return Err(ValidationError::NotOrthogonal { deviation }.into());
        }

        let determinant = rotation.determinant();
        if (determinant - 1.0).abs() > self.tolerance {
            return Err(ValidationError::Determinant { determinant }.into());
        }

        Ok(())
    }

    /// Shape-check untyped rows, then validate the resulting transform.
    pub fn validate_rows(&self, rows: &[Vec<f64>]) -> Result<RigidTransform> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.len() != 4 || rows.iter().any(|r| r.len() != 4) {
            return Err(ValidationError::TransformShape {
                rows: rows.len(),
                cols,
            }
            .into());
        }

        let mut fixed = [[0.0; 4]; 4];
        for (r, row) in rows.iter().enumerate() {
            fixed[r].copy_from_slice(row);
        }
        let transform = RigidTransform::from_rows(fixed);
        self.validate(&transform)?;
        Ok(transform)
    }
}
