use crate::error::ValidationError;
use crate::geometry::PointSet;
use crate::validation::TransformValidator;
use crate::Result;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Decimal places used by the textual matrix format.
pub const CSV_DECIMALS: usize = 50;

/// A homogeneous 4x4 rigid transform `[R t; 0 1]`.
///
/// Construction is unchecked; use [`TransformValidator`] before trusting a
/// transform that came from a solver or from outside the process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    matrix: Matrix4<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Self { matrix }
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_parts(Matrix3::identity(), translation)
    }

    pub fn from_rotation(rotation: Matrix3<f64>) -> Self {
        Self::from_parts(rotation, Vector3::zeros())
    }

    /// Rotation by `angle` radians about `axis` (normalized internally), with no translation.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let axis = nalgebra::Unit::new_normalize(*axis);
        let rotation = nalgebra::Rotation3::from_axis_angle(&axis, angle);
        Self::from_rotation(*rotation.matrix())
    }

    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Build from row-major values without any rigidity checks.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        let mut matrix = Matrix4::zeros();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                matrix[(r, c)] = *value;
            }
        }
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }

    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation() * point.coords + self.translation())
    }

    pub fn apply(&self, points: &PointSet) -> PointSet {
        let rotation = self.rotation();
        let translation = self.translation();
        points
            .iter()
            .map(|p| Point3::from(rotation * p.coords + translation))
            .collect()
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &RigidTransform) -> RigidTransform {
        let rotation = self.rotation() * other.rotation();
        let translation = self.rotation() * other.translation() + self.translation();
        Self::from_parts(rotation, translation)
    }

    /// Closed-form rigid inverse `[Rᵀ, -Rᵀt]`.
    pub fn inverse(&self) -> RigidTransform {
        let rotation_t = self.rotation().transpose();
        Self::from_parts(rotation_t, -(rotation_t * self.translation()))
    }

    /// Rows of comma-separated values with fixed precision, joined by newlines.
    pub fn to_csv_string(&self) -> String {
        self.to_rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| format!("{:.*}", CSV_DECIMALS, v))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the [`to_csv_string`](Self::to_csv_string) layout and validate the result.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ValidationError::Malformed {
                    name: "transform".to_string(),
                    reason: format!("line {}: {}", line_no + 1, e),
                })?;
            rows.push(row);
        }
        TransformValidator::new().validate_rows(&rows)
    }
}

impl fmt::Display for RigidTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.to_rows() {
            writeln!(
                f,
                "{:12.8} {:12.8} {:12.8} {:12.8}",
                row[0], row[1], row[2], row[3]
            )?;
        }
        Ok(())
    }
}

impl Serialize for RigidTransform {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RigidTransform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
        if rows.len() != 4 || rows.iter().any(|r| r.len() != 4) {
            return Err(de::Error::custom("transform must be a 4x4 array"));
        }
        let mut fixed = [[0.0; 4]; 4];
        for (r, row) in rows.iter().enumerate() {
            fixed[r].copy_from_slice(row);
        }
        Ok(Self::from_rows(fixed))
    }
}
