use crate::geometry::RigidTransform;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered collection of 3-D points.
///
/// Order is meaningful: the closed-form solver pairs points by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<Point3<f64>>,
}

impl PointSet {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    pub fn from_rows(rows: &[[f64; 3]]) -> Self {
        Self {
            points: rows.iter().map(|r| Point3::new(r[0], r[1], r[2])).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    pub fn to_rows(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Arithmetic mean of all points, or the origin for an empty set.
    pub fn centroid(&self) -> Point3<f64> {
        if self.points.is_empty() {
            return Point3::origin();
        }
        let sum: Vector3<f64> = self.points.iter().map(|p| p.coords).sum();
        Point3::from(sum / self.points.len() as f64)
    }

    /// The first `n` points (or all of them when `n >= len`).
    pub fn truncated(&self, n: usize) -> Self {
        Self {
            points: self.points.iter().take(n).copied().collect(),
        }
    }

    /// Every `step`-th point, starting with the first.
    pub fn strided(&self, step: usize) -> Self {
        Self {
            points: self.points.iter().step_by(step.max(1)).copied().collect(),
        }
    }

    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        transform.apply(self)
    }
}

impl From<Vec<Point3<f64>>> for PointSet {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point3<f64>> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point3<f64>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Serialize for PointSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PointSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<[f64; 3]>::deserialize(deserializer)?;
        Ok(Self::from_rows(&rows))
    }
}
