use crate::augmentation::{AugmentedPointSet, PointSetAugmentation};
use crate::geometry::{PointSet, RigidTransform};
use crate::Result;
use nalgebra::Vector3;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Rotation about the set's own centroid, so its position is unchanged.
pub struct RotateAboutCentroid {
    axis: Vector3<f64>,
    degrees: f64,
}

impl RotateAboutCentroid {
    pub fn new(axis: Vector3<f64>, degrees: f64) -> Self {
        Self { axis, degrees }
    }

    pub fn about_x(degrees: f64) -> Self {
        Self::new(Vector3::x(), degrees)
    }

    pub fn about_y(degrees: f64) -> Self {
        Self::new(Vector3::y(), degrees)
    }

    pub fn about_z(degrees: f64) -> Self {
        Self::new(Vector3::z(), degrees)
    }

    fn transform_for(&self, points: &PointSet) -> RigidTransform {
        let rotation = RigidTransform::from_axis_angle(&self.axis, self.degrees.to_radians()).rotation();
        let centroid = points.centroid().coords;
        RigidTransform::from_parts(rotation, centroid - rotation * centroid)
    }
}

impl PointSetAugmentation for RotateAboutCentroid {
    fn apply(&self, points: &PointSet) -> Result<AugmentedPointSet> {
        let transform = self.transform_for(points);
        Ok(AugmentedPointSet {
            points: transform.apply(points),
            ground_truth: Some(transform),
            description: self.description(),
        })
    }

    fn description(&self) -> String {
        format!(
            "Rotate {:.1}° about [{:.2}, {:.2}, {:.2}]",
            self.degrees, self.axis.x, self.axis.y, self.axis.z
        )
    }

    fn get_params(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("degrees".to_string(), json!(self.degrees));
        params.insert("axis".to_string(), json!([self.axis.x, self.axis.y, self.axis.z]));
        params
    }
}

/// Translation by `distance` along a direction (normalized internally).
pub struct Translate {
    direction: Vector3<f64>,
    distance: f64,
}

impl Translate {
    pub fn new(direction: Vector3<f64>, distance: f64) -> Self {
        let norm = direction.norm();
        let direction = if norm > 0.0 { direction / norm } else { Vector3::zeros() };
        Self { direction, distance }
    }

    pub fn offset(&self) -> Vector3<f64> {
        self.direction * self.distance
    }
}

impl PointSetAugmentation for Translate {
    fn apply(&self, points: &PointSet) -> Result<AugmentedPointSet> {
        let transform = RigidTransform::from_translation(self.offset());
        Ok(AugmentedPointSet {
            points: transform.apply(points),
            ground_truth: Some(transform),
            description: self.description(),
        })
    }

    fn description(&self) -> String {
        let t = self.offset();
        format!("Translate by [{:.2}, {:.2}, {:.2}]", t.x, t.y, t.z)
    }

    fn get_params(&self) -> HashMap<String, Value> {
        let t = self.offset();
        let mut params = HashMap::new();
        params.insert("distance".to_string(), json!(self.distance));
        params.insert("offset".to_string(), json!([t.x, t.y, t.z]));
        params
    }
}
