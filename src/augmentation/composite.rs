use crate::augmentation::{
    AugmentedPointSet, GaussianNoise, Outliers, PointSetAugmentation, RotateAboutCentroid,
    Subsample, Translate,
};
use crate::geometry::PointSet;
use crate::Result;
use nalgebra::Vector3;
use serde_json::Value;
use std::collections::HashMap;

/// Applies augmentations in sequence, composing their ground truths.
///
/// The composite keeps a ground truth only while every step has one.
pub struct CompositeAugmentation {
    steps: Vec<Box<dyn PointSetAugmentation>>,
}

impl CompositeAugmentation {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn then<A: PointSetAugmentation + 'static>(mut self, step: A) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for CompositeAugmentation {
    fn default() -> Self {
        Self::new()
    }
}

impl PointSetAugmentation for CompositeAugmentation {
    fn apply(&self, points: &PointSet) -> Result<AugmentedPointSet> {
        let mut current = points.clone();
        let mut ground_truth = Some(crate::geometry::RigidTransform::identity());

        for step in &self.steps {
            let augmented = step.apply(&current)?;
            ground_truth = match (ground_truth, augmented.ground_truth) {
                (Some(total), Some(step_truth)) => Some(step_truth.compose(&total)),
                _ => None,
            };
            current = augmented.points;
        }

        Ok(AugmentedPointSet {
            points: current,
            ground_truth,
            description: self.description(),
        })
    }

    fn description(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.description())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn get_params(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        for (i, step) in self.steps.iter().enumerate() {
            params.insert(format!("step_{}", i), serde_json::to_value(step.get_params()).unwrap_or(Value::Null));
        }
        params
    }
}

/// Named variants written by `fit generate`.
///
/// Rotations about each axis, translations along each axis and the diagonal,
/// increasing noise, subsampling and outlier contamination. Random steps are
/// seeded from `seed` so a run is reproducible.
pub fn standard_variants(seed: u64) -> Vec<(String, Box<dyn PointSetAugmentation>)> {
    let mut variants: Vec<(String, Box<dyn PointSetAugmentation>)> = Vec::new();

    for (axis_name, axis) in [("x", Vector3::x()), ("y", Vector3::y()), ("z", Vector3::z())] {
        for degrees in [5.0, 15.0, 30.0, 45.0, 90.0] {
            variants.push((
                format!("rot_{}_{}deg", axis_name, degrees as u32),
                Box::new(RotateAboutCentroid::new(axis, degrees)),
            ));
        }
    }

    let directions = [
        ("x", Vector3::x()),
        ("y", Vector3::y()),
        ("z", Vector3::z()),
        ("xyz", Vector3::new(1.0, 1.0, 1.0)),
    ];
    for (dir_name, direction) in directions {
        for distance in [10.0, 50.0, 100.0, 200.0] {
            variants.push((
                format!("trans_{}_{}", dir_name, distance as u32),
                Box::new(Translate::new(direction, distance)),
            ));
        }
    }

    for (i, std_dev) in [0.001, 0.01, 0.05, 0.1, 0.5].into_iter().enumerate() {
        variants.push((
            format!("noise_{}", std_dev),
            Box::new(GaussianNoise::new(std_dev).with_seed(seed.wrapping_add(i as u64))),
        ));
    }

    for (i, ratio) in [0.1, 0.25, 0.5, 0.75, 0.9].into_iter().enumerate() {
        variants.push((
            format!("subsample_{}pct", (ratio * 100.0) as u32),
            Box::new(Subsample::new(ratio).with_seed(seed.wrapping_add(100 + i as u64))),
        ));
    }

    for (i, ratio) in [0.01, 0.05, 0.1].into_iter().enumerate() {
        variants.push((
            format!("outliers_{}pct", (ratio * 100.0) as u32),
            Box::new(Outliers::new(ratio).with_seed(seed.wrapping_add(200 + i as u64))),
        ));
    }

    variants.push((
        "rot_z_30deg_trans_xyz_50_noise_0.01".to_string(),
        Box::new(
            CompositeAugmentation::new()
                .then(RotateAboutCentroid::about_z(30.0))
                .then(Translate::new(Vector3::new(1.0, 1.0, 1.0), 50.0))
                .then(GaussianNoise::new(0.01).with_seed(seed.wrapping_add(300))),
        ),
    ));

    variants
}
