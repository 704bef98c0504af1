use crate::geometry::PointSet;
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Base implementation helpers for augmentations
#[derive(Clone)]
pub struct AugmentationBase {
    pub rng: StdRng,
}

impl Default for AugmentationBase {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl AugmentationBase {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn random_in_range(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    pub fn random_bool(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }
}

/// Axis-aligned bounds of a point set as (min, max) corners.
pub fn bounding_box(points: &PointSet) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = *points.points().first()?;
    let mut min = first;
    let mut max = first;
    for p in points.iter() {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    Some((min, max))
}
