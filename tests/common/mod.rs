#![allow(dead_code)]

use cascaded_fit::{PointSet, RigidTransform};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random points in `[0, 100)³`, reproducible from `seed`.
pub fn random_points(count: usize, seed: u64) -> PointSet {
    random_points_in(count, seed, 0.0, 100.0)
}

pub fn random_points_in(count: usize, seed: u64, min: f64, max: f64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Point3::new(
                rng.gen_range(min..max),
                rng.gen_range(min..max),
                rng.gen_range(min..max),
            )
        })
        .collect()
}

pub fn translation(x: f64, y: f64, z: f64) -> RigidTransform {
    RigidTransform::from_translation(Vector3::new(x, y, z))
}

pub fn rotation_z(degrees: f64) -> RigidTransform {
    RigidTransform::from_axis_angle(&Vector3::z(), degrees.to_radians())
}

/// Largest absolute element-wise difference between two transforms.
pub fn max_difference(a: &RigidTransform, b: &RigidTransform) -> f64 {
    (a.matrix() - b.matrix()).amax()
}
