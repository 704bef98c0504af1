//! Synthetic registration pairs for robustness testing.

pub mod base;
pub mod composite;
pub mod geometric;
pub mod noise;

use crate::geometry::{PointSet, RigidTransform};
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;

pub use base::*;
pub use composite::*;
pub use geometric::*;
pub use noise::*;

/// Output of an augmentation
#[derive(Debug, Clone)]
pub struct AugmentedPointSet {
    pub points: PointSet,
    /// Transform mapping the input onto the output, when one exists.
    pub ground_truth: Option<RigidTransform>,
    pub description: String,
}

/// Point set augmentation for building test pairs
pub trait PointSetAugmentation: Send + Sync {
    fn apply(&self, points: &PointSet) -> Result<AugmentedPointSet>;

    fn description(&self) -> String;

    fn get_params(&self) -> HashMap<String, Value>;
}
