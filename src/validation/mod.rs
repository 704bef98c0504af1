//! Input gatekeeping for point sets and transforms.

pub mod point_set;
pub mod transform;

use serde::{Deserialize, Serialize};

pub use point_set::{PointSetValidator, MIN_PAIR_POINTS};
pub use transform::{TransformValidator, RIGIDITY_TOLERANCE};

/// Size and content limits applied to every incoming point set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_points: usize,
    pub max_points: usize,
    pub check_finite: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_points: 100,
            max_points: 10_000_000,
            check_finite: true,
        }
    }
}
