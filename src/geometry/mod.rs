//! Point sets and rigid transforms shared by every other module.

pub mod point_set;
pub mod transform;

pub use point_set::PointSet;
pub use transform::{RigidTransform, CSV_DECIMALS};
