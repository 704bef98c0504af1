use crate::geometry::{PointSet, RigidTransform};
use crate::Result;

/// One strategy in the fallback cascade.
pub trait RegistrationStrategy: Send + Sync {
    /// Name used in logs and in `FitResult::method`
    fn name(&self) -> &str;

    /// Produce a candidate source-to-target transform.
    ///
    /// Both sets are validated and share the same length. Convergence and
    /// registration errors hand control to the next stage; validation errors
    /// abort the whole request.
    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform>;
}
