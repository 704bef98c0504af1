#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod algorithms;
pub mod analysis;
pub mod api;
pub mod augmentation;
pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod spatial;
pub mod validation;

pub use algorithms::{GlobalAligner, IcpOutcome, IcpParams, IcpRefiner, PrincipalAxesAligner};
pub use analysis::{compute_metrics, Metrics};
pub use config::{Config, RegistrationConfig};
pub use error::{FitError, ValidationError};
pub use geometry::{PointSet, RigidTransform};
pub use pipeline::{Direction, FallbackCascade, FitResult};
pub use validation::{PointSetValidator, TransformValidator, ValidationConfig};

pub type Result<T> = std::result::Result<T, FitError>;

/// Register `source` onto `target` with the default three-stage cascade.
///
/// Inputs are validated and truncated to a common length before any stage
/// runs. The returned transform maps source coordinates into target
/// coordinates.
pub fn register(
    source: &PointSet,
    target: &PointSet,
    config: &RegistrationConfig,
) -> Result<FitResult> {
    FallbackCascade::new(config.clone()).register(source, target)
}
