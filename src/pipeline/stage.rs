use crate::algorithms::{closed_form_alignment, GlobalAligner, IcpParams, IcpRefiner};
use crate::error::FitError;
use crate::geometry::{PointSet, RigidTransform};
use crate::pipeline::RegistrationStrategy;
use crate::validation::TransformValidator;
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// Stage 1: closed-form alignment on index order, refined without a distance bound.
pub struct ClosedFormIcpStage {
    refiner: IcpRefiner,
}

impl ClosedFormIcpStage {
    pub fn new(params: IcpParams) -> Self {
        Self {
            refiner: IcpRefiner::new(params.without_correspondence_limit()),
        }
    }
}

impl RegistrationStrategy for ClosedFormIcpStage {
    fn name(&self) -> &str {
        "closed-form+ICP"
    }

    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform> {
        let initial = closed_form_alignment(source, target)?;
        let outcome = self.refiner.refine(source, target, &initial)?;
        debug!(
            iterations = outcome.iterations,
            mean_error = outcome.mean_error,
            "Closed-form stage refined"
        );
        Ok(outcome.transform)
    }
}

/// Stage 2: global alignment estimate, refined with a bounded correspondence distance.
pub struct GlobalIcpStage {
    aligner: Arc<dyn GlobalAligner>,
    refiner: IcpRefiner,
    name: String,
}

impl GlobalIcpStage {
    pub fn new(aligner: Arc<dyn GlobalAligner>, params: IcpParams) -> Self {
        let name = format!("{}+ICP", aligner.name());
        Self {
            aligner,
            refiner: IcpRefiner::new(params),
            name,
        }
    }
}

impl RegistrationStrategy for GlobalIcpStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform> {
        let initial = self.aligner.estimate(source, target)?;
        TransformValidator::new().validate(&initial).map_err(|e| {
            FitError::registration(format!(
                "{} produced an invalid initial transform: {}",
                self.aligner.name(),
                e
            ))
        })?;
        let outcome = self.refiner.refine(source, target, &initial)?;
        debug!(
            aligner = self.aligner.name(),
            iterations = outcome.iterations,
            mean_error = outcome.mean_error,
            "Global stage refined"
        );
        Ok(outcome.transform)
    }
}

/// Stage 3: plain ICP from the identity, with a bounded correspondence distance.
pub struct IcpOnlyStage {
    refiner: IcpRefiner,
}

impl IcpOnlyStage {
    pub fn new(params: IcpParams) -> Self {
        Self {
            refiner: IcpRefiner::new(params),
        }
    }
}

impl RegistrationStrategy for IcpOnlyStage {
    fn name(&self) -> &str {
        "ICP"
    }

    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform> {
        let outcome = self
            .refiner
            .refine(source, target, &RigidTransform::identity())?;
        Ok(outcome.transform)
    }
}
