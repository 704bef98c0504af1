use crate::algorithms::{GlobalAligner, PrincipalAxesAligner};
use crate::config::{Config, RegistrationConfig};
use crate::pipeline::{
    ClosedFormIcpStage, FallbackCascade, GlobalIcpStage, IcpOnlyStage, RegistrationStrategy,
};
use crate::validation::{PointSetValidator, ValidationConfig};
use std::sync::Arc;

/// Builder for [`FallbackCascade`].
pub struct CascadeBuilder {
    config: RegistrationConfig,
    validation: ValidationConfig,
    aligner: Arc<dyn GlobalAligner>,
    stages: Vec<Box<dyn RegistrationStrategy>>,
}

impl CascadeBuilder {
    pub fn new(config: RegistrationConfig) -> Self {
        Self {
            config,
            validation: ValidationConfig::default(),
            aligner: Arc::new(PrincipalAxesAligner::default()),
            stages: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.registration.clone())
            .with_validation(config.validation.clone())
            .with_global_aligner(Arc::new(
                PrincipalAxesAligner::new().with_sample_size(config.global.sample_size),
            ))
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Aligner used by the global stage added through [`with_default_stages`](Self::with_default_stages).
    pub fn with_global_aligner(mut self, aligner: Arc<dyn GlobalAligner>) -> Self {
        self.aligner = aligner;
        self
    }

    /// Append the closed-form, global and identity-start ICP stages in that order.
    pub fn with_default_stages(mut self) -> Self {
        let params = self.config.icp_params();
        self.stages
            .push(Box::new(ClosedFormIcpStage::new(params.clone())));
        self.stages.push(Box::new(GlobalIcpStage::new(
            Arc::clone(&self.aligner),
            params.clone(),
        )));
        self.stages.push(Box::new(IcpOnlyStage::new(params)));
        self
    }

    pub fn add_stage<S>(mut self, stage: S) -> Self
    where
        S: RegistrationStrategy + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn build(self) -> FallbackCascade {
        FallbackCascade {
            stages: self.stages,
            config: self.config,
            validator: PointSetValidator::new(self.validation),
        }
    }
}
