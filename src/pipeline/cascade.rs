use crate::analysis::{compute_metrics_with_index, Metrics};
use crate::config::{Config, RegistrationConfig};
use crate::data::align_cloud_sizes;
use crate::error::FitError;
use crate::geometry::{PointSet, RigidTransform};
use crate::logging::{get_correlation_id, new_correlation_id, StageSpan};
use crate::pipeline::{
    CascadeBuilder, Direction, FitResult, RegistrationStrategy, StageAttempt, StageOutcome,
};
use crate::spatial::KdTreeIndex;
use crate::validation::{PointSetValidator, TransformValidator};
use crate::Result;
use instant::Instant;
use tracing::{info, warn, Level};

/// Stage label reported when every stage failed.
pub const IDENTITY_FALLBACK: &str = "identity fallback";

/// Ordered fallback cascade of registration strategies.
///
/// Stages run in order until one scores an RMSE at or below the threshold.
/// Recoverable stage errors move on to the next stage. If nothing is
/// accepted the identity transform is reported with `is_success = false`.
pub struct FallbackCascade {
    pub(crate) stages: Vec<Box<dyn RegistrationStrategy>>,
    pub(crate) config: RegistrationConfig,
    pub(crate) validator: PointSetValidator,
}

struct Candidate {
    transform: RigidTransform,
    metrics: Metrics,
    stage: String,
    direction: Direction,
}

struct DirectionRun {
    candidate: Candidate,
    attempts: Vec<StageAttempt>,
    /// Set when every stage failed with a non-convergence error.
    unrecoverable: Option<String>,
}

impl FallbackCascade {
    /// Default three-stage cascade with the principal-axes global aligner.
    pub fn new(config: RegistrationConfig) -> Self {
        CascadeBuilder::new(config).with_default_stages().build()
    }

    /// Cascade configured from every relevant section of a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        CascadeBuilder::from_config(config).with_default_stages().build()
    }

    pub fn builder(config: RegistrationConfig) -> CascadeBuilder {
        CascadeBuilder::new(config)
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Register `source` onto `target`.
    ///
    /// # Errors
    ///
    /// - [`FitError::Validation`] when either set fails validation.
    /// - [`FitError::Registration`] when every stage in every direction
    ///   failed with a non-convergence error.
    pub fn register(&self, source: &PointSet, target: &PointSet) -> Result<FitResult> {
        let correlation_id = get_correlation_id().unwrap_or_else(new_correlation_id);
        let span = crate::correlation_span!(
            Level::INFO,
            "registration",
            source_points = source.len(),
            target_points = target.len()
        );
        let _guard = span.enter();

        self.validator.validate_pair(source, target)?;
        let (source, target) = align_cloud_sizes(source, target);
        let forward_index = KdTreeIndex::build(&target);

        info!(
            points = source.len(),
            stages = self.stages.len(),
            bidirectional = self.config.enable_bidirectional,
            correlation_id = %correlation_id,
            "Starting registration"
        );

        let forward = self.run_direction(&source, &target, Direction::Forward)?;
        let mut attempts = forward.attempts;
        let mut best = forward.candidate;
        let mut unrecoverable = forward.unrecoverable;

        if self.config.enable_bidirectional {
            match self.run_direction(&target, &source, Direction::Reverse) {
                Ok(reverse) => {
                    attempts.extend(reverse.attempts);
                    if reverse.unrecoverable.is_none() {
                        unrecoverable = None;
                    }

                    let inverted = reverse.candidate.transform.inverse();
                    let metrics = compute_metrics_with_index(&source, &forward_index, &inverted)?;
                    info!(
                        forward_rmse = best.metrics.rmse,
                        reverse_rmse = metrics.rmse,
                        "Comparing forward and reverse results"
                    );
                    if metrics.rmse < best.metrics.rmse {
                        best = Candidate {
                            transform: inverted,
                            metrics,
                            stage: reverse.candidate.stage,
                            direction: Direction::Reverse,
                        };
                    }
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Reverse registration failed; keeping forward result");
                }
            }
        }

        if let Some(reason) = unrecoverable {
            return Err(FitError::registration(format!(
                "all registration stages failed: {}",
                reason
            )));
        }

        let result = FitResult::new(
            best.transform,
            &best.metrics,
            self.config.rmse_threshold,
            &best.stage,
            best.direction,
        )
        .with_attempts(attempts);

        info!(
            method = %result.method,
            rmse = result.inlier_rmse,
            max_error = result.max_error,
            success = result.is_success,
            "Registration finished"
        );
        Ok(result)
    }

    fn run_direction(
        &self,
        source: &PointSet,
        target: &PointSet,
        direction: Direction,
    ) -> Result<DirectionRun> {
        let index = KdTreeIndex::build(target);
        let validator = TransformValidator::new();
        let threshold = self.config.rmse_threshold;

        let mut attempts = Vec::with_capacity(self.stages.len());
        let mut every_stage_errored = true;
        let mut last_error = None;

        for stage in &self.stages {
            let stage_span = StageSpan::new(stage.name(), direction, get_correlation_id());
            let _guard = stage_span.enter();
            let start = Instant::now();

            let scored = stage.estimate(source, target).and_then(|transform| {
                validator.validate(&transform).map_err(|e| {
                    FitError::registration(format!("{} produced an invalid transform: {}", stage.name(), e))
                })?;
                let metrics = compute_metrics_with_index(source, &index, &transform)?;
                Ok((transform, metrics))
            });
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

            let outcome = match scored {
                Ok((transform, metrics)) if metrics.rmse <= threshold => {
                    let outcome = StageOutcome::Accepted { rmse: metrics.rmse };
                    stage_span.record_outcome(&outcome);
                    attempts.push(StageAttempt {
                        stage: stage.name().to_string(),
                        direction,
                        outcome,
                        duration_ms,
                    });
                    return Ok(DirectionRun {
                        candidate: Candidate {
                            transform,
                            metrics,
                            stage: stage.name().to_string(),
                            direction,
                        },
                        attempts,
                        unrecoverable: None,
                    });
                }
                Ok((_, metrics)) => {
                    every_stage_errored = false;
                    StageOutcome::AboveThreshold { rmse: metrics.rmse }
                }
                Err(e) if e.is_recoverable() => {
                    if e.is_convergence() {
                        every_stage_errored = false;
                    }
                    let reason = e.to_string();
                    last_error = Some(format!("{}: {}", stage.name(), reason));
                    StageOutcome::Failed {
                        reason,
                        convergence: e.is_convergence(),
                    }
                }
                Err(e) => return Err(e),
            };

            stage_span.record_outcome(&outcome);
            attempts.push(StageAttempt {
                stage: stage.name().to_string(),
                direction,
                outcome,
                duration_ms,
            });
        }

        warn!(%direction, "No stage met the RMSE threshold; falling back to identity");
        let identity = RigidTransform::identity();
        let metrics = compute_metrics_with_index(source, &index, &identity)?;

        Ok(DirectionRun {
            candidate: Candidate {
                transform: identity,
                metrics,
                stage: IDENTITY_FALLBACK.to_string(),
                direction,
            },
            attempts,
            unrecoverable: if every_stage_errored { last_error } else { None },
        })
    }
}
