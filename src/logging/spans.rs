//! Structured spans for the registration cascade and the HTTP front end.

use crate::pipeline::{Direction, StageOutcome};
use instant::Instant;
use tracing::field::Empty;
use tracing::{span, Level, Span};
use uuid::Uuid;

/// Span covering one cascade stage attempt
pub struct StageSpan {
    span: Span,
    start_time: Instant,
    stage_name: String,
}

impl StageSpan {
    pub fn new(stage_name: &str, direction: Direction, correlation_id: Option<Uuid>) -> Self {
        let direction = direction.to_string();
        let span = if let Some(corr_id) = correlation_id {
            span!(
                Level::INFO,
                "cascade_stage",
                stage = stage_name,
                direction = %direction,
                correlation_id = %corr_id,
                rmse = Empty,
                outcome = Empty,
                execution_time_ms = Empty
            )
        } else {
            span!(
                Level::INFO,
                "cascade_stage",
                stage = stage_name,
                direction = %direction,
                rmse = Empty,
                outcome = Empty,
                execution_time_ms = Empty
            )
        };

        Self {
            span,
            start_time: Instant::now(),
            stage_name: stage_name.to_string(),
        }
    }

    pub fn record_outcome(&self, outcome: &StageOutcome) {
        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        self.span.record("execution_time_ms", elapsed_ms);

        match outcome {
            StageOutcome::Accepted { rmse } => {
                self.span.record("rmse", *rmse);
                self.span.record("outcome", "accepted");
                tracing::info!(
                    parent: &self.span,
                    stage = %self.stage_name,
                    rmse = *rmse,
                    execution_time_ms = elapsed_ms,
                    "Stage accepted"
                );
            }
            StageOutcome::AboveThreshold { rmse } => {
                self.span.record("rmse", *rmse);
                self.span.record("outcome", "above_threshold");
                tracing::info!(
                    parent: &self.span,
                    stage = %self.stage_name,
                    rmse = *rmse,
                    execution_time_ms = elapsed_ms,
                    "Stage completed above the RMSE threshold"
                );
            }
            StageOutcome::Failed { reason, convergence } => {
                self.span.record("outcome", "failed");
                tracing::warn!(
                    parent: &self.span,
                    stage = %self.stage_name,
                    convergence = *convergence,
                    reason = %reason,
                    execution_time_ms = elapsed_ms,
                    "Stage failed"
                );
            }
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

/// Span covering one HTTP request
pub struct RequestSpan {
    span: Span,
    start_time: Instant,
    request_id: Uuid,
}

impl RequestSpan {
    pub fn new(endpoint: &str, request_id: Uuid) -> Self {
        let span = span!(
            Level::INFO,
            "api_request",
            endpoint = endpoint,
            request_id = %request_id,
            status = Empty,
            execution_time_ms = Empty
        );
        Self {
            span,
            start_time: Instant::now(),
            request_id,
        }
    }

    pub fn record_status(&self, status: u16) {
        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        self.span.record("status", status);
        self.span.record("execution_time_ms", elapsed_ms);
        tracing::info!(
            parent: &self.span,
            status,
            execution_time_ms = elapsed_ms,
            "Request completed"
        );
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
