use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::FitError;
use crate::geometry::RigidTransform;
use crate::logging::{set_correlation_id, RequestSpan};
use crate::pipeline::FallbackCascade;
use crate::validation::PointSetValidator;

pub const SERVICE_NAME: &str = "point-cloud-registration-api";

/// Shared server state
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    cascade: Arc<FallbackCascade>,
}

impl ApiState {
    pub fn new(config: Config) -> Self {
        let cascade = Arc::new(FallbackCascade::from_config(&config));
        Self {
            config: Arc::new(config),
            cascade,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Body of a successful `/process_point_clouds` call
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub transformation: RigidTransform,
    pub inlier_rmse: f64,
    pub max_error: f64,
    pub is_success: bool,
    pub method: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures mapped onto HTTP status codes
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<FitError> for ApiError {
    fn from(err: FitError) -> Self {
        match err {
            FitError::Validation(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(m) | ApiError::Internal(m) => m,
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// HTTP front end for the registration engine
pub struct ApiServer {
    state: ApiState,
}

impl ApiServer {
    pub fn new(config: Config) -> Self {
        Self {
            state: ApiState::new(config),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let api = self.state.config.api.clone();
        let app = self.router();

        let listener = tokio::net::TcpListener::bind((api.host.as_str(), api.port)).await?;
        info!(host = %api.host, port = api.port, "Registration API listening");

        axum::serve(listener, app).await?;
        Ok(())
    }
}

pub fn build_router(state: ApiState) -> Router {
    let api = &state.config.api;
    let body_limit = api.max_body_mb.saturating_mul(1024 * 1024);
    let enable_cors = api.enable_cors;

    let router = Router::new()
        .route("/health", get(health))
        .route("/process_point_clouds", post(process_point_clouds))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

async fn process_point_clouds(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = RequestSpan::new("/process_point_clouds", request_id);

    let response = match handle_process(state, payload, request_id).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            match &e {
                ApiError::BadRequest(m) => warn!(parent: span.span(), error = %m, "Rejected request"),
                ApiError::Internal(m) => error!(parent: span.span(), error = %m, "Registration failed"),
            }
            e.into_response()
        }
    };

    span.record_status(response.status().as_u16());
    response
}

async fn handle_process(
    state: ApiState,
    payload: Result<Json<Value>, JsonRejection>,
    request_id: Uuid,
) -> Result<ProcessResponse, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (source_raw, target_raw) = match (body.get("source_points"), body.get("target_points")) {
        (Some(s), Some(t)) => (s, t),
        _ => {
            return Err(ApiError::BadRequest(
                "Missing source_points or target_points".to_string(),
            ))
        }
    };

    let validator = PointSetValidator::new(state.config.validation.clone());
    let source = validator.validate_json(source_raw, "source_points")?;
    let target = validator.validate_json(target_raw, "target_points")?;

    let cascade = Arc::clone(&state.cascade);
    let result = tokio::task::spawn_blocking(move || {
        set_correlation_id(request_id);
        cascade.register(&source, &target)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("registration task failed: {}", e)))??;

    Ok(ProcessResponse {
        transformation: result.transformation,
        inlier_rmse: result.inlier_rmse,
        max_error: result.max_error,
        is_success: result.is_success,
        method: result.method,
    })
}
