mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use cascaded_fit::api::{build_router, ApiState, ErrorResponse, HealthResponse, ProcessResponse};
use cascaded_fit::Config;
use common::{random_points, translation};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn post_json(body: String) -> (StatusCode, Vec<u8>) {
    let app = build_router(ApiState::new(Config::default()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process_point_clouds")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_health() {
    let app = build_router(ApiState::new(Config::default()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "point-cloud-registration-api");
}

#[tokio::test]
async fn test_process_translated_clouds() {
    let source = random_points(150, 81);
    let target = translation(2.0, -1.0, 0.5).apply(&source);
    let body = json!({
        "source_points": source.to_rows(),
        "target_points": target.to_rows(),
    });

    let (status, bytes) = post_json(body.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let response: ProcessResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(response.is_success);
    assert!(response.inlier_rmse < 1e-6);
    assert!(response.method.ends_with("closed-form+ICP"));
    assert!((response.transformation.translation().x - 2.0).abs() < 1e-6);

    let raw: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(raw["transformation"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_missing_fields_rejected() {
    let body = json!({ "source_points": random_points(120, 82).to_rows() });
    let (status, bytes) = post_json(body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error.error, "Missing source_points or target_points");
}

#[tokio::test]
async fn test_invalid_points_rejected() {
    let two_columns: Vec<[f64; 2]> = (0..120).map(|i| [i as f64, 1.0]).collect();
    let body = json!({
        "source_points": two_columns,
        "target_points": random_points(120, 83).to_rows(),
    });
    let (status, bytes) = post_json(body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(error.error.contains("source_points"));

    let body = json!({
        "source_points": random_points(20, 84).to_rows(),
        "target_points": random_points(120, 85).to_rows(),
    });
    let (status, bytes) = post_json(body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(error.error.contains("Insufficient points"));
    assert!(error.error.contains("source_points"));
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let (status, _) = post_json("{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
