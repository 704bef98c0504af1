mod common;

use cascaded_fit::algorithms::closed_form_alignment;
use cascaded_fit::pipeline::{
    GlobalIcpStage, IcpOnlyStage, RegistrationStrategy, StageOutcome, IDENTITY_FALLBACK,
};
use cascaded_fit::*;
use common::{max_difference, random_points, rotation_z, translation};
use nalgebra::{Matrix4, Point3, Vector4};
use std::sync::Arc;

/// Fails whenever the source starts with `marker`, otherwise solves in closed form.
struct FailsOnMarker {
    marker: Point3<f64>,
}

impl RegistrationStrategy for FailsOnMarker {
    fn name(&self) -> &str {
        "marker"
    }

    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform> {
        if source.points()[0] == self.marker {
            return Err(FitError::registration("marker source refused"));
        }
        closed_form_alignment(source, target)
    }
}

struct AlwaysFails {
    convergence: bool,
}

impl RegistrationStrategy for AlwaysFails {
    fn name(&self) -> &str {
        "always-fails"
    }

    fn estimate(&self, _source: &PointSet, _target: &PointSet) -> Result<RigidTransform> {
        if self.convergence {
            Err(FitError::Convergence {
                iterations: 50,
                mean_error: 1.0,
            })
        } else {
            Err(FitError::registration("no estimate"))
        }
    }
}

struct Fixed(RigidTransform);

impl RegistrationStrategy for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn estimate(&self, _source: &PointSet, _target: &PointSet) -> Result<RigidTransform> {
        Ok(self.0)
    }
}

struct RejectsInput;

impl RegistrationStrategy for RejectsInput {
    fn name(&self) -> &str {
        "rejects"
    }

    fn estimate(&self, _source: &PointSet, _target: &PointSet) -> Result<RigidTransform> {
        Err(ValidationError::Malformed {
            name: "source".to_string(),
            reason: "refused".to_string(),
        }
        .into())
    }
}

/// Refuses with a validation error whenever the source does not start with `forward_first`.
struct RejectsReverseInput {
    forward_first: Point3<f64>,
}

impl RegistrationStrategy for RejectsReverseInput {
    fn name(&self) -> &str {
        "rejects-reverse"
    }

    fn estimate(&self, source: &PointSet, target: &PointSet) -> Result<RigidTransform> {
        if source.points()[0] != self.forward_first {
            return Err(ValidationError::Malformed {
                name: "target".to_string(),
                reason: "refused".to_string(),
            }
            .into());
        }
        closed_form_alignment(source, target)
    }
}

/// Global aligner that answers with a non-rigid scale matrix.
struct ScalingAligner;

impl GlobalAligner for ScalingAligner {
    fn name(&self) -> &str {
        "scaling"
    }

    fn estimate(&self, _source: &PointSet, _target: &PointSet) -> Result<RigidTransform> {
        Ok(RigidTransform::from_matrix(Matrix4::from_diagonal(
            &Vector4::new(2.0, 1.0, 1.0, 1.0),
        )))
    }
}

#[test]
fn test_default_stage_order() {
    let cascade = FallbackCascade::new(RegistrationConfig::default());
    assert_eq!(
        cascade.stage_names(),
        vec!["closed-form+ICP", "principal-axes+ICP", "ICP"]
    );
}

#[test]
fn test_translation_registers_forward() {
    let source = random_points(200, 41);
    let truth = translation(1.0, 1.0, 1.0);
    let target = truth.apply(&source);

    let config = RegistrationConfig::default().with_bidirectional(false);
    let result = register(&source, &target, &config).unwrap();

    assert!(result.is_success);
    assert_eq!(result.method, "Forward closed-form+ICP");
    assert_eq!(result.direction, Direction::Forward);
    assert!(result.inlier_rmse < 1e-6);
    assert!(max_difference(&result.transformation, &truth) < 1e-6);
    assert_eq!(result.attempts.len(), 1);
    assert!(matches!(result.attempts[0].outcome, StageOutcome::Accepted { .. }));
}

#[test]
fn test_bidirectional_result_maps_source_into_target() {
    let source = random_points(250, 42);
    let truth = translation(4.0, -2.0, 7.0).compose(&rotation_z(25.0));
    let target = truth.apply(&source);

    let result = register(&source, &target, &RegistrationConfig::default()).unwrap();

    assert!(result.is_success);
    assert!(result.method.ends_with("closed-form+ICP"));
    assert!(max_difference(&result.transformation, &truth) < 1e-6);
    let directions: Vec<Direction> = result.attempts.iter().map(|a| a.direction).collect();
    assert_eq!(directions, vec![Direction::Forward, Direction::Reverse]);
}

#[test]
fn test_unequal_sizes_are_truncated() {
    let source = random_points(300, 43);
    let truth = translation(0.5, 0.5, 0.0);
    let target = truth.apply(&source.truncated(200));

    let config = RegistrationConfig::default().with_bidirectional(false);
    let result = register(&source, &target, &config).unwrap();
    assert!(result.is_success);
    assert!(max_difference(&result.transformation, &truth) < 1e-6);
}

#[test]
fn test_reverse_direction_can_win() {
    let source = random_points(150, 44);
    let truth = translation(3.0, 2.0, 1.0);
    let target = truth.apply(&source);

    let cascade = FallbackCascade::builder(RegistrationConfig::default())
        .add_stage(FailsOnMarker {
            marker: source.points()[0],
        })
        .build();
    let result = cascade.register(&source, &target).unwrap();

    assert_eq!(result.direction, Direction::Reverse);
    assert_eq!(result.method, "Reverse marker");
    assert!(result.is_success);
    assert!(max_difference(&result.transformation, &truth) < 1e-9);
    assert!(matches!(
        result.attempts[0].outcome,
        StageOutcome::Failed {
            convergence: false,
            ..
        }
    ));
}

#[test]
fn test_all_registration_failures_raise() {
    let source = random_points(120, 45);
    let target = translation(1.0, 0.0, 0.0).apply(&source);

    let cascade = FallbackCascade::builder(RegistrationConfig::default())
        .add_stage(AlwaysFails { convergence: false })
        .add_stage(AlwaysFails { convergence: false })
        .build();

    match cascade.register(&source, &target) {
        Err(FitError::Registration(message)) => {
            assert!(message.contains("all registration stages failed"));
        }
        other => panic!("expected a registration error, got {:?}", other),
    }
}

#[test]
fn test_convergence_failures_fall_back_to_identity() {
    let source = random_points(120, 46);
    let target = translation(10.0, 0.0, 0.0).apply(&source);

    let cascade = FallbackCascade::builder(RegistrationConfig::default())
        .add_stage(AlwaysFails { convergence: true })
        .build();
    let result = cascade.register(&source, &target).unwrap();

    assert!(!result.is_success);
    assert_eq!(result.transformation, RigidTransform::identity());
    assert_eq!(result.method, format!("Forward {}", IDENTITY_FALLBACK));
    assert!(result.inlier_rmse > 0.0);
    assert_eq!(result.attempts.len(), 2);
}

#[test]
fn test_tie_keeps_forward_result() {
    let points = random_points(120, 47);
    let cascade = FallbackCascade::builder(RegistrationConfig::default())
        .add_stage(Fixed(RigidTransform::identity()))
        .build();

    let result = cascade.register(&points, &points).unwrap();
    assert_eq!(result.direction, Direction::Forward);
    assert_eq!(result.method, "Forward fixed");
    assert_eq!(result.inlier_rmse, 0.0);
}

#[test]
fn test_above_threshold_stage_falls_through() {
    let source = random_points(120, 48);
    let target = translation(5.0, 0.0, 0.0).apply(&source);
    let truth = translation(5.0, 0.0, 0.0);

    let config = RegistrationConfig::default().with_bidirectional(false);
    let cascade = FallbackCascade::builder(config)
        .add_stage(Fixed(translation(4.0, 0.0, 0.0)))
        .add_stage(Fixed(truth))
        .build();
    let result = cascade.register(&source, &target).unwrap();

    assert!(matches!(
        result.attempts[0].outcome,
        StageOutcome::AboveThreshold { .. }
    ));
    assert_eq!(result.method, "Forward fixed");
    assert!(max_difference(&result.transformation, &truth) < 1e-12);
}

#[test]
fn test_validation_errors_are_fatal() {
    let source = random_points(50, 49);
    let target = random_points(200, 50);
    let err = register(&source, &target, &RegistrationConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        FitError::Validation(ValidationError::InsufficientPoints {
            actual: 50,
            required: 100,
            ..
        })
    ));

    let points = random_points(120, 51);
    let cascade = FallbackCascade::builder(RegistrationConfig::default())
        .add_stage(RejectsInput)
        .add_stage(Fixed(RigidTransform::identity()))
        .build();
    assert!(matches!(
        cascade.register(&points, &points),
        Err(FitError::Validation(ValidationError::Malformed { .. }))
    ));
}

#[test]
fn test_result_serializes_matrix_rows() {
    let points = random_points(120, 52);
    let result = register(
        &points,
        &points,
        &RegistrationConfig::default().with_bidirectional(false),
    )
    .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    let rows = json["transformation"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3], serde_json::json!([0.0, 0.0, 0.0, 1.0]));
    assert_eq!(json["is_success"], serde_json::json!(true));
}

#[test]
fn test_thousand_point_translation_scenario() {
    let source = random_points(1000, 53);
    let target = translation(1.0, 1.0, 1.0).apply(&source);

    let result = register(&source, &target, &RegistrationConfig::default()).unwrap();

    assert!(result.is_success);
    assert!(result.inlier_rmse < 0.01);
    let t = result.transformation.translation();
    assert!((t - nalgebra::Vector3::new(1.0, 1.0, 1.0)).norm() < 0.1);
    assert!(TransformValidator::new().validate(&result.transformation).is_ok());
}

#[test]
fn test_returned_transform_inverts_cleanly() {
    let source = random_points(200, 54);
    let truth = translation(-6.0, 3.0, 2.0).compose(&rotation_z(-40.0));
    let target = truth.apply(&source);

    let result = register(&source, &target, &RegistrationConfig::default()).unwrap();
    let round_trip = result
        .transformation
        .inverse()
        .apply(&result.transformation.apply(&source));

    let drift = source
        .iter()
        .zip(round_trip.iter())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max);
    assert!(drift < 1e-9);
}

#[test]
fn test_invalid_aligner_output_falls_through() {
    let source = random_points(200, 55);
    let truth = translation(0.3, 0.2, 0.1);
    let target = truth.apply(&source);

    let config = RegistrationConfig::default().with_bidirectional(false);
    let cascade = FallbackCascade::builder(config)
        .add_stage(GlobalIcpStage::new(Arc::new(ScalingAligner), IcpParams::default()))
        .add_stage(IcpOnlyStage::new(
            IcpParams::default().with_max_correspondence_distance(5.0),
        ))
        .build();
    let result = cascade.register(&source, &target).unwrap();

    assert!(matches!(
        result.attempts[0].outcome,
        StageOutcome::Failed {
            convergence: false,
            ..
        }
    ));
    assert_eq!(result.method, "Forward ICP");
    assert!(result.is_success);
    assert!(max_difference(&result.transformation, &truth) < 1e-6);
}

#[test]
fn test_scaling_aligner_in_default_stages_is_not_fatal() {
    let source = random_points(200, 56);
    let target = translation(0.3, 0.2, 0.1).apply(&source);

    let cascade = FallbackCascade::builder(RegistrationConfig::default())
        .with_global_aligner(Arc::new(ScalingAligner))
        .with_default_stages()
        .build();
    assert_eq!(
        cascade.stage_names(),
        vec!["closed-form+ICP", "scaling+ICP", "ICP"]
    );
    assert!(cascade.register(&source, &target).unwrap().is_success);
}

#[test]
fn test_reverse_validation_error_is_fatal() {
    let source = random_points(150, 57);
    let target = translation(1.0, 2.0, 3.0).apply(&source);

    let cascade = FallbackCascade::builder(RegistrationConfig::default())
        .add_stage(RejectsReverseInput {
            forward_first: source.points()[0],
        })
        .build();
    assert!(matches!(
        cascade.register(&source, &target),
        Err(FitError::Validation(ValidationError::Malformed { .. }))
    ));

    let forward_only = FallbackCascade::builder(RegistrationConfig::default().with_bidirectional(false))
        .add_stage(RejectsReverseInput {
            forward_first: source.points()[0],
        })
        .build();
    assert!(forward_only.register(&source, &target).unwrap().is_success);
}

#[test]
fn test_planar_scan_registers() {
    let plane: PointSet = (0..40)
        .flat_map(|i| (0..40).map(move |j| Point3::new(i as f64, j as f64, 5.0)))
        .collect();
    let truth = translation(1.5, -2.0, 0.75);
    let target = truth.apply(&plane);

    let result = register(&plane, &target, &RegistrationConfig::default()).unwrap();
    assert!(result.is_success);
    assert!(max_difference(&result.transformation, &truth) < 1e-6);
}

#[test]
fn test_integer_grid_registers() {
    let grid: PointSet = (0..10)
        .flat_map(|i| {
            (0..10).flat_map(move |j| (0..10).map(move |k| Point3::new(i as f64, j as f64, k as f64)))
        })
        .collect();
    let truth = translation(0.5, 0.25, -3.0);
    let target = truth.apply(&grid);

    let result = register(&grid, &target, &RegistrationConfig::default()).unwrap();
    assert!(result.is_success);
    assert!(max_difference(&result.transformation, &truth) < 1e-6);
}

#[test]
fn test_duplicate_heavy_set_registers() {
    let mut rows = vec![[10.0, 20.0, 30.0]; 200];
    rows.extend(random_points(200, 58).to_rows());
    let source = PointSet::from_rows(&rows);
    let truth = translation(2.0, 1.0, -1.0);
    let target = truth.apply(&source);

    let result = register(&source, &target, &RegistrationConfig::default()).unwrap();
    assert!(result.is_success);
    assert!(result.inlier_rmse < 1e-6);
}
