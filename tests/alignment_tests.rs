mod common;

use approx::assert_relative_eq;
use cascaded_fit::algorithms::{closed_form_alignment, solve_rigid_alignment};
use cascaded_fit::*;
use common::{max_difference, random_points, random_points_in, rotation_z, translation};
use nalgebra::{Point3, Vector3};

#[test]
fn test_closed_form_identity() {
    let points = random_points(100, 11);
    let transform = closed_form_alignment(&points, &points).unwrap();
    assert!(max_difference(&transform, &RigidTransform::identity()) < 1e-9);
}

#[test]
fn test_closed_form_recovers_rotation_and_translation() {
    let source = random_points(150, 12);
    let truth = translation(5.0, -3.0, 12.0).compose(&RigidTransform::from_axis_angle(
        &Vector3::new(0.3, -1.0, 0.5),
        0.8,
    ));
    let target = truth.apply(&source);

    let estimate = closed_form_alignment(&source, &target).unwrap();
    assert!(max_difference(&estimate, &truth) < 1e-9);
}

#[test]
fn test_closed_form_never_returns_reflection() {
    let source = random_points(80, 13);
    let mirrored: PointSet = source.iter().map(|p| Point3::new(p.x, p.y, -p.z)).collect();

    let estimate = solve_rigid_alignment(source.points(), mirrored.points()).unwrap();
    assert_relative_eq!(estimate.rotation().determinant(), 1.0, epsilon = 1e-9);
    assert!(TransformValidator::new().validate(&estimate).is_ok());
}

#[test]
fn test_closed_form_rejects_mismatched_lengths() {
    let a = random_points(20, 14);
    let b = random_points(21, 15);
    let err = solve_rigid_alignment(a.points(), b.points()).unwrap_err();
    assert!(matches!(err, FitError::Registration(_)));

    let err = solve_rigid_alignment(&[], &[]).unwrap_err();
    assert!(matches!(err, FitError::Registration(_)));
}

#[test]
fn test_icp_perfect_match_converges_quickly() {
    let points = random_points(200, 21);
    let outcome = IcpRefiner::default()
        .refine(&points, &points, &RigidTransform::identity())
        .unwrap();

    assert!(outcome.iterations < 5, "took {} iterations", outcome.iterations);
    assert!(outcome.mean_error < 1e-9);
    assert!(max_difference(&outcome.transform, &RigidTransform::identity()) < 1e-9);
}

#[test]
fn test_icp_refines_small_offset() {
    let source = random_points(300, 22);
    let truth = translation(0.2, -0.1, 0.15).compose(&rotation_z(0.5));
    let target = truth.apply(&source);

    let outcome = IcpRefiner::default()
        .refine(&source, &target, &RigidTransform::identity())
        .unwrap();
    assert!(max_difference(&outcome.transform, &truth) < 1e-6);
    assert!(compute_metrics(&source, &target, &outcome.transform).unwrap().rmse < 1e-6);
}

#[test]
fn test_icp_reports_exhausted_budget() {
    let source = random_points(200, 23);
    let target: PointSet = source
        .iter()
        .map(|p| Point3::from(p.coords * 100.0 + Vector3::repeat(1000.0)))
        .collect();

    let refiner = IcpRefiner::new(IcpParams::new().with_max_iterations(5));
    let err = refiner
        .refine(&source, &target, &RigidTransform::identity())
        .unwrap_err();

    match err {
        FitError::Convergence {
            iterations,
            mean_error,
        } => {
            assert_eq!(iterations, 5);
            assert!(mean_error.is_finite());
        }
        other => panic!("expected a convergence error, got {:?}", other),
    }
    assert!(FitError::Convergence {
        iterations: 5,
        mean_error: 1.0
    }
    .is_recoverable());
}

#[test]
fn test_icp_distance_filter_without_pairs() {
    let source = random_points(50, 24);
    let target = translation(500.0, 0.0, 0.0).apply(&source);

    let refiner = IcpRefiner::new(IcpParams::new().with_max_correspondence_distance(1.0));
    let err = refiner
        .refine(&source, &target, &RigidTransform::identity())
        .unwrap_err();
    assert!(matches!(err, FitError::Registration(_)));
}

#[test]
fn test_icp_smaller_source_still_maps_into_target() {
    // The smaller source forces the index onto the source side; the answer
    // must still map source coordinates into target coordinates.
    let source = random_points(100, 25);
    let truth = translation(0.1, 0.0, 0.0);
    let mut target = truth.apply(&source).into_points();
    target.extend(random_points_in(50, 26, 5000.0, 5100.0).into_points());
    let target = PointSet::new(target);

    let refiner = IcpRefiner::new(IcpParams::new().with_max_correspondence_distance(1.0));
    let outcome = refiner
        .refine(&source, &target, &RigidTransform::identity())
        .unwrap();

    assert_relative_eq!(outcome.transform.translation().x, 0.1, epsilon = 1e-6);
    assert!(max_difference(&outcome.transform, &truth) < 1e-6);
}

#[test]
fn test_icp_rejects_tiny_sets() {
    let points = random_points(9, 27);
    let err = IcpRefiner::default()
        .refine(&points, &points, &RigidTransform::identity())
        .unwrap_err();
    assert!(matches!(
        err,
        FitError::Validation(ValidationError::InsufficientPoints { actual: 9, .. })
    ));
}

#[test]
fn test_principal_axes_handles_large_rotation() {
    // Elongated cloud so the principal axes are well separated.
    let source: PointSet = random_points(400, 28)
        .iter()
        .map(|p| Point3::new(p.x * 4.0, p.y * 2.0, p.z * 0.5))
        .collect();
    let truth = translation(30.0, -20.0, 10.0).compose(&rotation_z(120.0));
    let target = truth.apply(&source);

    let aligner = PrincipalAxesAligner::new();
    assert_eq!(aligner.name(), "principal-axes");

    let estimate = aligner.estimate(&source, &target).unwrap();
    let refined = IcpRefiner::default()
        .refine(&source, &target, &estimate)
        .unwrap();
    assert!(max_difference(&refined.transform, &truth) < 1e-6);
}
