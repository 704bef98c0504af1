//! Iterative Closest Point refinement.
//!
//! Each iteration moves the source by the cumulative transform, pairs every
//! moved point with its nearest target point, and solves the closed-form
//! alignment of those pairs. The increment is composed on the left of the
//! running transform. Iteration stops when the mean residual changes by less
//! than the tolerance; running out of iterations first is an error.

use crate::algorithms::kabsch::solve_rigid_alignment;
use crate::error::{FitError, ValidationError};
use crate::geometry::{PointSet, RigidTransform};
use crate::spatial::{KdTreeIndex, SpatialIndex};
use crate::validation::point_set::smaller_set;
use crate::validation::{TransformValidator, MIN_PAIR_POINTS};
use crate::Result;
use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, trace};

/// Parameters for ICP refinement.
#[derive(Debug, Clone)]
pub struct IcpParams {
    /// Iteration budget (default: 50).
    pub max_iterations: usize,
    /// Convergence threshold on the change of mean residual (default: 1e-7).
    pub tolerance: f64,
    /// Pairs farther apart than this are ignored. `None` keeps every pair.
    pub max_correspondence_distance: Option<f64>,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-7,
            max_correspondence_distance: None,
        }
    }
}

impl IcpParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn with_max_correspondence_distance(mut self, distance: f64) -> Self {
        self.max_correspondence_distance = Some(distance);
        self
    }

    #[must_use]
    pub const fn without_correspondence_limit(mut self) -> Self {
        self.max_correspondence_distance = None;
        self
    }
}

/// Refinement loop state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IcpState {
    Iterating,
    Converged,
    Exhausted,
}

/// Successful refinement.
#[derive(Debug, Clone)]
pub struct IcpOutcome {
    pub transform: RigidTransform,
    /// Iterations performed, counting the one that detected convergence.
    pub iterations: usize,
    /// Mean nearest-neighbour residual at convergence.
    pub mean_error: f64,
}

/// ICP driver bound to a fixed parameter set.
#[derive(Debug, Clone, Default)]
pub struct IcpRefiner {
    params: IcpParams,
}

impl IcpRefiner {
    pub fn new(params: IcpParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IcpParams {
        &self.params
    }

    /// Refine `initial` so that it maps `source` onto `target`.
    ///
    /// The spatial index is always built over the smaller of the two sets.
    /// When that is the source, the problem is solved in reverse and the
    /// result inverted, so the returned transform always maps source into
    /// target coordinates either way.
    ///
    /// # Errors
    ///
    /// - [`FitError::Validation`] for an invalid initial transform or a set
    ///   with fewer than [`MIN_PAIR_POINTS`] points.
    /// - [`FitError::Convergence`] when the budget runs out.
    /// - [`FitError::Registration`] when no correspondences survive the
    ///   distance filter or the per-iteration solve fails.
    pub fn refine(
        &self,
        source: &PointSet,
        target: &PointSet,
        initial: &RigidTransform,
    ) -> Result<IcpOutcome> {
        TransformValidator::new().validate(initial)?;
        let (name, smallest) = smaller_set(source, target);
        if smallest < MIN_PAIR_POINTS {
            return Err(ValidationError::InsufficientPoints {
                name: name.to_string(),
                actual: smallest,
                required: MIN_PAIR_POINTS,
            }
            .into());
        }

        if source.len() < target.len() {
            debug!(
                source_points = source.len(),
                target_points = target.len(),
                "Indexing the smaller set; solving in reverse"
            );
            let outcome = self.iterate(target, source, &initial.inverse())?;
            return Ok(IcpOutcome {
                transform: outcome.transform.inverse(),
                ..outcome
            });
        }

        self.iterate(source, target, initial)
    }

    fn iterate(
        &self,
        moving: &PointSet,
        fixed: &PointSet,
        initial: &RigidTransform,
    ) -> Result<IcpOutcome> {
        let index = KdTreeIndex::build(fixed);
        let mut current = *initial;
        let mut previous_error = f64::INFINITY;
        let mut mean_error = f64::INFINITY;
        let mut state = IcpState::Iterating;
        let mut iteration = 0;

        while state == IcpState::Iterating {
            if iteration >= self.params.max_iterations {
                state = IcpState::Exhausted;
                continue;
            }

            let moved = current.apply(moving);
            let (sources, targets, error) = self.correspondences(&moved, fixed, &index)?;
            mean_error = error;

            trace!(iteration, mean_error, "ICP iteration");

            if (mean_error - previous_error).abs() < self.params.tolerance {
                state = IcpState::Converged;
                continue;
            }
            previous_error = mean_error;

            let increment = solve_rigid_alignment(&sources, &targets)?;
            current = increment.compose(&current);
            iteration += 1;
        }

        match state {
            IcpState::Converged => {
                debug!(iterations = iteration + 1, mean_error, "ICP converged");
                Ok(IcpOutcome {
                    transform: current,
                    iterations: iteration + 1,
                    mean_error,
                })
            }
            _ => Err(FitError::Convergence {
                iterations: self.params.max_iterations,
                mean_error,
            }),
        }
    }

    /// Nearest-neighbour pairs for the moved points plus their mean residual.
    fn correspondences(
        &self,
        moved: &PointSet,
        fixed: &PointSet,
        index: &KdTreeIndex,
    ) -> Result<(Vec<Point3<f64>>, Vec<Point3<f64>>, f64)> {
        let limit = self.params.max_correspondence_distance;
        let pairs: Vec<(Point3<f64>, Point3<f64>, f64)> = moved
            .points()
            .par_iter()
            .filter_map(|p| {
                let nn = index.nearest(p)?;
                match limit {
                    Some(max) if nn.distance > max => None,
                    _ => Some((*p, fixed.points()[nn.index], nn.distance)),
                }
            })
            .collect();

        if pairs.is_empty() {
            return Err(FitError::registration(
                "no correspondences within the maximum correspondence distance",
            ));
        }

        let mean = pairs.iter().map(|(_, _, d)| d).sum::<f64>() / pairs.len() as f64;
        let (sources, targets): (Vec<_>, Vec<_>) =
            pairs.into_iter().map(|(s, t, _)| (s, t)).unzip();
        Ok((sources, targets, mean))
    }
}
