use crate::augmentation::base::{bounding_box, AugmentationBase};
use crate::augmentation::{AugmentedPointSet, PointSetAugmentation};
use crate::error::FitError;
use crate::geometry::PointSet;
use crate::Result;
use nalgebra::{Point3, Vector3};
use rand::seq::index::sample;
use rand_distr::{Distribution, Normal};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Zero-mean Gaussian jitter on every coordinate
pub struct GaussianNoise {
    base: AugmentationBase,
    std_dev: f64,
}

impl GaussianNoise {
    pub fn new(std_dev: f64) -> Self {
        Self {
            base: AugmentationBase::default(),
            std_dev,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base = AugmentationBase::with_seed(seed);
        self
    }
}

impl PointSetAugmentation for GaussianNoise {
    fn apply(&self, points: &PointSet) -> Result<AugmentedPointSet> {
        let mut base = self.base.clone();
        let normal = Normal::new(0.0, self.std_dev)
            .map_err(|e| FitError::Config(format!("invalid noise level {}: {}", self.std_dev, e)))?;

        let noisy = points
            .iter()
            .map(|p| {
                let jitter = Vector3::new(
                    normal.sample(&mut base.rng),
                    normal.sample(&mut base.rng),
                    normal.sample(&mut base.rng),
                );
                p + jitter
            })
            .collect();

        Ok(AugmentedPointSet {
            points: noisy,
            ground_truth: None,
            description: self.description(),
        })
    }

    fn description(&self) -> String {
        format!("Gaussian noise σ={}", self.std_dev)
    }

    fn get_params(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("std_dev".to_string(), json!(self.std_dev));
        params
    }
}

/// Random subset without replacement, keeping the original point order
pub struct Subsample {
    base: AugmentationBase,
    ratio: f64,
}

impl Subsample {
    pub fn new(ratio: f64) -> Self {
        Self {
            base: AugmentationBase::default(),
            ratio: ratio.clamp(0.0, 1.0),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base = AugmentationBase::with_seed(seed);
        self
    }
}

impl PointSetAugmentation for Subsample {
    fn apply(&self, points: &PointSet) -> Result<AugmentedPointSet> {
        let mut base = self.base.clone();
        let keep = ((points.len() as f64) * self.ratio).round() as usize;
        let mut indices = sample(&mut base.rng, points.len(), keep.min(points.len())).into_vec();
        indices.sort_unstable();

        let kept = indices.iter().map(|&i| points.points()[i]).collect();
        Ok(AugmentedPointSet {
            points: kept,
            ground_truth: None,
            description: self.description(),
        })
    }

    fn description(&self) -> String {
        format!("Subsample to {:.0}%", self.ratio * 100.0)
    }

    fn get_params(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("ratio".to_string(), json!(self.ratio));
        params
    }
}

/// Appends uniformly distributed points drawn from the padded bounding box
pub struct Outliers {
    base: AugmentationBase,
    ratio: f64,
    padding: f64,
}

impl Outliers {
    pub fn new(ratio: f64) -> Self {
        Self {
            base: AugmentationBase::default(),
            ratio: ratio.max(0.0),
            padding: 0.1,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base = AugmentationBase::with_seed(seed);
        self
    }

    /// Fraction of each box extent added on both sides.
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding.max(0.0);
        self
    }
}

impl PointSetAugmentation for Outliers {
    fn apply(&self, points: &PointSet) -> Result<AugmentedPointSet> {
        let mut base = self.base.clone();
        let (min, max) = bounding_box(points)
            .ok_or_else(|| FitError::registration("cannot add outliers to an empty point set"))?;
        let pad = (max - min) * self.padding;
        let count = ((points.len() as f64) * self.ratio).round() as usize;

        let mut all = points.points().to_vec();
        for _ in 0..count {
            let mut p = Point3::origin();
            for axis in 0..3 {
                p[axis] = base.random_in_range(min[axis] - pad[axis], max[axis] + pad[axis]);
            }
            all.push(p);
        }

        Ok(AugmentedPointSet {
            points: PointSet::new(all),
            ground_truth: None,
            description: self.description(),
        })
    }

    fn description(&self) -> String {
        format!("Add {:.0}% outliers", self.ratio * 100.0)
    }

    fn get_params(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        params.insert("ratio".to_string(), json!(self.ratio));
        params.insert("padding".to_string(), json!(self.padding));
        params
    }
}
