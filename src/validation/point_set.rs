use crate::error::ValidationError;
use crate::geometry::PointSet;
use crate::validation::ValidationConfig;
use crate::Result;
use nalgebra::Point3;
use serde_json::Value;
use tracing::debug;

/// Minimum size of each set when two sets are registered against each other.
pub const MIN_PAIR_POINTS: usize = 10;

/// Absolute tolerance below which a coordinate counts as zero.
const ZERO_ATOL: f64 = 1e-8;

/// Gatekeeper for point sets entering the engine.
#[derive(Debug, Clone, Default)]
pub struct PointSetValidator {
    config: ValidationConfig,
}

impl PointSetValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn validate(&self, points: &PointSet, name: &str) -> Result<()> {
        let count = points.len();
        if count < self.config.min_points {
            return Err(ValidationError::InsufficientPoints {
                name: name.to_string(),
                actual: count,
                required: self.config.min_points,
            }
            .into());
        }
        if count > self.config.max_points {
            return Err(ValidationError::TooManyPoints {
                name: name.to_string(),
                actual: count,
                max: self.config.max_points,
            }
            .into());
        }

        if self.config.check_finite
            && points
                .iter()
                .any(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(ValidationError::NonFinite {
                name: name.to_string(),
            }
            .into());
        }

        if points
            .iter()
            .all(|p| p.coords.iter().all(|c| c.abs() <= ZERO_ATOL))
        {
            return Err(ValidationError::AllZero {
                name: name.to_string(),
            }
            .into());
        }

        debug!(name, points = count, "Point set validated");
        Ok(())
    }

    /// Validate raw numeric rows, checking shape before content.
    pub fn validate_rows(&self, rows: &[Vec<f64>], name: &str) -> Result<PointSet> {
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some((row, found)) = rows
                .iter()
                .enumerate()
                .find(|(_, r)| r.len() != expected)
                .map(|(i, r)| (i, r.len()))
            {
                return Err(ValidationError::RaggedRows {
                    name: name.to_string(),
                    row,
                    found,
                    expected,
                }
                .into());
            }
            if expected != 3 {
                return Err(ValidationError::ColumnCount {
                    name: name.to_string(),
                    found: expected,
                }
                .into());
            }
        }

        let points: PointSet = rows
            .iter()
            .map(|r| Point3::new(r[0], r[1], r[2]))
            .collect();
        self.validate(&points, name)?;
        Ok(points)
    }

    /// Validate untyped input such as a decoded JSON request body.
    pub fn validate_json(&self, value: &Value, name: &str) -> Result<PointSet> {
        let outer = value.as_array().ok_or_else(|| ValidationError::Dimensionality {
            name: name.to_string(),
            found: describe(value),
        })?;

        let mut rows = Vec::with_capacity(outer.len());
        for item in outer {
            let inner = item.as_array().ok_or_else(|| ValidationError::Dimensionality {
                name: name.to_string(),
                found: format!("an array containing {}", describe(item)),
            })?;
            let row = inner
                .iter()
                .map(|v| {
                    v.as_f64().ok_or_else(|| ValidationError::Dimensionality {
                        name: name.to_string(),
                        found: format!("a row containing {}", describe(v)),
                    })
                })
                .collect::<std::result::Result<Vec<f64>, _>>()?;
            rows.push(row);
        }

        self.validate_rows(&rows, name)
    }

    /// Validate both sets and require each to hold at least [`MIN_PAIR_POINTS`].
    pub fn validate_pair(&self, source: &PointSet, target: &PointSet) -> Result<()> {
        self.validate(source, "source")?;
        self.validate(target, "target")?;

        let (name, smallest) = smaller_set(source, target);
        if smallest < MIN_PAIR_POINTS {
            return Err(ValidationError::InsufficientPoints {
                name: name.to_string(),
                actual: smallest,
                required: MIN_PAIR_POINTS,
            }
            .into());
        }
        Ok(())
    }
}

/// Name and size of the smaller of two sets, preferring the source on a tie.
pub(crate) fn smaller_set(source: &PointSet, target: &PointSet) -> (&'static str, usize) {
    if target.len() < source.len() {
        ("target", target.len())
    } else {
        ("source", source.len())
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(a) => format!("an array of length {}", a.len()),
        Value::Object(_) => "an object".to_string(),
    }
}
