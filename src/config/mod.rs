use crate::algorithms::IcpParams;
use crate::error::FitError;
use crate::logging::LoggingConfig;
use crate::validation::ValidationConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registration: RegistrationConfig,
    pub validation: ValidationConfig,
    pub global: GlobalAlignmentConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Parameters of one registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// A result is successful when its RMSE is strictly below this.
    pub rmse_threshold: f64,
    /// Also register target onto source and keep the better direction.
    pub enable_bidirectional: bool,
    pub max_iterations: usize,
    /// Convergence threshold on the change of mean residual.
    pub tolerance: f64,
    /// Correspondence cut-off for the global and identity-start stages.
    pub max_correspondence_distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalAlignmentConfig {
    /// Source points used to score each principal-axes hypothesis.
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub max_body_mb: usize,
    pub enable_cors: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            rmse_threshold: 0.01,
            enable_bidirectional: true,
            max_iterations: 50,
            tolerance: 1e-7,
            max_correspondence_distance: 100.0,
        }
    }
}

impl Default for GlobalAlignmentConfig {
    fn default() -> Self {
        Self { sample_size: 1000 }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_mb: 256,
            enable_cors: true,
        }
    }
}

impl RegistrationConfig {
    /// ICP parameters with the bounded correspondence distance.
    pub fn icp_params(&self) -> IcpParams {
        IcpParams::new()
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance)
            .with_max_correspondence_distance(self.max_correspondence_distance)
    }

    pub fn with_rmse_threshold(mut self, threshold: f64) -> Self {
        self.rmse_threshold = threshold;
        self
    }

    pub fn with_bidirectional(mut self, enabled: bool) -> Self {
        self.enable_bidirectional = enabled;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| FitError::Config(format!("cannot read {}: {}", path.display(), e)))?;

        if content.trim_start().starts_with('{') {
            serde_json::from_str(&content)
                .map_err(|e| FitError::Config(format!("{}: {}", path.display(), e)))
        } else {
            toml::from_str(&content).map_err(|e| FitError::Config(format!("{}: {}", path.display(), e)))
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| FitError::Config(e.to_string()))?
            }
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let reg = &self.registration;

        if !(reg.rmse_threshold.is_finite() && reg.rmse_threshold > 0.0) {
            errors.push("Registration rmse_threshold must be positive".to_string());
        }

        if reg.max_iterations == 0 {
            errors.push("Registration max_iterations must be at least 1".to_string());
        }

        if !(reg.tolerance.is_finite() && reg.tolerance > 0.0) {
            errors.push("Registration tolerance must be positive".to_string());
        }

        if reg.max_correspondence_distance.is_nan() || reg.max_correspondence_distance <= 0.0 {
            errors.push("Registration max_correspondence_distance must be positive".to_string());
        }

        if self.validation.min_points > self.validation.max_points {
            errors.push("Validation min_points must not exceed max_points".to_string());
        }

        if self.global.sample_size == 0 {
            errors.push("Global alignment sample_size must be at least 1".to_string());
        }

        if self.api.port == 0 {
            errors.push("API port must be valid".to_string());
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigFormat {
    Json,
    Toml,
}

pub fn load_config_or_default(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    for error in &errors {
                        warn!(error = %error, "Configuration validation error");
                    }
                    warn!("Using default configuration instead");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config; using defaults");
                Config::default()
            }
        },
        None => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_registration_values() {
        let config = Config::default();
        assert_eq!(config.registration.rmse_threshold, 0.01);
        assert!(config.registration.enable_bidirectional);
        assert_eq!(config.registration.max_iterations, 50);
        assert_eq!(config.registration.tolerance, 1e-7);
        assert_eq!(config.registration.max_correspondence_distance, 100.0);
        assert_eq!(config.validation.min_points, 100);
        assert_eq!(config.validation.max_points, 10_000_000);
        assert_eq!(config.api.port, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_and_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.registration.rmse_threshold = 0.5;
        config.api.port = 8080;

        let toml_path = dir.path().join("config.toml");
        config.save_to_file(&toml_path, ConfigFormat::Toml).unwrap();
        let loaded = Config::load_from_file(&toml_path).unwrap();
        assert_eq!(loaded.registration.rmse_threshold, 0.5);
        assert_eq!(loaded.api.port, 8080);

        let json_path = dir.path().join("config.json");
        config.save_to_file(&json_path, ConfigFormat::Json).unwrap();
        let loaded = Config::load_from_file(&json_path).unwrap();
        assert_eq!(loaded.api.port, 8080);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "[registration]\nmax_iterations = 7\n").unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.registration.max_iterations, 7);
        assert_eq!(loaded.registration.rmse_threshold, 0.01);
        assert_eq!(loaded.validation.min_points, 100);
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = Config::default();
        config.registration.rmse_threshold = -1.0;
        config.registration.max_iterations = 0;
        config.validation.min_points = 50_000_000;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[registration]\nrmse_threshold = 0.0\n").unwrap();

        let config = load_config_or_default(Some(&path));
        assert_eq!(config.registration.rmse_threshold, 0.01);
    }
}
