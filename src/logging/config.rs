//! Logging configuration
//!
//! Per-component log levels and output destinations for the subscriber
//! installed by [`init_logging`](super::init_logging).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Directory for daily-rolling JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// Include file location in console logs
    pub include_file_location: bool,

    /// Level for the solvers (closed-form, ICP, global alignment)
    pub algorithm_level: String,

    /// Level for the cascade orchestrator
    pub pipeline_level: String,

    /// Level for the HTTP front end
    pub api_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
            console_output: true,
            log_directory: None,
            include_file_location: false,
            algorithm_level: "info".to_string(),
            pipeline_level: "info".to_string(),
            api_level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Verbose console and file logging
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            console_output: true,
            log_directory: Some(PathBuf::from("logs")),
            include_file_location: true,
            algorithm_level: "trace".to_string(),
            pipeline_level: "debug".to_string(),
            api_level: "debug".to_string(),
        }
    }

    /// File-only logging with minimal overhead
    pub fn production() -> Self {
        Self {
            global_level: "warn".to_string(),
            console_output: false,
            log_directory: Some(PathBuf::from("/var/log/cascaded-fit")),
            include_file_location: false,
            algorithm_level: "warn".to_string(),
            pipeline_level: "info".to_string(),
            api_level: "info".to_string(),
        }
    }

    /// Console level picked from a `-v` repetition count
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            global_level: level.to_string(),
            algorithm_level: level.to_string(),
            pipeline_level: level.to_string(),
            api_level: level.to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("algorithm_level", &self.algorithm_level),
            ("pipeline_level", &self.pipeline_level),
            ("api_level", &self.api_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Effective level for a component name
    pub fn get_component_level(&self, component: &str) -> &str {
        match component {
            "algorithm" | "algorithms" => &self.algorithm_level,
            "pipeline" => &self.pipeline_level,
            "api" => &self.api_level,
            _ => &self.global_level,
        }
    }

    /// `EnvFilter` directives: the global level for the crate, overridden per module.
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        format!(
            "{krate}={},{krate}::algorithms={},{krate}::pipeline={},{krate}::api={}",
            self.global_level, self.algorithm_level, self.pipeline_level, self.api_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.global_level, "info");
        assert!(config.console_output);
        assert!(config.log_directory.is_none());
        assert!(!config.include_file_location);
    }

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert_eq!(config.global_level, "debug");
        assert_eq!(config.algorithm_level, "trace");
        assert!(config.include_file_location);
        assert!(config.log_directory.is_some());
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert_eq!(config.global_level, "warn");
        assert!(!config.console_output);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.global_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.global_level = "debug".to_string();
        config.pipeline_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).global_level, "warn");
        assert_eq!(LoggingConfig::from_verbosity(2).pipeline_level, "debug");
        assert_eq!(LoggingConfig::from_verbosity(9).api_level, "trace");
    }

    #[test]
    fn test_filter_directives_name_every_component() {
        let directives = LoggingConfig::development().filter_directives();
        assert!(directives.starts_with("cascaded_fit=debug"));
        assert!(directives.contains("cascaded_fit::algorithms=trace"));
        assert!(directives.contains("cascaded_fit::api=debug"));
    }
}
