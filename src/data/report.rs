use crate::pipeline::FitResult;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output layouts of the command-line front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// A registration result together with where its inputs came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub source_file: PathBuf,
    pub target_file: PathBuf,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: FitResult,
}

impl RegistrationReport {
    pub fn new(source_file: &Path, target_file: &Path, result: FitResult) -> Self {
        Self {
            source_file: source_file.to_path_buf(),
            target_file: target_file.to_path_buf(),
            created_at: Utc::now(),
            result,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// `<source dir>/<source stem>_<target stem>_combined_report.json`
pub fn report_path(source: &Path, target: &Path) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("points")
            .to_string()
    };
    let dir = source.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}_{}_combined_report.json", stem(source), stem(target)))
}

/// Render a result in the requested layout.
pub fn format_result(result: &FitResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => Ok(result.transformation.to_csv_string()),
        OutputFormat::Text => {
            let mut out = String::new();
            let rule = "=".repeat(60);
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{}", rule);
            let _ = writeln!(out, "REGISTRATION RESULTS");
            let _ = writeln!(out, "{}", rule);
            let _ = writeln!(out, "Method:    {}", result.method);
            let _ = writeln!(out, "Success:   {}", result.is_success);
            let _ = writeln!(out, "RMSE:      {:.6}", result.inlier_rmse);
            let _ = writeln!(out, "Max Error: {:.6}", result.max_error);
            let _ = writeln!(out, "Threshold: {:.6}", result.rmse_threshold);
            let _ = writeln!(out);
            let _ = writeln!(out, "Transformation Matrix:");
            let _ = write!(out, "{}", result.transformation);
            if !result.attempts.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "Stages:");
                for attempt in &result.attempts {
                    let _ = writeln!(
                        out,
                        "  {:<8} {:<24} {:>10.1} ms  {:?}",
                        attempt.direction.to_string(),
                        attempt.stage,
                        attempt.duration_ms,
                        attempt.outcome
                    );
                }
            }
            let _ = writeln!(out, "{}", rule);
            Ok(out)
        }
    }
}
