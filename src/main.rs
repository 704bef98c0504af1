use cascaded_fit::api::ApiServer;
use cascaded_fit::augmentation::standard_variants;
use cascaded_fit::config::{load_config_or_default, Config};
use cascaded_fit::data::{
    format_result, read_point_set, report_path, write_ply, OutputFormat, RegistrationReport,
};
use cascaded_fit::logging::{init_logging, new_correlation_id, LoggingConfig};
use cascaded_fit::{compute_metrics, FallbackCascade, FitError, FitResult, RigidTransform};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

const EXIT_SUCCESS: u8 = 0;
const EXIT_UNSUCCESSFUL: u8 = 1;
const EXIT_FILE_ERROR: u8 = 2;
const EXIT_FIT_ERROR: u8 = 3;
const EXIT_OTHER_ERROR: u8 = 4;

#[derive(Parser)]
#[command(name = "fit")]
#[command(about = "Rigid point cloud registration with a bidirectional ICP fallback cascade")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write JSON logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a source point file onto a target point file
    Register {
        /// Source point file (.csv or .ply)
        source: PathBuf,

        /// Target point file (.csv or .ply)
        target: PathBuf,

        /// Configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output layout
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[arg(long)]
        rmse_threshold: Option<f64>,

        #[arg(long)]
        max_iterations: Option<usize>,

        #[arg(long)]
        max_correspondence_distance: Option<f64>,

        /// Only register source onto target
        #[arg(long)]
        no_bidirectional: bool,
    },

    /// Score a stored transform against two point files
    Metrics {
        source: PathBuf,

        target: PathBuf,

        /// Transform file in the comma-separated matrix layout
        #[arg(short, long)]
        transform: PathBuf,
    },

    /// Register many source files against one target in parallel
    Batch {
        /// Target point file
        #[arg(short, long)]
        target: PathBuf,

        /// Source point files
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the standard set of synthetic variants of a point file
    Generate {
        input: PathBuf,

        #[arg(short, long, default_value = "test_data")]
        output_dir: PathBuf,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_verbosity(cli.verbose);
    logging.log_directory = cli.log_dir.clone();
    let _guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::from(EXIT_OTHER_ERROR);
        }
    };

    match run(cli.command) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FitError>() {
        Some(FitError::Load { .. }) | Some(FitError::Io(_)) => EXIT_FILE_ERROR,
        Some(FitError::Validation(_))
        | Some(FitError::Registration(_))
        | Some(FitError::Convergence { .. }) => EXIT_FIT_ERROR,
        _ => EXIT_OTHER_ERROR,
    }
}

fn run(command: Commands) -> anyhow::Result<u8> {
    match command {
        Commands::Register {
            source,
            target,
            config,
            output,
            format,
            rmse_threshold,
            max_iterations,
            max_correspondence_distance,
            no_bidirectional,
        } => {
            let mut config = load_config_or_default(config.as_deref());
            if let Some(threshold) = rmse_threshold {
                config.registration.rmse_threshold = threshold;
            }
            if let Some(iterations) = max_iterations {
                config.registration.max_iterations = iterations;
            }
            if let Some(distance) = max_correspondence_distance {
                config.registration.max_correspondence_distance = distance;
            }
            if no_bidirectional {
                config.registration.enable_bidirectional = false;
            }
            handle_register(&source, &target, &config, output, format)
        }
        Commands::Metrics {
            source,
            target,
            transform,
        } => handle_metrics(&source, &target, &transform),
        Commands::Batch {
            target,
            sources,
            config,
        } => handle_batch(&target, &sources, &load_config_or_default(config.as_deref())),
        Commands::Generate {
            input,
            output_dir,
            seed,
        } => handle_generate(&input, &output_dir, seed),
        Commands::Serve { config, port } => {
            let mut config = load_config_or_default(config.as_deref());
            if let Some(port) = port {
                config.api.port = port;
            }
            handle_serve(config)
        }
    }
}

fn register_files(source: &Path, target: &Path, config: &Config) -> anyhow::Result<FitResult> {
    new_correlation_id();
    let source_points = read_point_set(source)?;
    let target_points = read_point_set(target)?;
    info!(
        source = %source.display(),
        target = %target.display(),
        source_points = source_points.len(),
        target_points = target_points.len(),
        "Loaded point files"
    );

    let result = FallbackCascade::from_config(config).register(&source_points, &target_points)?;
    Ok(result)
}

fn handle_register(
    source: &Path,
    target: &Path,
    config: &Config,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<u8> {
    let result = register_files(source, target, config)?;
    let rendered = format_result(&result, format)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| FitError::load(&path, e.to_string()))?;
            info!(path = %path.display(), "Result written");
        }
        None => println!("{}", rendered),
    }

    Ok(if result.is_success {
        EXIT_SUCCESS
    } else {
        EXIT_UNSUCCESSFUL
    })
}

fn handle_metrics(source: &Path, target: &Path, transform_file: &Path) -> anyhow::Result<u8> {
    let source_points = read_point_set(source)?;
    let target_points = read_point_set(target)?;
    let text = std::fs::read_to_string(transform_file)
        .map_err(|e| FitError::load(transform_file, e.to_string()))?;
    let transform = RigidTransform::from_csv_str(&text)?;

    let metrics = compute_metrics(&source_points, &target_points, &transform)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(EXIT_SUCCESS)
}

fn handle_batch(target: &Path, sources: &[PathBuf], config: &Config) -> anyhow::Result<u8> {
    let outcomes: Vec<(PathBuf, anyhow::Result<FitResult>)> = sources
        .par_iter()
        .map(|source| (source.clone(), register_files(source, target, config)))
        .collect();

    let mut all_successful = true;
    for (source, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                all_successful &= result.is_success;
                let path = report_path(&source, target);
                RegistrationReport::new(&source, target, result.clone()).save(&path)?;
                println!(
                    "{}: {} rmse={:.6} success={} -> {}",
                    source.display(),
                    result.method,
                    result.inlier_rmse,
                    result.is_success,
                    path.display()
                );
            }
            Err(e) => {
                all_successful = false;
                warn!(source = %source.display(), error = %format!("{:#}", e), "Batch item failed");
                println!("{}: failed: {:#}", source.display(), e);
            }
        }
    }

    Ok(if all_successful {
        EXIT_SUCCESS
    } else {
        EXIT_UNSUCCESSFUL
    })
}

fn handle_generate(input: &Path, output_dir: &Path, seed: u64) -> anyhow::Result<u8> {
    let points = read_point_set(input)?;
    std::fs::create_dir_all(output_dir).map_err(FitError::from)?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("points");

    let mut manifest = Vec::new();
    for (name, augmentation) in standard_variants(seed) {
        let augmented = augmentation.apply(&points)?;
        let path = output_dir.join(format!("{}_{}.ply", stem, name));
        write_ply(&path, &augmented.points)?;
        info!(variant = %name, points = augmented.points.len(), "Variant written");
        manifest.push(serde_json::json!({
            "name": name,
            "file": path,
            "description": augmented.description,
            "points": augmented.points.len(),
            "ground_truth": augmented.ground_truth,
            "parameters": augmentation.get_params(),
        }));
    }

    let manifest_path = output_dir.join(format!("{}_variants.json", stem));
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?).map_err(FitError::from)?;
    println!(
        "Wrote {} variants to {}",
        manifest.len(),
        output_dir.display()
    );
    Ok(EXIT_SUCCESS)
}

fn handle_serve(config: Config) -> anyhow::Result<u8> {
    if let Err(errors) = config.validate() {
        anyhow::bail!("invalid configuration: {}", errors.join("; "));
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(ApiServer::new(config).run())?;
    Ok(EXIT_SUCCESS)
}
