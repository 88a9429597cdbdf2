use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use sift_engine::{Pipeline, PipelineOptions, ReplayExecutor, format_error};
use sift_registry::{SchemaRegistry, SiftConfig, read_document};
use sift_types::{ClientRequest, RawValue, Response};
use tracing::{Level, info};

/// Developer tooling for Sift schema manifests and requests.
#[derive(Debug, Parser)]
#[command(name = "sift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and validate manifests, then print a summary.
    Check {
        /// Manifest files; defaults to the manifests named in the config file.
        manifests: Vec<PathBuf>,
    },
    /// Print the fetch plan and extraction template compiled for a request.
    Plan {
        #[arg(long = "manifest")]
        manifests: Vec<PathBuf>,
        /// Client request as JSON or YAML.
        #[arg(long)]
        request: PathBuf,
    },
    /// Run a request against a recorded raw result and print the response.
    Replay {
        #[arg(long = "manifest")]
        manifests: Vec<PathBuf>,
        #[arg(long)]
        request: PathBuf,
        /// Recorded executor output, e.g. `{"kind": "record", "value": {...}}`.
        #[arg(long)]
        result: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config = SiftConfig::load();

    match cli.command {
        Command::Check { manifests } => check(&config, &manifests),
        Command::Plan { manifests, request } => plan(&config, &manifests, &request),
        Command::Replay {
            manifests,
            request,
            result,
        } => replay(&config, &manifests, &request, &result).await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .try_init();
}

fn check(config: &SiftConfig, manifests: &[PathBuf]) -> Result<ExitCode> {
    let registry = load_registry(config, manifests)?;
    let resources = registry.schemas().filter(|schema| registry.is_resource(&schema.name)).count();
    let types = registry.schemas().count() - resources;
    println!("{resources} resources, {types} embedded types, {} actions", registry.actions().count());
    for action in registry.actions() {
        println!("  {} ({})", action.name, action.resource);
    }
    Ok(ExitCode::SUCCESS)
}

fn plan(config: &SiftConfig, manifests: &[PathBuf], request_path: &Path) -> Result<ExitCode> {
    let pipeline = build_pipeline(config, manifests, RawValue::Empty)?;
    let request: ClientRequest = read_document(request_path)?;
    match pipeline.parse_request(&request) {
        Ok(parsed) => {
            let output = json!({
                "action": parsed.action.name,
                "plan": parsed.compiled.plan,
                "template": parsed.compiled.template,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => print_response(&format_error(&error)),
    }
}

async fn replay(config: &SiftConfig, manifests: &[PathBuf], request_path: &Path, result_path: &Path) -> Result<ExitCode> {
    let raw: RawValue = read_document(result_path)?;
    let pipeline = build_pipeline(config, manifests, raw)?;
    let request: ClientRequest = read_document(request_path)?;
    let response = pipeline.run(&request).await;
    print_response(&response)
}

fn load_registry(config: &SiftConfig, manifests: &[PathBuf]) -> Result<SchemaRegistry> {
    let manifests = if manifests.is_empty() { config.manifests.as_slice() } else { manifests };
    if manifests.is_empty() {
        anyhow::bail!("no manifests given and none configured in {}", sift_registry::default_config_path().display());
    }
    let registry = SchemaRegistry::from_manifest_files(manifests, config.output_naming)?;
    info!(manifests = manifests.len(), "manifests validated");
    Ok(registry)
}

fn build_pipeline(config: &SiftConfig, manifests: &[PathBuf], raw: RawValue) -> Result<Pipeline> {
    let registry = load_registry(config, manifests)?;
    Ok(Pipeline::with_options(
        Arc::new(registry),
        Arc::new(ReplayExecutor::returning(raw)),
        PipelineOptions::from(config),
    ))
}

fn print_response(response: &Response) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(if response.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
