//! cloudpick - write the displayed part of each source cloud to disk.
//!
//! The displayed geometry is read from a point cloud file; every display
//! name of the form `<path>.<ext><suffix>` is treated as a source cloud and
//! filtered down to the points that correspond to the displayed geometry.

use anyhow::{Context, Result};
use clap::Parser;
use cloudpick_export::{ExportConfig, ExportSummary, Exporter, FileStore, SourceReference};
use cloudpick_io::Encoding;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cloudpick")]
#[command(about = "Export the displayed subset of source point clouds", long_about = None)]
struct Cli {
    /// Point cloud file (.pcd or .ply) holding the displayed geometry
    #[arg(short, long)]
    displayed: PathBuf,

    /// Prefix of the output files; outputs are named <PREFIX><n>.<ext>
    #[arg(short, long)]
    output_prefix: String,

    /// Merge displayed points closer than this distance (default: 0)
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Extension marking a display name as a source file (default: pcd)
    #[arg(short, long)]
    extension: Option<String>,

    /// Write outputs as ASCII instead of binary
    #[arg(long)]
    ascii: bool,

    /// JSON file with export settings; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Display names of the shown clouds
    #[arg(required = true)]
    names: Vec<String>,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_config(path: &Path) -> Result<ExportConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn resolve_config(cli: &Cli) -> Result<ExportConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ExportConfig::default(),
    };
    if let Some(tolerance) = cli.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(extension) = &cli.extension {
        config.extension = extension.trim_start_matches('.').to_string();
    }
    if cli.ascii {
        config.encoding = Encoding::Ascii;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<ExportSummary> {
    let config = resolve_config(cli)?;
    let displayed = cloudpick_io::load(&cli.displayed)
        .with_context(|| format!("failed to load displayed geometry {}", cli.displayed.display()))?;
    tracing::debug!(points = displayed.len(), "displayed geometry loaded");

    let sources = SourceReference::from_names(cli.names.iter().cloned(), &config.extension);
    let summary = Exporter::new(FileStore)
        .with_config(config)
        .run(&displayed, &sources, &cli.output_prefix)?;
    Ok(summary)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            for file in &summary.outputs {
                println!(
                    "{} -> {} ({} of {} points)",
                    file.source.display(),
                    file.output.display(),
                    file.matched,
                    file.source_points
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
