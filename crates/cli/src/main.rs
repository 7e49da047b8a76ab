//! pitscan CLI - illegal excavation compliance analysis

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pitscan_algorithms::{analyze, open_dem, AnalysisError, AnalysisReport};
use pitscan_core::io::read_polygons;
use pitscan_core::{PolygonSet, CRS};

use crate::config::Overrides;

/// Exit status when the analysis itself fails (the failure JSON is still written)
const ANALYSIS_FAILED: u8 = 2;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pitscan")]
#[command(author, version, about = "Illegal excavation detection and volume estimation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a DEM
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Classify detected footprints against authorized boundaries and estimate volumes
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Authorized lease boundaries (GeoJSON or Shapefile)
    #[arg(short, long)]
    authorized: PathBuf,
    /// Detected excavation footprints (GeoJSON or Shapefile)
    #[arg(short, long)]
    detected: PathBuf,
    /// Post-excavation DEM (GeoTIFF)
    #[arg(long)]
    dem: PathBuf,
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Equal-area CRS for overlay and areas, e.g. EPSG:6933
    #[arg(long)]
    area_crs: Option<CRS>,
    /// Reference-surface buffer distance in DEM units
    #[arg(short, long)]
    buffer_distance: Option<f64>,
    /// Declare the CRS of the authorized file (no reprojection)
    #[arg(long)]
    authorized_crs: Option<CRS>,
    /// Declare the CRS of the detected file (no reprojection)
    #[arg(long)]
    detected_crs: Option<CRS>,
    /// Worker threads for volume estimation (1 = sequential)
    #[arg(short, long)]
    threads: Option<usize>,
    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("logging disabled: {}", e);
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_layer(path: &Path, label: &str, declared: Option<CRS>) -> Result<PolygonSet> {
    let pb = spinner(&format!("Reading {} polygons...", label));
    let set = read_polygons(path)
        .with_context(|| format!("Failed to read {} polygons from {}", label, path.display()))?;
    pb.finish_and_clear();

    let set = match declared {
        Some(crs) => set.with_crs(Some(crs)),
        None => set,
    };
    info!(
        "{}: {} feature(s), CRS {}",
        label,
        set.len(),
        set.crs.as_ref().map_or("unknown".to_string(), |c| c.identifier())
    );
    Ok(set)
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

/// Outer error: the CLI could not run. Inner error: the analysis failed and gets a failure report.
fn run_analysis(
    args: &AnalyzeArgs,
    authorized: &PolygonSet,
    detected: &PolygonSet,
) -> Result<std::result::Result<AnalysisReport, AnalysisError>> {
    let config = config::resolve(
        args.config.as_deref(),
        Overrides {
            area_crs: args.area_crs.clone(),
            buffer_distance: args.buffer_distance,
            threads: args.threads,
        },
    )?;

    let pb = spinner("Reading DEM...");
    let dem = open_dem(&args.dem);
    pb.finish_and_clear();
    let dem = match dem {
        Ok(dem) => dem,
        Err(e) => return Ok(Err(e)),
    };

    let pb = spinner("Analyzing...");
    let result = analyze(authorized, detected, &dem, &config);
    pb.finish_and_clear();
    Ok(result)
}

fn print_info(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...");
    let raster = open_dem(input).context("Failed to read raster")?;
    pb.finish_and_clear();

    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();
    let transform = raster.transform();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!(
        "Cell size: {} x {}",
        transform.pixel_width,
        transform.pixel_height.abs()
    );
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    match raster.crs() {
        Some(crs) => println!("CRS: {}", crs),
        None => println!("CRS: unknown"),
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / raster.len() as f64
    );
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => {
            print_info(&input)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Analyze(args) => {
            let start = Instant::now();
            let authorized =
                read_layer(&args.authorized, "authorized", args.authorized_crs.clone())?;
            let detected = read_layer(&args.detected, "detected", args.detected_crs.clone())?;

            match run_analysis(&args, &authorized, &detected)? {
                Ok(report) => {
                    write_json(&report, args.output.as_deref())?;
                    info!(
                        "{} illegal site(s), {:.1} m³ in {:.2?}",
                        report.summary.illegal_operations_count,
                        report.summary.illegal_mining_volume_m3,
                        start.elapsed()
                    );
                    if let Some(path) = &args.output {
                        println!("Report saved to: {}", path.display());
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    write_json(&e.to_failure(), args.output.as_deref())?;
                    Ok(ExitCode::from(ANALYSIS_FAILED))
                }
            }
        }
    }
}
