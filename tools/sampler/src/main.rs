/// Raster sampling tool: draws a bounded random sample from one raster and
/// prints its statistics as JSON.
///
/// Useful for checking what a classification will see before running it:
/// the sample is taken exactly as the classifier takes it (no-data and
/// non-finite cells dropped, at most `--max-samples` values).
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ramp_core::sampler::sample;
use ramp_core::statistics::{quantile, sorted};
use ramp_core::{Grid, RasterSource, Statistics};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sampler", about = "Sample a raster and print value statistics as JSON")]
struct Args {
    /// Raster file (.json grid or .tif/.tiff)
    input: PathBuf,

    /// Upper bound on sampled values
    #[arg(long, default_value = "10000")]
    max_samples: usize,

    /// No-data sentinel, overriding the raster's own
    #[arg(long)]
    nodata: Option<f64>,

    /// Seed for reproducible sampling of large rasters
    #[arg(long)]
    seed: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

// ── Output ───────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
struct SampleReport {
    input: String,
    total_values: usize,
    max_samples: usize,
    sampled: usize,
    statistics: Statistics,
    /// Quartiles of the sample; absent when nothing was sampled.
    quartiles: Option<[f64; 3]>,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn load_raster(path: &Path, nodata: Option<f64>) -> Result<Grid> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mut grid = match ext.as_str() {
        "json" => Grid::read_json(path)?,
        "tif" | "tiff" => Grid::read_geotiff(path, nodata)?,
        _ => bail!("Unsupported raster format: {}", path.display()),
    };
    if let Some(nd) = nodata {
        grid = grid.with_no_data(nd);
    }
    Ok(grid)
}

fn sample_report(path: &Path, grid: &Grid, max_samples: usize) -> Result<SampleReport> {
    let values = sample(grid, max_samples, grid.no_data_value())?;
    let statistics = Statistics::calculate(&values);
    let ordered = sorted(&values);
    let quartiles = match (quantile(&ordered, 0.25), quantile(&ordered, 0.5), quantile(&ordered, 0.75)) {
        (Some(q1), Some(q2), Some(q3)) => Some([q1, q2, q3]),
        _ => None,
    };
    Ok(SampleReport {
        input: path.display().to_string(),
        total_values: grid.total_value_count(),
        max_samples,
        sampled: values.len(),
        statistics,
        quartiles,
    })
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose)?;

    if args.max_samples == 0 {
        bail!("--max-samples must be positive");
    }

    let mut grid = load_raster(&args.input, args.nodata)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;
    if let Some(seed) = args.seed {
        grid = grid.with_seed(seed);
    }
    info!(input = %args.input.display(), width = grid.width(), height = grid.height(), "loaded raster");

    let report = sample_report(&args.input, &grid, args.max_samples)?;
    info!(sampled = report.sampled, "sampling done");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
