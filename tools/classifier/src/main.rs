/// Raster classification tool: samples each input raster, computes breaks and
/// writes one JSON report of colored categories per raster.
///
/// Inputs are grid JSON documents (`.json`) or single-band GeoTIFFs
/// (`.tif` / `.tiff`). Rasters are independent, so they are classified in
/// parallel, each with its own scheme.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ramp_core::classify::domain;
use ramp_core::palette::PaletteName;
use ramp_core::{Category, EditorSettings, Grid, IntervalMethod, Scheme, Statistics};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "classifier", about = "Classify rasters into colored value categories")]
struct Args {
    /// Raster files (.json grids or .tif/.tiff)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Editor settings JSON; flags below override its values
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Palette name, e.g. SummerMountains, Glaciers, DeadSea
    #[arg(long)]
    palette: Option<String>,

    /// Number of intervals
    #[arg(long)]
    breaks: Option<usize>,

    /// Break algorithm
    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Split the value range at its midpoint instead of computing breaks
    #[arg(long)]
    two_bucket: bool,

    /// Category opacity in [0, 1]
    #[arg(long, default_value = "1.0")]
    opacity: f64,

    /// No-data sentinel, overriding the raster's own
    #[arg(long)]
    nodata: Option<f64>,

    /// Directory for `<stem>.classes.json` reports; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Method {
    EqualInterval,
    Quantile,
    StandardDeviation,
}

impl From<Method> for IntervalMethod {
    fn from(m: Method) -> Self {
        match m {
            Method::EqualInterval => IntervalMethod::EqualInterval,
            Method::Quantile => IntervalMethod::Quantile,
            Method::StandardDeviation => IntervalMethod::StandardDeviation,
        }
    }
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report {
    input: String,
    palette: String,
    method: &'static str,
    statistics: Statistics,
    categories: Vec<CategoryReport>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CategoryReport {
    Color {
        min: f64,
        max: f64,
        min_inclusive: bool,
        max_inclusive: bool,
        low_color: [u8; 4],
        high_color: [u8; 4],
        legend: String,
    },
    NoData {
        value: Option<f64>,
        color: [u8; 4],
        legend: String,
    },
}

impl From<&Category> for CategoryReport {
    fn from(cat: &Category) -> Self {
        match cat {
            Category::Color(c) => CategoryReport::Color {
                min: c.range.min(),
                max: c.range.max(),
                min_inclusive: c.range.min_inclusive(),
                max_inclusive: c.range.max_inclusive(),
                low_color: [c.low_color.r, c.low_color.g, c.low_color.b, c.low_color.a],
                high_color: [c.high_color.r, c.high_color.g, c.high_color.b, c.high_color.a],
                legend: c.legend_text.clone(),
            },
            // NaN has no JSON form.
            Category::NoData(n) => CategoryReport::NoData {
                value: n.value.is_finite().then_some(n.value),
                color: [n.color.r, n.color.g, n.color.b, n.color.a],
                legend: n.legend_text.clone(),
            },
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

/// Start from the settings file (or defaults) and apply flag overrides.
fn build_settings(args: &Args) -> Result<EditorSettings> {
    let mut settings = match &args.settings {
        Some(path) => EditorSettings::read_json(path)
            .with_context(|| format!("Cannot load settings {}", path.display()))?,
        None => EditorSettings::default(),
    };
    if let Some(p) = &args.palette {
        settings.palette = p.clone();
    }
    if let Some(n) = args.breaks {
        settings.break_count = n;
    }
    if let Some(m) = args.method {
        settings.interval_method = m.into();
    }
    settings.validate().context("Invalid settings")?;

    if settings.palette.parse::<PaletteName>().is_err() {
        warn!(palette = %settings.palette, "unknown palette, categories will be transparent");
    }
    Ok(settings)
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

fn classify_one(path: &Path, args: &Args, settings: &EditorSettings) -> Result<Report> {
    let grid = load_raster(path, args.nodata).with_context(|| format!("Cannot read {}", path.display()))?;

    let mut scheme = Scheme::new(settings.clone());
    scheme.set_opacity(args.opacity);

    let statistics = scheme.classify_raster(&grid)?;
    let method = if args.two_bucket {
        // Without values there is nothing to split; the no-data category stays.
        if let Some(s) = statistics.summary() {
            let (min, max) = domain(&grid, s);
            scheme.apply_scheme(&settings.palette, min, max)?;
        }
        "two_bucket"
    } else {
        settings.interval_method.strategy().name()
    };

    info!(input = %path.display(), categories = scheme.categories().len(), method, "classified");
    Ok(Report {
        input: path.display().to_string(),
        palette: settings.palette.clone(),
        method,
        statistics,
        categories: scheme.categories().iter().map(CategoryReport::from).collect(),
    })
}

fn report_path(out_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster".to_string());
    out_dir.join(format!("{stem}.classes.json"))
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose)?;

    if !(0.0..=1.0).contains(&args.opacity) {
        bail!("--opacity must be within [0, 1], got {}", args.opacity);
    }
    if args.two_bucket && (args.breaks.is_some() || args.method.is_some()) {
        bail!("--two-bucket cannot be combined with --breaks or --method");
    }
    let settings = build_settings(&args)?;

    if let Some(dir) = &args.output {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    }

    info!(rasters = args.inputs.len(), "classifying");
    let results: Vec<(&PathBuf, Result<Report>)> = args
        .inputs
        .par_iter()
        .map(|path| (path, classify_one(path, &args, &settings)))
        .collect();

    let mut failed = 0usize;
    for (path, res) in results {
        let report = match res {
            Ok(r) => r,
            Err(e) => {
                warn!(input = %path.display(), "{e:#}");
                failed += 1;
                continue;
            }
        };
        let json = serde_json::to_string_pretty(&report)?;
        match &args.output {
            Some(dir) => {
                let out = report_path(dir, path);
                fs::write(&out, json).with_context(|| format!("Cannot write {}", out.display()))?;
                info!(report = %out.display(), "written");
            }
            None => println!("{json}"),
        }
    }

    if failed > 0 {
        bail!("{failed} of {} rasters failed", args.inputs.len());
    }
    Ok(())
}
