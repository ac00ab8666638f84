//! dose-compare - heterogeneous vs. homogeneous dose map comparison
//!
//! Loads the same named map from two dose files, then reports summaries,
//! bin-wise difference and ratio, a chi-square significance test, the row
//! and rectangle region analyses and lateral symmetry. When both files also
//! hold the total, primary and secondary scorer maps, the report adds the
//! primary/secondary fractions over radial bands. Writes a PNG with four
//! panels and a JSON report, and prints the text report.
//!
//! Module structure:
//! - `domain/` - Core types (DoseMap, Axis, TrackLineageTag, Region)
//! - `services/` - Scoring, lineage, comparison, significance
//! - `io/` - Dose files, step streams, report, rendering
//! - `infra/` - Config, errors, metrics

use anyhow::Context;
use clap::Parser;
use dose_hetero::infra::Config;
use dose_hetero::io::{render, CarrierSummary, ComparisonReport, DoseMapFile};
use dose_hetero::services::DoseComparisonEngine;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Compare dose maps with and without a heterogeneity
#[derive(Parser, Debug)]
#[command(name = "dose-compare", version, about)]
struct Args {
    /// Dose file simulated with the heterogeneity
    #[arg(long)]
    hetero: Option<String>,

    /// Reference dose file (homogeneous medium)
    #[arg(long)]
    homo: Option<String>,

    /// Name of the map inside both files
    #[arg(short, long)]
    map: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Directory for the PNG and JSON outputs
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Significance threshold for the chi-square p-value
    #[arg(long)]
    alpha: Option<f64>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!(error = %format!("{:#}", e), "dose_compare_failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::resolve_config_path(),
    };
    let mut config = Config::load_from_path(&config_path);
    if let Some(map) = &args.map {
        config = config.with_map_name(map.as_str());
    }
    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(dir.as_str());
    }
    if let Some(alpha) = args.alpha {
        config = config.with_alpha(alpha);
    }
    let hetero_file = args.hetero.as_deref().unwrap_or(config.hetero_file()).to_string();
    let homo_file = args.homo.as_deref().unwrap_or(config.homo_file()).to_string();
    let config = config.with_input_files(&hetero_file, &homo_file);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        config_file = %config.config_file(),
        hetero = %hetero_file,
        homo = %homo_file,
        map = %config.map_name(),
        alpha = config.alpha(),
        "dose_compare_starting"
    );

    // Both inputs must load before any output is produced
    let hetero_set = DoseMapFile::read(&hetero_file)
        .with_context(|| format!("reading heterogeneous dose file {}", hetero_file))?;
    let homo_set = DoseMapFile::read(&homo_file)
        .with_context(|| format!("reading homogeneous dose file {}", homo_file))?;
    let hetero = hetero_set
        .require(config.map_name())
        .with_context(|| format!("loading heterogeneous map from {}", hetero_file))?;
    let homo = homo_set
        .require(config.map_name())
        .with_context(|| format!("loading homogeneous map from {}", homo_file))?;

    let version = format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));
    let report = ComparisonReport::compute(&config, hetero, homo, &version)?
        .with_carriers(CarrierSummary::compute(&config, &hetero_set, &homo_set)?);

    let engine = DoseComparisonEngine::new();
    let diff = engine.difference(hetero, homo)?;
    let ratio = engine.ratio(hetero, homo)?;

    let out_dir = Path::new(config.output_dir());
    report.write_outputs(
        &out_dir.join(config.output_report()),
        &out_dir.join(config.output_image()),
        |path| render::render_comparison(hetero, homo, &diff, &ratio, path),
    )?;

    println!("{}", report.to_text());
    info!(
        p_value = report.significance.chi_square.p_value,
        verdict = report.significance.verdict.as_str(),
        row_percent_change = report.row.percent_change,
        "dose_compare_finished"
    );
    Ok(())
}
