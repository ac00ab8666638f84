//! dose-score - replay a recorded step stream through the scoring meshes
//!
//! Reads JSONL step records, classifies every track by lineage, scores
//! deposits into the configured scorers (with primary/secondary carrier
//! filters attached at start) and writes one dose file holding a map per
//! scorer.
//!
//! Usage:
//!   dose-score --steps run.jsonl --output dose_hetero.json [--config config/dose.toml]

use anyhow::Context;
use clap::Parser;
use dose_hetero::infra::{Config, ScoringMetrics};
use dose_hetero::io::{read_steps, DoseMapFile};
use dose_hetero::services::{configure_dose_filters, LineageTracker, MeshRegistry, ScoringMesh};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Score a recorded step stream into dose maps
#[derive(Parser, Debug)]
#[command(name = "dose-score", version, about)]
struct Args {
    /// JSONL file with one step record per line
    #[arg(short, long)]
    steps: String,

    /// Dose file to write
    #[arg(short, long, default_value = "dose_scored.json")]
    output: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
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
        error!(error = %format!("{:#}", e), "dose_score_failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config_path = args.config.clone().unwrap_or_else(Config::resolve_config_path);
    let config = Config::load_from_path(&config_path);

    let (x, y) = config.scoring_axes().context("invalid [scoring] geometry")?;
    let mut mesh = ScoringMesh::new(config.scoring_mesh(), x, y);
    for scorer in config.scorers() {
        mesh.add_scorer(scorer);
    }
    let mut registry = MeshRegistry::new();
    registry.register(mesh);

    let attached = configure_dose_filters(&mut registry);
    if attached == 0 {
        warn!(scorers = ?config.scorers(), "no_carrier_filters_attached");
    }

    let steps = read_steps(&args.steps).with_context(|| format!("reading steps from {}", args.steps))?;
    info!(
        git_hash = env!("GIT_HASH"),
        steps = steps.len(),
        mesh = %config.scoring_mesh(),
        filters = attached,
        "dose_score_starting"
    );

    let metrics = Arc::new(ScoringMetrics::new());
    let mut tracker = LineageTracker::new(Arc::clone(&metrics));
    for step in &steps {
        tracker.on_step(step, &mut registry);
    }
    tracker.end_event();

    let mut file = DoseMapFile::new();
    for map in registry.into_maps() {
        file.insert(map);
    }
    file.write(&args.output).with_context(|| format!("writing {}", args.output))?;

    metrics.report().log();
    Ok(())
}
