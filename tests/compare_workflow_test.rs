//! End-to-end comparison and scoring workflows on temporary files

use dose_hetero::domain::{Axis, DoseMap, DoseMapBuilder, ParticleKind, Region, StepRecord, TrackId};
use dose_hetero::infra::{Config, DoseError, ScoringMetrics};
use dose_hetero::io::{load_map, render, CarrierSummary, ComparisonReport, DoseMapFile};
use dose_hetero::services::{
    configure_dose_filters, DoseComparisonEngine, LineageTracker, MeshRegistry, ScoringMesh,
    Verdict,
};
use std::sync::Arc;
use tempfile::tempdir;

fn uniform(name: &str, value: f64) -> DoseMap {
    let x = Axis::new(300, -150.0, 150.0).unwrap();
    let y = Axis::new(300, -150.0, 150.0).unwrap();
    let mut b = DoseMapBuilder::new(name, x, y);
    for by in 0..300 {
        for bx in 0..300 {
            b.fill_bin(bx, by, value).unwrap();
        }
    }
    b.build()
}

fn write_single(path: &std::path::Path, map: DoseMap) {
    let mut file = DoseMapFile::new();
    file.insert(map);
    file.write(path).unwrap();
}

#[test]
fn test_region_percent_change_from_files() {
    let dir = tempdir().unwrap();
    let hetero_path = dir.path().join("hetero.json");
    let homo_path = dir.path().join("homo.json");
    write_single(&hetero_path, uniform("h20", 1.2));
    write_single(&homo_path, uniform("h20", 1.0));

    let hetero = load_map(&hetero_path, "h20").unwrap();
    let homo = load_map(&homo_path, "h20").unwrap();

    let engine = DoseComparisonEngine::new();
    let row = Region::row(40.0, -30.0, 30.0);
    let (sum_a, sum_b) = engine.region_sums(&hetero, &homo, &row).unwrap();
    assert!((sum_a - 73.2).abs() < 1e-9);
    assert!((sum_b - 61.0).abs() < 1e-9);
    assert!((engine.percent_change(&hetero, &homo, &row).unwrap() - 20.0).abs() < 1e-9);

    let ratio = engine.ratio(&hetero, &homo).unwrap();
    assert!(ratio.values().iter().all(|r| (r - 1.2).abs() < 1e-12));
}

#[test]
fn test_report_and_image_written() {
    let dir = tempdir().unwrap();
    let config = Config::default().with_output_dir(dir.path().display().to_string());
    let hetero = uniform("h20", 1.1);
    let homo = uniform("h20", 1.0);

    let report = ComparisonReport::compute(&config, &hetero, &homo, "test").unwrap();
    assert_eq!(report.significance.verdict, Verdict::NotSignificant);

    let engine = DoseComparisonEngine::new();
    let diff = engine.difference(&hetero, &homo).unwrap();
    let ratio = engine.ratio(&hetero, &homo).unwrap();
    let out = std::path::Path::new(config.output_dir());
    report
        .write_outputs(&out.join(config.output_report()), &out.join(config.output_image()), |path| {
            render::render_comparison(&hetero, &homo, &diff, &ratio, path)
        })
        .unwrap();

    assert!(out.join("heterogeneity_comparison.png").exists());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("heterogeneity_report.json")).unwrap())
            .unwrap();
    assert_eq!(json["geometry"], "h20: x[300; -150, 150) y[300; -150, 150)");
}

#[test]
fn test_missing_inputs_are_input_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dose.json");
    write_single(&path, uniform("h10", 1.0));

    let missing_map = load_map(&path, "h20").unwrap_err();
    assert!(matches!(missing_map, DoseError::MapNotFound { .. }));
    assert_eq!(missing_map.category(), "InputError");

    let missing_file = load_map(dir.path().join("nope.json"), "h20").unwrap_err();
    assert_eq!(missing_file.category(), "InputError");
    assert!(missing_file.is_fatal());
}

#[test]
fn test_mismatched_geometry_rejected() {
    let a = uniform("h20", 1.0);
    let x = Axis::new(10, 0.0, 10.0).unwrap();
    let b = DoseMapBuilder::new("h20", x, x).build();
    let engine = DoseComparisonEngine::new();
    let err = engine.difference(&a, &b).unwrap_err();
    assert_eq!(err.category(), "ShapeMismatchError");
}

fn step(event: u64, track: i64, parent: i64, particle: ParticleKind, x: f64, edep: f64, last: bool) -> StepRecord {
    StepRecord {
        event_id: event,
        track_id: TrackId(track),
        parent_id: TrackId(parent),
        particle,
        creator_process: String::new(),
        x_mm: x,
        y_mm: 0.5,
        edep,
        last,
    }
}

#[test]
fn test_scoring_replay_splits_primary_and_secondary() {
    let x = Axis::new(10, -5.0, 5.0).unwrap();
    let mut registry = MeshRegistry::new();
    registry.register(
        ScoringMesh::new("doseMesh", x, x)
            .with_scorer("eDep")
            .with_scorer("eDepPrimary")
            .with_scorer("eDepSecondary"),
    );
    assert_eq!(configure_dose_filters(&mut registry), 2);

    let metrics = Arc::new(ScoringMetrics::new());
    let mut tracker = LineageTracker::new(Arc::clone(&metrics));
    let steps = [
        // source photon, no deposit
        step(1, 1, 0, ParticleKind::Photon, 0.0, 0.0, true),
        // photoelectron: primary carrier
        step(1, 2, 1, ParticleKind::Electron, 1.0, 3.0, false),
        step(1, 2, 1, ParticleKind::Electron, 1.0, 1.0, true),
        // delta ray from the electron: secondary
        step(1, 3, 2, ParticleKind::Electron, -2.0, 0.5, true),
        // next event: orphan electron, secondary
        step(2, 7, 4, ParticleKind::Electron, 3.0, 2.0, true),
    ];
    for s in &steps {
        tracker.on_step(s, &mut registry);
    }
    tracker.end_event();

    let maps = registry.into_maps();
    let by_name = |n: &str| maps.iter().find(|m| m.name() == n).unwrap().integral();
    assert_eq!(by_name("eDep"), 6.5);
    assert_eq!(by_name("eDepPrimary"), 4.0);
    assert_eq!(by_name("eDepSecondary"), 2.5);
    assert_eq!(by_name("eDepPrimary") + by_name("eDepSecondary"), by_name("eDep"));

    let summary = metrics.report();
    assert_eq!(summary.steps_total, 5);
    assert_eq!(summary.orphan_tracks_total, 1);

    // scored file round-trips into a closed primary/secondary breakdown
    let dir = tempdir().unwrap();
    let path = dir.path().join("scored.json");
    let mut file = DoseMapFile::new();
    for map in maps {
        file.insert(map);
    }
    file.write(&path).unwrap();
    let scored = DoseMapFile::read(&path).unwrap();

    let carriers = CarrierSummary::compute(&Config::default(), &scored, &scored).unwrap().unwrap();
    assert!(carriers.hetero.closed);
    assert!((carriers.hetero.overall.primary_pct - 100.0 * 4.0 / 6.5).abs() < 1e-9);
    // every deposit lands in the [1, 5) band around the origin
    let inner = &carriers.hetero.bands[1];
    assert_eq!(inner.band.unwrap().r_min, 1.0);
    assert_eq!(inner.total, 6.5);
}
