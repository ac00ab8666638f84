//! Integration tests for configuration loading

use dose_hetero::domain::Region;
use dose_hetero::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[inputs]
hetero_file = "runs/lung.json"
homo_file = "runs/water.json"
map_name = "h10"

[region]
row_y_mm = 25.0
x_min_mm = -20.0
x_max_mm = 20.0
y_min_mm = 0.0
y_max_mm = 50.0

[significance]
alpha = 0.01

[output]
dir = "out"

[voxel]
z_mm = 5.0

[materials]
hetero_material = "lung"

[scoring]
x_bins = 100
x_min_mm = -50.0
x_max_mm = 50.0
scorers = ["eDep", "eDepPrimary"]
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.hetero_file(), "runs/lung.json");
    assert_eq!(config.map_name(), "h10");
    assert_eq!(config.region(), Region::new(-20.0, 20.0, 0.0, 50.0));
    assert_eq!(config.row_y_mm(), 25.0);
    assert_eq!(config.alpha(), 0.01);
    assert_eq!(config.output_dir(), "out");
    // unspecified keys keep their defaults
    assert_eq!(config.output_image(), "heterogeneity_comparison.png");
    assert_eq!(config.voxel().x_mm, 1.0);
    assert_eq!(config.voxel().z_mm, 5.0);
    assert_eq!(config.hetero_conversion().unwrap().density_g_cm3, 0.26);
    assert_eq!(config.scorers(), &["eDep", "eDepPrimary"]);

    let (x, y) = config.scoring_axes().unwrap();
    assert_eq!(x.bins, 100);
    assert_eq!(y.bins, 300);
}

#[test]
fn test_unknown_material_is_configuration_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[materials]\nhetero_material = \"titanium\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    let err = config.hetero_conversion().unwrap_err();
    assert_eq!(err.category(), "ConfigurationError");
    assert!(!err.is_fatal());
}

#[test]
fn test_invalid_scoring_geometry() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[scoring]\nx_bins = 0\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert!(config.scoring_axes().is_err());
}

#[test]
fn test_malformed_file_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[region\nrow_y_mm = ").unwrap();
    temp_file.flush().unwrap();
    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.map_name(), "h20");
    assert_eq!(config.alpha(), 0.05);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_shipped_config_parses() {
    let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/dose.toml")).unwrap();
    assert_eq!(config.region(), Region::new(-30.0, 30.0, 10.0, 70.0));
    assert_eq!(config.densities().len(), 3);
    assert_eq!(config.carrier_bands().unwrap().len(), 7);
    assert_eq!(config.total_map(), "eDep");
    assert_eq!(config.closure_tolerance(), 1e-6);
}
