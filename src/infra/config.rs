//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> (parsed by each binary)
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dose.toml

use crate::domain::dose_map::Axis;
use crate::domain::region::{RadialBand, Region};
use crate::infra::error::DoseResult;
use crate::services::conversion::{material_density, DoseConversion, VoxelSize};
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/dose.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    #[serde(default = "default_hetero_file")]
    pub hetero_file: String,
    #[serde(default = "default_homo_file")]
    pub homo_file: String,
    #[serde(default = "default_map_name")]
    pub map_name: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            hetero_file: default_hetero_file(),
            homo_file: default_homo_file(),
            map_name: default_map_name(),
        }
    }
}

fn default_hetero_file() -> String {
    "dose_hetero.json".to_string()
}

fn default_homo_file() -> String {
    "dose_homo.json".to_string()
}

fn default_map_name() -> String {
    "h20".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    #[serde(default = "default_row_y")]
    pub row_y_mm: f64,
    #[serde(default = "default_x_min")]
    pub x_min_mm: f64,
    #[serde(default = "default_x_max")]
    pub x_max_mm: f64,
    #[serde(default = "default_y_min")]
    pub y_min_mm: f64,
    #[serde(default = "default_y_max")]
    pub y_max_mm: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            row_y_mm: default_row_y(),
            x_min_mm: default_x_min(),
            x_max_mm: default_x_max(),
            y_min_mm: default_y_min(),
            y_max_mm: default_y_max(),
        }
    }
}

fn default_row_y() -> f64 {
    40.0
}

fn default_x_min() -> f64 {
    -30.0
}

fn default_x_max() -> f64 {
    30.0
}

fn default_y_min() -> f64 {
    10.0
}

fn default_y_max() -> f64 {
    70.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignificanceConfig {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Asymmetry ratio above which a lateral profile is flagged
    #[serde(default = "default_asymmetry_threshold")]
    pub asymmetry_threshold: f64,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self { alpha: default_alpha(), asymmetry_threshold: default_asymmetry_threshold() }
    }
}

fn default_alpha() -> f64 {
    0.05
}

fn default_asymmetry_threshold() -> f64 {
    0.15
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_report")]
    pub report: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir(), image: default_image(), report: default_report() }
    }
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_image() -> String {
    "heterogeneity_comparison.png".to_string()
}

fn default_report() -> String {
    "heterogeneity_report.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoxelConfig {
    #[serde(default = "default_voxel_xy")]
    pub x_mm: f64,
    #[serde(default = "default_voxel_xy")]
    pub y_mm: f64,
    #[serde(default = "default_voxel_z")]
    pub z_mm: f64,
}

impl Default for VoxelConfig {
    fn default() -> Self {
        Self { x_mm: default_voxel_xy(), y_mm: default_voxel_xy(), z_mm: default_voxel_z() }
    }
}

fn default_voxel_xy() -> f64 {
    1.0
}

fn default_voxel_z() -> f64 {
    10.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialsConfig {
    /// Material name -> density in g/cm3
    #[serde(default = "default_densities")]
    pub densities: BTreeMap<String, f64>,
    #[serde(default = "default_hetero_material")]
    pub hetero_material: String,
    #[serde(default = "default_homo_material")]
    pub homo_material: String,
}

impl Default for MaterialsConfig {
    fn default() -> Self {
        Self {
            densities: default_densities(),
            hetero_material: default_hetero_material(),
            homo_material: default_homo_material(),
        }
    }
}

fn default_densities() -> BTreeMap<String, f64> {
    let mut densities = BTreeMap::new();
    densities.insert("water".to_string(), 1.0);
    densities.insert("bone".to_string(), 1.92);
    densities.insert("lung".to_string(), 0.26);
    densities
}

fn default_hetero_material() -> String {
    "bone".to_string()
}

fn default_homo_material() -> String {
    "water".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_scoring_bins")]
    pub x_bins: usize,
    #[serde(default = "default_scoring_min")]
    pub x_min_mm: f64,
    #[serde(default = "default_scoring_max")]
    pub x_max_mm: f64,
    #[serde(default = "default_scoring_bins")]
    pub y_bins: usize,
    #[serde(default = "default_scoring_min")]
    pub y_min_mm: f64,
    #[serde(default = "default_scoring_max")]
    pub y_max_mm: f64,
    #[serde(default = "default_mesh_name")]
    pub mesh: String,
    #[serde(default = "default_scorers")]
    pub scorers: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            x_bins: default_scoring_bins(),
            x_min_mm: default_scoring_min(),
            x_max_mm: default_scoring_max(),
            y_bins: default_scoring_bins(),
            y_min_mm: default_scoring_min(),
            y_max_mm: default_scoring_max(),
            mesh: default_mesh_name(),
            scorers: default_scorers(),
        }
    }
}

fn default_scoring_bins() -> usize {
    300
}

fn default_scoring_min() -> f64 {
    -150.0
}

fn default_scoring_max() -> f64 {
    150.0
}

fn default_mesh_name() -> String {
    "doseMesh".to_string()
}

fn default_scorers() -> Vec<String> {
    vec!["eDep".to_string(), "eDepPrimary".to_string(), "eDepSecondary".to_string()]
}

/// Primary/secondary breakdown over radial bands
#[derive(Debug, Clone, Deserialize)]
pub struct CarriersConfig {
    #[serde(default = "default_total_map")]
    pub total_map: String,
    #[serde(default = "default_primary_map")]
    pub primary_map: String,
    #[serde(default = "default_secondary_map")]
    pub secondary_map: String,
    #[serde(default)]
    pub source_x_mm: f64,
    #[serde(default)]
    pub source_y_mm: f64,
    /// `[r_min, r_max)` pairs in mm
    #[serde(default = "default_bands")]
    pub bands_mm: Vec<[f64; 2]>,
    /// Relative tolerance on primary + secondary = total
    #[serde(default = "default_closure_tolerance")]
    pub tolerance: f64,
}

impl Default for CarriersConfig {
    fn default() -> Self {
        Self {
            total_map: default_total_map(),
            primary_map: default_primary_map(),
            secondary_map: default_secondary_map(),
            source_x_mm: 0.0,
            source_y_mm: 0.0,
            bands_mm: default_bands(),
            tolerance: default_closure_tolerance(),
        }
    }
}

fn default_total_map() -> String {
    "eDep".to_string()
}

fn default_primary_map() -> String {
    "eDepPrimary".to_string()
}

fn default_secondary_map() -> String {
    "eDepSecondary".to_string()
}

fn default_bands() -> Vec<[f64; 2]> {
    vec![
        [0.0, 1.0],
        [1.0, 5.0],
        [5.0, 10.0],
        [10.0, 20.0],
        [20.0, 30.0],
        [30.0, 50.0],
        [50.0, 70.0],
    ]
}

fn default_closure_tolerance() -> f64 {
    1e-6
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub region: RegionConfig,
    #[serde(default)]
    pub significance: SignificanceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub voxel: VoxelConfig,
    #[serde(default)]
    pub materials: MaterialsConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub carriers: CarriersConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    config_file: String,
    hetero_file: String,
    homo_file: String,
    map_name: String,
    row_y_mm: f64,
    region: Region,
    alpha: f64,
    asymmetry_threshold: f64,
    output_dir: String,
    output_image: String,
    output_report: String,
    voxel: VoxelSize,
    densities: BTreeMap<String, f64>,
    hetero_material: String,
    homo_material: String,
    scoring: ScoringConfig,
    carriers: CarriersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        let r = toml_config.region;
        let v = toml_config.voxel;
        Self {
            config_file: config_file.to_string(),
            hetero_file: toml_config.inputs.hetero_file,
            homo_file: toml_config.inputs.homo_file,
            map_name: toml_config.inputs.map_name,
            row_y_mm: r.row_y_mm,
            region: Region::new(r.x_min_mm, r.x_max_mm, r.y_min_mm, r.y_max_mm),
            alpha: toml_config.significance.alpha,
            asymmetry_threshold: toml_config.significance.asymmetry_threshold,
            output_dir: toml_config.output.dir,
            output_image: toml_config.output.image,
            output_report: toml_config.output.report,
            voxel: VoxelSize { x_mm: v.x_mm, y_mm: v.y_mm, z_mm: v.z_mm },
            densities: toml_config.materials.densities,
            hetero_material: toml_config.materials.hetero_material,
            homo_material: toml_config.materials.homo_material,
            scoring: toml_config.scoring,
            carriers: toml_config.carriers,
        }
    }

    /// Config path when none is given on the command line
    pub fn resolve_config_path() -> String {
        env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load from a path, falling back to defaults with a warning
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path, error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    /// Converter for the heterogeneity material
    pub fn hetero_conversion(&self) -> DoseResult<DoseConversion> {
        Ok(DoseConversion::new(self.voxel, material_density(&self.densities, &self.hetero_material)?))
    }

    /// Converter for the surrounding medium
    pub fn homo_conversion(&self) -> DoseResult<DoseConversion> {
        Ok(DoseConversion::new(self.voxel, material_density(&self.densities, &self.homo_material)?))
    }

    /// Scoring mesh axes
    pub fn scoring_axes(&self) -> DoseResult<(Axis, Axis)> {
        let s = &self.scoring;
        Ok((Axis::new(s.x_bins, s.x_min_mm, s.x_max_mm)?, Axis::new(s.y_bins, s.y_min_mm, s.y_max_mm)?))
    }

    /// Radial bands for the primary/secondary breakdown
    pub fn carrier_bands(&self) -> DoseResult<Vec<RadialBand>> {
        self.carriers.bands_mm.iter().map(|[lo, hi]| RadialBand::new(*lo, *hi)).collect()
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn hetero_file(&self) -> &str {
        &self.hetero_file
    }

    pub fn homo_file(&self) -> &str {
        &self.homo_file
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn row_y_mm(&self) -> f64 {
        self.row_y_mm
    }

    /// Heterogeneity rectangle
    pub fn region(&self) -> Region {
        self.region
    }

    /// Row window at `row_y_mm` over the rectangle's X span
    pub fn row_region(&self) -> Region {
        Region::row(self.row_y_mm, self.region.x_min, self.region.x_max)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn asymmetry_threshold(&self) -> f64 {
        self.asymmetry_threshold
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn output_image(&self) -> &str {
        &self.output_image
    }

    pub fn output_report(&self) -> &str {
        &self.output_report
    }

    pub fn voxel(&self) -> VoxelSize {
        self.voxel
    }

    pub fn densities(&self) -> &BTreeMap<String, f64> {
        &self.densities
    }

    pub fn hetero_material(&self) -> &str {
        &self.hetero_material
    }

    pub fn homo_material(&self) -> &str {
        &self.homo_material
    }

    pub fn scoring_mesh(&self) -> &str {
        &self.scoring.mesh
    }

    pub fn scorers(&self) -> &[String] {
        &self.scoring.scorers
    }

    pub fn total_map(&self) -> &str {
        &self.carriers.total_map
    }

    pub fn primary_map(&self) -> &str {
        &self.carriers.primary_map
    }

    pub fn secondary_map(&self) -> &str {
        &self.carriers.secondary_map
    }

    /// Source position the bands are centred on
    pub fn source_center(&self) -> (f64, f64) {
        (self.carriers.source_x_mm, self.carriers.source_y_mm)
    }

    pub fn closure_tolerance(&self) -> f64 {
        self.carriers.tolerance
    }

    /// Builder method for overriding the significance threshold
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Builder method for overriding the output directory
    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method for overriding both input files
    pub fn with_input_files(mut self, hetero: &str, homo: &str) -> Self {
        self.hetero_file = hetero.to_string();
        self.homo_file = homo.to_string();
        self
    }

    /// Builder method for overriding the map name
    pub fn with_map_name(mut self, name: impl Into<String>) -> Self {
        self.map_name = name.into();
        self
    }
}
