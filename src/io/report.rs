//! Comparison report
//!
//! Built once from two loaded maps, then written as pretty JSON and
//! rendered as plain text for the terminal.

use crate::domain::dose_map::DoseMap;
use crate::domain::region::Region;
use crate::infra::config::Config;
use crate::infra::error::{DoseError, DoseResult};
use crate::io::dose_file::DoseMapFile;
use crate::services::aggregator::{CarrierBreakdown, CarrierMaps, RegionAggregator, WindowStats};
use crate::services::comparison::{DifferenceSummary, DoseComparisonEngine};
use crate::services::significance::{ChiSquareResult, SignificancePolicy, Verdict};
use crate::services::symmetry::{analyze_symmetry, SymmetryAnalysis};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub file: String,
    pub name: String,
    pub entries: u64,
    pub integral: f64,
    pub mean_x: f64,
    pub mean_y: f64,
    pub max: f64,
}

impl MapSummary {
    pub fn of(file: &str, map: &DoseMap) -> Self {
        Self {
            file: file.to_string(),
            name: map.name().to_string(),
            entries: map.entries(),
            integral: map.integral(),
            mean_x: map.mean_x(),
            mean_y: map.mean_y(),
            max: map.max_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignificanceSummary {
    #[serde(flatten)]
    pub chi_square: ChiSquareResult,
    pub alpha: f64,
    pub verdict: Verdict,
}

/// Sums of both maps over one region
#[derive(Debug, Clone, Serialize)]
pub struct RegionComparison {
    pub region: Region,
    pub sum_hetero: f64,
    pub sum_homo: f64,
    pub difference: f64,
    pub percent_change: f64,
    pub ratio: f64,
}

/// Absorbed dose (Gy) summed over the heterogeneity rectangle
#[derive(Debug, Clone, Serialize)]
pub struct RegionDose {
    pub hetero_material: String,
    pub homo_material: String,
    pub hetero_gy: f64,
    pub homo_gy: f64,
}

impl RegionDose {
    /// Hetero map uses the insert density inside the rectangle; homo map is uniform
    fn compute(config: &Config, hetero: &DoseMap, homo: &DoseMap) -> DoseResult<Self> {
        let inside = config.hetero_conversion()?;
        let medium = config.homo_conversion()?;
        let region = config.region();
        let hetero_gy = medium.apply_regional(hetero, &region, &inside);
        let homo_gy = medium.apply(homo);
        Ok(Self {
            hetero_material: config.hetero_material().to_string(),
            homo_material: config.homo_material().to_string(),
            hetero_gy: RegionAggregator::new(&hetero_gy).sum(&region),
            homo_gy: RegionAggregator::new(&homo_gy).sum(&region),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymmetrySummary {
    pub threshold: f64,
    pub hetero: Option<SymmetryAnalysis>,
    pub homo: Option<SymmetryAnalysis>,
}

/// Primary/secondary breakdown of both inputs
#[derive(Debug, Clone, Serialize)]
pub struct CarrierSummary {
    pub source_x: f64,
    pub source_y: f64,
    pub tolerance: f64,
    pub hetero: CarrierBreakdown,
    pub homo: CarrierBreakdown,
}

impl CarrierSummary {
    /// `None` unless both files hold the total, primary and secondary maps
    pub fn compute(config: &Config, hetero: &DoseMapFile, homo: &DoseMapFile) -> DoseResult<Option<Self>> {
        let (Some(hetero_maps), Some(homo_maps)) =
            (carrier_maps(config, hetero)?, carrier_maps(config, homo)?)
        else {
            debug!(
                total = %config.total_map(),
                primary = %config.primary_map(),
                secondary = %config.secondary_map(),
                "carrier_breakdown_skipped"
            );
            return Ok(None);
        };

        let bands = match config.carrier_bands() {
            Ok(bands) => bands,
            Err(e) => {
                warn!(error = %e, category = e.category(), "carrier_breakdown_skipped");
                return Ok(None);
            }
        };
        let (cx, cy) = config.source_center();
        let tolerance = config.closure_tolerance();
        let summary = Self {
            source_x: cx,
            source_y: cy,
            tolerance,
            hetero: hetero_maps.breakdown(cx, cy, &bands, tolerance),
            homo: homo_maps.breakdown(cx, cy, &bands, tolerance),
        };

        for (input, breakdown) in [("hetero", &summary.hetero), ("homo", &summary.homo)] {
            if !breakdown.closed {
                warn!(
                    input = input,
                    closure = breakdown.overall.closure,
                    total = breakdown.overall.total,
                    "carrier_split_not_closed"
                );
            }
        }
        Ok(Some(summary))
    }
}

fn carrier_maps<'a>(config: &Config, file: &'a DoseMapFile) -> DoseResult<Option<CarrierMaps<'a>>> {
    match (
        file.get(config.total_map()),
        file.get(config.primary_map()),
        file.get(config.secondary_map()),
    ) {
        (Some(total), Some(primary), Some(secondary)) => {
            CarrierMaps::new(total, primary, secondary).map(Some)
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub geometry: String,
    pub hetero: MapSummary,
    pub homo: MapSummary,
    pub difference: DifferenceSummary,
    /// Bin-wise ratio over bins where the reference is positive
    pub ratio: Option<WindowStats>,
    pub significance: SignificanceSummary,
    pub row: RegionComparison,
    pub heterogeneity_region: RegionComparison,
    pub symmetry: SymmetrySummary,
    /// Absent when a configured material has no density
    pub dose: Option<RegionDose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carriers: Option<CarrierSummary>,
}

impl ComparisonReport {
    /// Run every comparison step for a hetero/homo pair
    pub fn compute(
        config: &Config,
        hetero: &DoseMap,
        homo: &DoseMap,
        version: &str,
    ) -> DoseResult<Self> {
        let engine = DoseComparisonEngine::new();
        let policy = SignificancePolicy::new(config.alpha());

        let diff = engine.difference(hetero, homo)?;
        let ratio = engine.ratio(hetero, homo)?;
        let ratio_values: Vec<f64> = ratio
            .values()
            .iter()
            .zip(homo.values())
            .filter(|(_, b)| **b > 0.0)
            .map(|(r, _)| *r)
            .collect();

        let chi_square = engine.chi_square(hetero, homo)?;
        let verdict = policy.decide(chi_square.p_value);

        let region = config.region();
        let window = Some((region.x_min, region.x_max));
        let symmetry = SymmetrySummary {
            threshold: config.asymmetry_threshold(),
            hetero: analyze_symmetry(&RegionAggregator::new(hetero).profile_x(), window),
            homo: analyze_symmetry(&RegionAggregator::new(homo).profile_x(), window),
        };

        let dose = match RegionDose::compute(config, hetero, homo) {
            Ok(dose) => Some(dose),
            Err(e) => {
                warn!(error = %e, category = e.category(), "dose_conversion_skipped");
                None
            }
        };

        Ok(Self {
            generated_at: Utc::now(),
            version: version.to_string(),
            geometry: hetero.geometry_label(),
            hetero: MapSummary::of(config.hetero_file(), hetero),
            homo: MapSummary::of(config.homo_file(), homo),
            difference: engine.difference_summary(&diff),
            ratio: WindowStats::from_values(&ratio_values),
            significance: SignificanceSummary { chi_square, alpha: config.alpha(), verdict },
            row: region_comparison(&engine, hetero, homo, config.row_region())?,
            heterogeneity_region: region_comparison(&engine, hetero, homo, region)?,
            symmetry,
            dose,
            carriers: None,
        })
    }

    pub fn with_carriers(mut self, carriers: Option<CarrierSummary>) -> Self {
        self.carriers = carriers;
        self
    }

    pub fn to_json(&self) -> DoseResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DoseError::Render { path: "report".to_string(), reason: e.to_string() })
    }

    /// Write the JSON report and the image as one output set
    ///
    /// The report is serialized before anything is written. The image is
    /// removed again if the report write fails.
    pub fn write_outputs<F>(&self, report_path: &Path, image_path: &Path, render: F) -> DoseResult<()>
    where
        F: FnOnce(&Path) -> DoseResult<()>,
    {
        let body = self.to_json()?;
        render(image_path)?;
        if let Err(e) = write_text(report_path, &body) {
            if let Err(cleanup) = fs::remove_file(image_path) {
                warn!(file = %image_path.display(), error = %cleanup, "image_cleanup_failed");
            }
            return Err(e);
        }
        info!(file = %report_path.display(), "report_written");
        Ok(())
    }

    /// Human-readable report
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!("=== Heterogeneity comparison ({}) ===", self.geometry)];
        for (label, m) in [("Heterogeneous", &self.hetero), ("Homogeneous", &self.homo)] {
            lines.push(String::new());
            lines.push(format!("{}: {} [{}]", label, m.file, m.name));
            lines.push(format!("  Entries:  {}", m.entries));
            lines.push(format!("  Mean:     ({:.3}, {:.3}) mm", m.mean_x, m.mean_y));
            lines.push(format!("  Integral: {:.6e}", m.integral));
        }

        let d = &self.difference;
        lines.push(String::new());
        lines.push("Difference (hetero - homo):".to_string());
        lines.push(format!("  Mean: {:.6e}  RMS: {:.6e}", d.mean, d.rms));
        lines.push(format!("  Max:  {:.6e}  Min: {:.6e}", d.max, d.min));
        if let Some(r) = &self.ratio {
            lines.push(format!("  Ratio mean {:.4} (min {:.4}, max {:.4})", r.mean, r.min, r.max));
        }

        let s = &self.significance;
        lines.push(String::new());
        lines.push("=== Statistical comparison ===".to_string());
        lines.push(format!(
            "Chi2 = {:.4} (ndf {}), p-value = {:.6e}, alpha = {}",
            s.chi_square.chi2, s.chi_square.ndf, s.chi_square.p_value, s.alpha
        ));
        lines.push(format!("Verdict: {}", s.verdict.as_str()));

        for (label, r) in [("Row analysis", &self.row), ("Heterogeneity region", &self.heterogeneity_region)]
        {
            lines.push(String::new());
            lines.push(format!("=== {} {} ===", label, r.region));
            lines.push(format!("Sum hetero: {:.6e}", r.sum_hetero));
            lines.push(format!("Sum homo:   {:.6e}", r.sum_homo));
            lines.push(format!("Difference: {:.6e} ({:+.2}%)", r.difference, r.percent_change));
        }

        if let Some(d) = &self.dose {
            lines.push(String::new());
            lines.push("=== Absorbed dose in heterogeneity region ===".to_string());
            lines.push(format!("{:<7} ({}): {:.6e} Gy", "Hetero", d.hetero_material, d.hetero_gy));
            lines.push(format!("{:<7} ({}): {:.6e} Gy", "Homo", d.homo_material, d.homo_gy));
        }

        lines.push(String::new());
        lines.push(format!("=== Lateral symmetry (threshold {}) ===", self.symmetry.threshold));
        for (label, sym) in [("Hetero", &self.symmetry.hetero), ("Homo", &self.symmetry.homo)] {
            lines.push(match sym {
                Some(a) => format!(
                    "{:<7} L={:.4e} R={:.4e} asym={:.2}% corr={:.4} {}",
                    label,
                    a.left_mean,
                    a.right_mean,
                    100.0 * a.asymmetry_ratio,
                    a.correlation,
                    if a.is_asymmetric(self.symmetry.threshold) { "ASYMMETRIC" } else { "symmetric" }
                ),
                None => format!("{:<7} no profile", label),
            });
        }

        if let Some(c) = &self.carriers {
            lines.push(String::new());
            lines.push(format!(
                "=== Primary/secondary fractions (source at ({}, {}) mm) ===",
                c.source_x, c.source_y
            ));
            for (label, b) in [("Hetero", &c.hetero), ("Homo", &c.homo)] {
                lines.push(format!(
                    "{:<7} primary {:.2}% secondary {:.2}% {}",
                    label,
                    b.overall.primary_pct,
                    b.overall.secondary_pct,
                    if b.closed { "closed" } else { "NOT CLOSED" }
                ));
                for f in &b.bands {
                    let band = f.band.map(|band| band.to_string()).unwrap_or_default();
                    lines.push(format!(
                        "  {:<16} primary {:6.2}% secondary {:6.2}%",
                        band, f.primary_pct, f.secondary_pct
                    ));
                }
            }
        }

        lines.push(String::new());
        lines.join("\n")
    }
}

/// Write a text file, creating parent directories
fn write_text(path: &Path, body: &str) -> DoseResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, body)?;
    Ok(())
}

fn region_comparison(
    engine: &DoseComparisonEngine,
    hetero: &DoseMap,
    homo: &DoseMap,
    region: Region,
) -> DoseResult<RegionComparison> {
    let (sum_hetero, sum_homo) = engine.region_sums(hetero, homo, &region)?;
    Ok(RegionComparison {
        region,
        sum_hetero,
        sum_homo,
        difference: sum_hetero - sum_homo,
        percent_change: engine.percent_change(hetero, homo, &region)?,
        ratio: engine.region_ratio(hetero, homo, &region)?,
    })
}
