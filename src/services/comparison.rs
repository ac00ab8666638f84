//! Bin-wise comparison of two dose maps
//!
//! Every operation takes two maps of identical geometry and returns a new
//! value; inputs are never modified. Bin-wise derivations run in parallel
//! since no output bin depends on another.

use crate::domain::dose_map::DoseMap;
use crate::domain::region::Region;
use crate::infra::error::DoseResult;
use crate::services::aggregator::{Profile, RegionAggregator};
use crate::services::significance::{chi_square_test, ChiSquareResult};
use rayon::prelude::*;
use serde::Serialize;

/// Bin-content statistics of a difference map
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DifferenceSummary {
    pub integral: f64,
    pub mean: f64,
    pub rms: f64,
    pub max: f64,
    pub min: f64,
}

/// Stateless comparison operations
#[derive(Debug, Clone, Copy, Default)]
pub struct DoseComparisonEngine;

impl DoseComparisonEngine {
    pub fn new() -> Self {
        Self
    }

    fn check_geometry(a: &DoseMap, b: &DoseMap) -> DoseResult<()> {
        a.ensure_same_geometry(b)
    }

    /// a - b per bin; variances add
    pub fn difference(&self, a: &DoseMap, b: &DoseMap) -> DoseResult<DoseMap> {
        Self::check_geometry(a, b)?;
        let values = a.values().par_iter().zip(b.values()).map(|(x, y)| x - y).collect();
        let sumw2 = a.sumw2().par_iter().zip(b.sumw2()).map(|(x, y)| x + y).collect();
        let name = format!("{}_minus_{}", a.name(), b.name());
        Ok(a.derive(&name, values, sumw2).with_title("Difference"))
    }

    /// a / b per bin, 0 wherever b is not positive
    pub fn ratio(&self, a: &DoseMap, b: &DoseMap) -> DoseResult<DoseMap> {
        Self::check_geometry(a, b)?;
        let (values, sumw2): (Vec<f64>, Vec<f64>) = (0..a.values().len())
            .into_par_iter()
            .map(|i| {
                let (ca, cb) = (a.values()[i], b.values()[i]);
                if cb > 0.0 {
                    let (ea, eb) = (a.sumw2()[i], b.sumw2()[i]);
                    let err2 = (ea * cb * cb + eb * ca * ca) / (cb * cb * cb * cb);
                    (ca / cb, err2)
                } else {
                    (0.0, 0.0)
                }
            })
            .unzip();
        let name = format!("{}_over_{}", a.name(), b.name());
        Ok(a.derive(&name, values, sumw2).with_title("Ratio"))
    }

    /// 100 * (a - b) / b per bin, 0 wherever b is not positive
    pub fn percent_change_map(&self, a: &DoseMap, b: &DoseMap) -> DoseResult<DoseMap> {
        Self::check_geometry(a, b)?;
        let values = a
            .values()
            .par_iter()
            .zip(b.values())
            .map(|(&ca, &cb)| if cb > 0.0 { 100.0 * (ca - cb) / cb } else { 0.0 })
            .collect();
        let name = format!("{}_pct_{}", a.name(), b.name());
        Ok(a.derive(&name, values, vec![0.0; a.values().len()]).with_title("Percent change"))
    }

    /// 100 * (sum_a - sum_b) / sum_b over `region`, 0 if sum_b is not positive
    pub fn percent_change(&self, a: &DoseMap, b: &DoseMap, region: &Region) -> DoseResult<f64> {
        let (sum_a, sum_b) = self.region_sums(a, b, region)?;
        Ok(if sum_b > 0.0 { 100.0 * (sum_a - sum_b) / sum_b } else { 0.0 })
    }

    /// sum_a / sum_b over `region`, 0 if sum_b is not positive
    pub fn region_ratio(&self, a: &DoseMap, b: &DoseMap, region: &Region) -> DoseResult<f64> {
        let (sum_a, sum_b) = self.region_sums(a, b, region)?;
        Ok(if sum_b > 0.0 { sum_a / sum_b } else { 0.0 })
    }

    pub fn region_sums(&self, a: &DoseMap, b: &DoseMap, region: &Region) -> DoseResult<(f64, f64)> {
        Self::check_geometry(a, b)?;
        Ok((RegionAggregator::new(a).sum(region), RegionAggregator::new(b).sum(region)))
    }

    /// Ratio of X projections, 0 where b's projection is not positive
    pub fn ratio_profile_x(&self, a: &DoseMap, b: &DoseMap) -> DoseResult<Profile> {
        Self::check_geometry(a, b)?;
        let pa = a.project_onto_x();
        let pb = b.project_onto_x();
        let values =
            pa.iter().zip(&pb).map(|(&x, &y)| if y > 0.0 { x / y } else { 0.0 }).collect();
        Ok(Profile { centers: a.x_axis().centers(), values })
    }

    /// p-value of the two-sample chi-square test
    pub fn significance_test(&self, a: &DoseMap, b: &DoseMap) -> DoseResult<f64> {
        Ok(chi_square_test(a, b)?.p_value)
    }

    /// Full chi-square result (statistic, dof, p-value)
    pub fn chi_square(&self, a: &DoseMap, b: &DoseMap) -> DoseResult<ChiSquareResult> {
        chi_square_test(a, b)
    }

    pub fn difference_summary(&self, diff: &DoseMap) -> DifferenceSummary {
        let values = diff.values();
        let n = values.len().max(1) as f64;
        let integral: f64 = values.iter().sum();
        let mean = integral / n;
        let rms = (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt();
        DifferenceSummary { integral, mean, rms, max: diff.max_value(), min: diff.min_value() }
    }
}
