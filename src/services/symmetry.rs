//! Left/right symmetry of an X profile
//!
//! A source centred at X = 0 in a uniform medium produces a mirror-symmetric
//! lateral profile; a heterogeneity on one side breaks that symmetry.

use crate::services::aggregator::{Profile, WindowStats};
use serde::Serialize;
use statrs::statistics::Statistics;

/// Default asymmetry threshold
pub const DEFAULT_ASYMMETRY_THRESHOLD: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymmetryAnalysis {
    pub center_x: f64,
    pub left_mean: f64,
    pub right_mean: f64,
    pub left_std: f64,
    pub right_std: f64,
    /// |L - R| / ((L + R) / 2)
    pub asymmetry_ratio: f64,
    /// Pearson correlation of mirrored halves
    pub correlation: f64,
    /// Stats inside an optional window (e.g. the heterogeneity span)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowStats>,
}

impl SymmetryAnalysis {
    pub fn is_asymmetric(&self, threshold: f64) -> bool {
        self.asymmetry_ratio > threshold
    }
}

/// Split at the centre nearest X = 0 and compare the mirrored halves
pub fn analyze_symmetry(profile: &Profile, window: Option<(f64, f64)>) -> Option<SymmetryAnalysis> {
    let centers = &profile.centers;
    let values = &profile.values;
    if centers.is_empty() || centers.len() != values.len() {
        return None;
    }

    let center_idx = centers
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
        .map(|(i, _)| i)?;

    // left: ..=center (read outward), right: center.. (read outward)
    let left: Vec<f64> = values[..=center_idx].iter().rev().copied().collect();
    let right: Vec<f64> = values[center_idx..].to_vec();
    let n = left.len().min(right.len());
    let (left, right) = (&left[..n], &right[..n]);

    let l = WindowStats::from_values(left)?;
    let r = WindowStats::from_values(right)?;
    let avg = (l.mean + r.mean) / 2.0;
    let asymmetry_ratio = if avg > 0.0 { (l.mean - r.mean).abs() / avg } else { 0.0 };

    Some(SymmetryAnalysis {
        center_x: centers[center_idx],
        left_mean: l.mean,
        right_mean: r.mean,
        left_std: l.std,
        right_std: r.std,
        asymmetry_ratio,
        correlation: pearson(left, right),
        window: window.and_then(|(lo, hi)| profile.window_stats(lo, hi)),
    })
}

/// Pearson correlation; 0 when undefined
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let denom = Statistics::population_std_dev(a) * Statistics::population_std_dev(b);
    if denom > 0.0 && denom.is_finite() {
        Statistics::population_covariance(a, b) / denom
    } else {
        0.0
    }
}
