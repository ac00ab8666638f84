//! Two-sample chi-square test for weighted dose maps
//!
//! Both maps are treated as weighted histograms. For bin i with contents
//! `a_i`, `b_i`, squared-weight sums `s_a,i`, `s_b,i` and map totals
//! `W_a`, `W_b`:
//!
//! ```text
//! chi2 = sum_i (W_b * a_i - W_a * b_i)^2 / (W_b^2 * s_a,i + W_a^2 * s_b,i)
//! ndf  = (bins contributing) - 1
//! p    = Q(ndf / 2, chi2 / 2)        (upper regularized incomplete gamma)
//! ```
//!
//! Scaling either map by a constant leaves every term unchanged, so maps
//! with different total normalization stay comparable. Bins empty in both
//! maps, or with zero combined variance, do not contribute.

use crate::domain::dose_map::DoseMap;
use crate::infra::error::DoseResult;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Outcome of a chi-square comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquareResult {
    pub chi2: f64,
    pub ndf: usize,
    pub p_value: f64,
}

/// Decision derived from a p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Significant,
    NotSignificant,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Significant => "significant difference detected",
            Verdict::NotSignificant => "not significant",
        }
    }
}

/// Significance threshold applied to p-values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignificancePolicy {
    pub alpha: f64,
}

impl Default for SignificancePolicy {
    fn default() -> Self {
        Self { alpha: 0.05 }
    }
}

impl SignificancePolicy {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn decide(&self, p_value: f64) -> Verdict {
        if p_value < self.alpha {
            Verdict::Significant
        } else {
            Verdict::NotSignificant
        }
    }
}

/// Chi-square comparison of the full bin population of two maps
pub fn chi_square_test(a: &DoseMap, b: &DoseMap) -> DoseResult<ChiSquareResult> {
    a.ensure_same_geometry(b)?;

    let w_a = a.integral();
    let w_b = b.integral();
    if w_a <= 0.0 || w_b <= 0.0 {
        // No statistical content to compare
        return Ok(ChiSquareResult { chi2: 0.0, ndf: 0, p_value: 1.0 });
    }

    let mut chi2 = 0.0;
    let mut used = 0usize;
    for (((&ai, &bi), &sa), &sb) in
        a.values().iter().zip(b.values()).zip(a.sumw2()).zip(b.sumw2())
    {
        if ai == 0.0 && bi == 0.0 {
            continue;
        }
        let sigma = w_b * w_b * sa + w_a * w_a * sb;
        if sigma <= 0.0 {
            continue;
        }
        let delta = w_b * ai - w_a * bi;
        chi2 += delta * delta / sigma;
        used += 1;
    }

    let ndf = used.saturating_sub(1);
    Ok(ChiSquareResult { chi2, ndf, p_value: chi2_probability(chi2, ndf) })
}

/// Upper-tail probability of a chi-square distribution
pub fn chi2_probability(chi2: f64, ndf: usize) -> f64 {
    if ndf == 0 || chi2 <= 0.0 {
        return 1.0;
    }
    ChiSquared::new(ndf as f64).map(|dist| dist.sf(chi2)).unwrap_or(1.0)
}
