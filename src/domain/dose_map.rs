//! Immutable 2-D dose map over two spatial axes
//!
//! Bins are stored row-major (`y * x_bins + x`). Each bin carries the
//! accumulated value, the sum of squared weights (its statistical
//! variance) and the number of entries. Maps are built once through
//! `DoseMapBuilder` and never mutated afterwards; every derived map is a
//! new value.

use crate::infra::error::{DoseError, DoseResult};
use serde::{Deserialize, Serialize};

/// Uniformly binned axis in physical units (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub bins: usize,
    pub min: f64,
    pub max: f64,
}

/// Where a coordinate falls relative to an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinPosition {
    Underflow,
    Bin(usize),
    Overflow,
}

impl Axis {
    pub fn new(bins: usize, min: f64, max: f64) -> DoseResult<Self> {
        let axis = Self { bins, min, max };
        axis.check().map_err(DoseError::Configuration)?;
        Ok(axis)
    }

    /// At least one bin over a finite, non-empty range
    pub fn check(&self) -> Result<(), String> {
        if self.bins == 0 || !(self.max > self.min) || !self.min.is_finite() || !self.max.is_finite() {
            return Err(format!(
                "invalid axis: {} bins over [{}, {})",
                self.bins, self.min, self.max
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Lower-edge-inclusive bin lookup
    pub fn find_bin(&self, coord: f64) -> BinPosition {
        if coord.is_nan() || coord < self.min {
            return BinPosition::Underflow;
        }
        if coord >= self.max {
            return BinPosition::Overflow;
        }
        let idx = ((coord - self.min) / self.width()).floor() as usize;
        // Guard against rounding just below max
        BinPosition::Bin(idx.min(self.bins - 1))
    }

    /// Bin index for `coord`, clamped into the axis
    pub fn clamped_bin(&self, coord: f64) -> usize {
        match self.find_bin(coord) {
            BinPosition::Underflow => 0,
            BinPosition::Bin(idx) => idx,
            BinPosition::Overflow => self.bins - 1,
        }
    }

    #[inline]
    pub fn low_edge(&self, bin: usize) -> f64 {
        self.min + bin as f64 * self.width()
    }

    #[inline]
    pub fn center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 + 0.5) * self.width()
    }

    pub fn centers(&self) -> Vec<f64> {
        (0..self.bins).map(|b| self.center(b)).collect()
    }

    /// Bin whose centre is closest to `coord`
    pub fn nearest_center(&self, coord: f64) -> usize {
        let raw = ((coord - self.min) / self.width() - 0.5).round();
        raw.clamp(0.0, (self.bins - 1) as f64) as usize
    }
}

/// Persisted 2-D histogram of accumulated energy deposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseMap {
    name: String,
    #[serde(default)]
    title: String,
    x: Axis,
    y: Axis,
    values: Vec<f64>,
    sumw2: Vec<f64>,
    entries: Vec<u64>,
    /// Fills that landed outside the grid
    #[serde(default)]
    outside: u64,
}

impl DoseMap {
    /// Assemble a map from raw storage, validating lengths
    pub fn from_parts(
        name: impl Into<String>,
        x: Axis,
        y: Axis,
        values: Vec<f64>,
        sumw2: Vec<f64>,
        entries: Vec<u64>,
    ) -> DoseResult<Self> {
        let map = Self {
            name: name.into(),
            title: String::new(),
            x,
            y,
            values,
            sumw2,
            entries,
            outside: 0,
        };
        map.validate()?;
        Ok(map)
    }

    /// Check axes and storage lengths (used after deserialization)
    pub fn validate(&self) -> DoseResult<()> {
        let invalid = |reason: String| DoseError::Parse {
            path: self.name.clone(),
            reason,
        };
        self.x.check().map_err(|e| invalid(format!("x {}", e)))?;
        self.y.check().map_err(|e| invalid(format!("y {}", e)))?;
        let n = self
            .x
            .bins
            .checked_mul(self.y.bins)
            .ok_or_else(|| invalid(format!("{} x {} bins overflows", self.x.bins, self.y.bins)))?;
        if self.values.len() != n || self.sumw2.len() != n || self.entries.len() != n {
            return Err(DoseError::Parse {
                path: self.name.clone(),
                reason: format!(
                    "expected {} bins, found values={} sumw2={} entries={}",
                    n,
                    self.values.len(),
                    self.sumw2.len(),
                    self.entries.len()
                ),
            });
        }
        Ok(())
    }

    /// New map on this map's geometry with the given contents
    pub(crate) fn derive(&self, name: &str, values: Vec<f64>, sumw2: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        debug_assert_eq!(sumw2.len(), self.sumw2.len());
        Self {
            name: name.to_string(),
            title: String::new(),
            x: self.x,
            y: self.y,
            values,
            sumw2,
            entries: self.entries.clone(),
            outside: self.outside,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn x_axis(&self) -> &Axis {
        &self.x
    }

    pub fn y_axis(&self) -> &Axis {
        &self.y
    }

    pub fn x_bins(&self) -> usize {
        self.x.bins
    }

    pub fn y_bins(&self) -> usize {
        self.y.bins
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sumw2(&self) -> &[f64] {
        &self.sumw2
    }

    #[inline]
    fn index(&self, x_bin: usize, y_bin: usize) -> DoseResult<usize> {
        if x_bin >= self.x.bins || y_bin >= self.y.bins {
            return Err(DoseError::Index {
                x_bin,
                y_bin,
                x_bins: self.x.bins,
                y_bins: self.y.bins,
            });
        }
        Ok(y_bin * self.x.bins + x_bin)
    }

    /// Bin content; out-of-range indices are an `Index` error
    pub fn get(&self, x_bin: usize, y_bin: usize) -> DoseResult<f64> {
        Ok(self.values[self.index(x_bin, y_bin)?])
    }

    /// Statistical error of a bin (sqrt of sum of squared weights)
    pub fn error(&self, x_bin: usize, y_bin: usize) -> DoseResult<f64> {
        Ok(self.sumw2[self.index(x_bin, y_bin)?].sqrt())
    }

    pub fn bin_entries(&self, x_bin: usize, y_bin: usize) -> DoseResult<u64> {
        Ok(self.entries[self.index(x_bin, y_bin)?])
    }

    /// Total number of fills, including those outside the grid
    pub fn entries(&self) -> u64 {
        self.entries.iter().sum::<u64>() + self.outside
    }

    /// Sum of all in-range bin contents
    pub fn integral(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Content-weighted mean X coordinate (0 for an empty map)
    pub fn mean_x(&self) -> f64 {
        let total = self.integral();
        if total == 0.0 {
            return 0.0;
        }
        self.project_onto_x()
            .iter()
            .enumerate()
            .map(|(bx, v)| self.x.center(bx) * v)
            .sum::<f64>()
            / total
    }

    /// Content-weighted mean Y coordinate (0 for an empty map)
    pub fn mean_y(&self) -> f64 {
        let total = self.integral();
        if total == 0.0 {
            return 0.0;
        }
        self.project_onto_y()
            .iter()
            .enumerate()
            .map(|(by, v)| self.y.center(by) * v)
            .sum::<f64>()
            / total
    }

    /// Per-Y-bin sums over all X bins
    pub fn project_onto_y(&self) -> Vec<f64> {
        self.values.chunks(self.x.bins).map(|row| row.iter().sum()).collect()
    }

    /// Per-X-bin sums over all Y bins
    pub fn project_onto_x(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.x.bins];
        for row in self.values.chunks(self.x.bins) {
            for (acc, v) in out.iter_mut().zip(row) {
                *acc += v;
            }
        }
        out
    }

    /// Inclusive sum over the bins containing the given bounds
    ///
    /// Bounds resolve with lower-edge-inclusive lookup; bounds beyond the
    /// axis resolve to its first/last bin. Reversed bounds sum to zero.
    pub fn sum_over_region(&self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> f64 {
        let (x_lo, x_hi) = (self.x.clamped_bin(x_min), self.x.clamped_bin(x_max));
        let (y_lo, y_hi) = (self.y.clamped_bin(y_min), self.y.clamped_bin(y_max));
        if x_lo > x_hi || y_lo > y_hi || x_min > x_max || y_min > y_max {
            return 0.0;
        }
        (y_lo..=y_hi)
            .map(|by| {
                let row = by * self.x.bins;
                self.values[row + x_lo..=row + x_hi].iter().sum::<f64>()
            })
            .sum()
    }

    /// Identical axis ranges and bin counts
    pub fn same_geometry(&self, other: &DoseMap) -> bool {
        self.x == other.x && self.y == other.y
    }

    /// `ShapeMismatch` unless both maps share a geometry
    pub fn ensure_same_geometry(&self, other: &DoseMap) -> DoseResult<()> {
        if self.same_geometry(other) {
            Ok(())
        } else {
            Err(DoseError::ShapeMismatch { left: self.geometry_label(), right: other.geometry_label() })
        }
    }

    /// Short geometry description for diagnostics
    pub fn geometry_label(&self) -> String {
        format!(
            "{}: x[{}; {}, {}) y[{}; {}, {})",
            self.name, self.x.bins, self.x.min, self.x.max, self.y.bins, self.y.min, self.y.max
        )
    }
}

/// Accumulates fills into a `DoseMap`
#[derive(Debug, Clone)]
pub struct DoseMapBuilder {
    name: String,
    x: Axis,
    y: Axis,
    values: Vec<f64>,
    sumw2: Vec<f64>,
    entries: Vec<u64>,
    outside: u64,
}

impl DoseMapBuilder {
    pub fn new(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        let n = x.bins * y.bins;
        Self {
            name: name.into(),
            x,
            y,
            values: vec![0.0; n],
            sumw2: vec![0.0; n],
            entries: vec![0; n],
            outside: 0,
        }
    }

    /// Add `weight` at (x, y); returns false if the point is off the grid
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) -> bool {
        match (self.x.find_bin(x), self.y.find_bin(y)) {
            (BinPosition::Bin(bx), BinPosition::Bin(by)) => {
                let idx = by * self.x.bins + bx;
                self.values[idx] += weight;
                self.sumw2[idx] += weight * weight;
                self.entries[idx] += 1;
                true
            }
            _ => {
                self.outside += 1;
                false
            }
        }
    }

    /// Add `weight` directly to a bin by index
    pub fn fill_bin(&mut self, x_bin: usize, y_bin: usize, weight: f64) -> DoseResult<()> {
        if x_bin >= self.x.bins || y_bin >= self.y.bins {
            return Err(DoseError::Index {
                x_bin,
                y_bin,
                x_bins: self.x.bins,
                y_bins: self.y.bins,
            });
        }
        let idx = y_bin * self.x.bins + x_bin;
        self.values[idx] += weight;
        self.sumw2[idx] += weight * weight;
        self.entries[idx] += 1;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(self) -> DoseMap {
        DoseMap {
            name: self.name,
            title: String::new(),
            x: self.x,
            y: self.y,
            values: self.values,
            sumw2: self.sumw2,
            entries: self.entries,
            outside: self.outside,
        }
    }

    /// Snapshot without consuming the builder
    pub fn snapshot(&self) -> DoseMap {
        self.clone().build()
    }
}
