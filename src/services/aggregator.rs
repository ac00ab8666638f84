//! Region sums and 1-D projections of a dose map, and the primary/secondary
//! breakdown over radial bands around the source

use crate::domain::dose_map::DoseMap;
use crate::domain::region::{RadialBand, Region};
use crate::infra::error::DoseResult;
use serde::Serialize;
use statrs::statistics::Statistics;

/// 1-D profile: bin centres and their values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub centers: Vec<f64>,
    pub values: Vec<f64>,
}

impl Profile {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Statistics over the bins whose centres fall in `[lo, hi]`
    pub fn window_stats(&self, lo: f64, hi: f64) -> Option<WindowStats> {
        let window: Vec<f64> = self
            .centers
            .iter()
            .zip(&self.values)
            .filter(|(c, _)| **c >= lo && **c <= hi)
            .map(|(_, v)| *v)
            .collect();
        WindowStats::from_values(&window)
    }
}

/// Mean, population standard deviation and extrema of a value set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

impl WindowStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            mean: Statistics::mean(values),
            std: Statistics::population_std_dev(values),
            max: Statistics::max(values),
            min: Statistics::min(values),
        })
    }
}

/// Integrates one map over sub-regions
#[derive(Debug, Clone, Copy)]
pub struct RegionAggregator<'a> {
    map: &'a DoseMap,
}

impl<'a> RegionAggregator<'a> {
    pub fn new(map: &'a DoseMap) -> Self {
        Self { map }
    }

    pub fn sum(&self, region: &Region) -> f64 {
        self.map.sum_over_region(region.x_min, region.x_max, region.y_min, region.y_max)
    }

    /// Sum across `[x_min, x_max]` in the row containing `y`
    pub fn row_sum(&self, y: f64, x_min: f64, x_max: f64) -> f64 {
        self.sum(&Region::row(y, x_min, x_max))
    }

    pub fn total(&self) -> f64 {
        self.sum(&Region::full(self.map))
    }

    pub fn profile_y(&self) -> Profile {
        Profile { centers: self.map.y_axis().centers(), values: self.map.project_onto_y() }
    }

    pub fn profile_x(&self) -> Profile {
        Profile { centers: self.map.x_axis().centers(), values: self.map.project_onto_x() }
    }

    /// Values along Y in the column whose centre is nearest `x`
    pub fn column_at(&self, x: f64) -> Profile {
        let bx = self.map.x_axis().nearest_center(x);
        let values = self.map.values().chunks(self.map.x_bins()).map(|row| row[bx]).collect();
        Profile { centers: self.map.y_axis().centers(), values }
    }

    /// Sum and bin count over bins whose centres lie in `band` around `(cx, cy)`
    pub fn radial_sum(&self, cx: f64, cy: f64, band: &RadialBand) -> (f64, usize) {
        let (x, y) = (self.map.x_axis(), self.map.y_axis());
        let nx = self.map.x_bins();
        self.map
            .values()
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                let dx = x.center(idx % nx) - cx;
                let dy = y.center(idx / nx) - cy;
                band.contains(dx.hypot(dy))
            })
            .fold((0.0, 0), |(sum, n), (_, v)| (sum + v, n + 1))
    }
}

/// Primary and secondary shares of the deposit in one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarrierFraction {
    /// `None` for the whole map
    pub band: Option<RadialBand>,
    pub bins: usize,
    pub total: f64,
    pub primary: f64,
    pub secondary: f64,
    pub primary_pct: f64,
    pub secondary_pct: f64,
    /// primary + secondary - total
    pub closure: f64,
}

impl CarrierFraction {
    fn new(band: Option<RadialBand>, bins: usize, total: f64, primary: f64, secondary: f64) -> Self {
        let (primary_pct, secondary_pct) = if total > 0.0 {
            (100.0 * primary / total, 100.0 * secondary / total)
        } else {
            (0.0, 0.0)
        };
        Self {
            band,
            bins,
            total,
            primary,
            secondary,
            primary_pct,
            secondary_pct,
            closure: primary + secondary - total,
        }
    }

    /// Primary plus secondary reproduces the total within a relative tolerance
    pub fn is_closed(&self, tolerance: f64) -> bool {
        self.closure.abs() <= tolerance * self.total.abs().max(f64::MIN_POSITIVE)
    }
}

/// Fractions for the whole map and for each band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierBreakdown {
    pub overall: CarrierFraction,
    pub bands: Vec<CarrierFraction>,
    /// Every entry is closed within the tolerance
    pub closed: bool,
}

/// Maps from one run scored with all carriers, primaries only and
/// secondaries only
#[derive(Debug, Clone, Copy)]
pub struct CarrierMaps<'a> {
    total: &'a DoseMap,
    primary: &'a DoseMap,
    secondary: &'a DoseMap,
}

impl<'a> CarrierMaps<'a> {
    pub fn new(total: &'a DoseMap, primary: &'a DoseMap, secondary: &'a DoseMap) -> DoseResult<Self> {
        total.ensure_same_geometry(primary)?;
        total.ensure_same_geometry(secondary)?;
        Ok(Self { total, primary, secondary })
    }

    pub fn overall(&self) -> CarrierFraction {
        CarrierFraction::new(
            None,
            self.total.values().len(),
            self.total.integral(),
            self.primary.integral(),
            self.secondary.integral(),
        )
    }

    pub fn band(&self, cx: f64, cy: f64, band: &RadialBand) -> CarrierFraction {
        let (total, bins) = RegionAggregator::new(self.total).radial_sum(cx, cy, band);
        let (primary, _) = RegionAggregator::new(self.primary).radial_sum(cx, cy, band);
        let (secondary, _) = RegionAggregator::new(self.secondary).radial_sum(cx, cy, band);
        CarrierFraction::new(Some(*band), bins, total, primary, secondary)
    }

    pub fn breakdown(&self, cx: f64, cy: f64, bands: &[RadialBand], tolerance: f64) -> CarrierBreakdown {
        let overall = self.overall();
        let bands: Vec<CarrierFraction> = bands.iter().map(|b| self.band(cx, cy, b)).collect();
        let closed = overall.is_closed(tolerance) && bands.iter().all(|f| f.is_closed(tolerance));
        CarrierBreakdown { overall, bands, closed }
    }
}
