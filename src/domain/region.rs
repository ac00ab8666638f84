//! Analysis regions in axis coordinates (mm)
//!
//! Rectangles are closed on every side. Radial bands are annuli around a
//! point, inner radius inclusive and outer radius exclusive, so adjacent
//! bands never share a bin.

use crate::domain::dose_map::DoseMap;
use crate::infra::error::{DoseError, DoseResult};
use serde::Serialize;

/// Closed rectangle `[x_min, x_max] x [y_min, y_max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Region {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    /// Single row at `y` spanning `[x_min, x_max]`
    pub fn row(y: f64, x_min: f64, x_max: f64) -> Self {
        Self { x_min, x_max, y_min: y, y_max: y }
    }

    /// Whole extent of a map
    pub fn full(map: &DoseMap) -> Self {
        let (x, y) = (map.x_axis(), map.y_axis());
        Self { x_min: x.min, x_max: x.max, y_min: y.min, y_max: y.max }
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x[{}, {}] y[{}, {}] mm", self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

/// Annulus `r_min <= r < r_max` around a centre point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadialBand {
    pub r_min: f64,
    pub r_max: f64,
}

impl RadialBand {
    pub fn new(r_min: f64, r_max: f64) -> DoseResult<Self> {
        if !(r_min >= 0.0) || !r_min.is_finite() || !(r_max > r_min) {
            return Err(DoseError::Configuration(format!(
                "invalid radial band [{}, {}) mm",
                r_min, r_max
            )));
        }
        Ok(Self { r_min, r_max })
    }

    #[inline]
    pub fn contains(&self, r: f64) -> bool {
        r >= self.r_min && r < self.r_max
    }
}

impl std::fmt::Display for RadialBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r[{}, {}) mm", self.r_min, self.r_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_is_closed() {
        let r = Region::new(-30.0, 30.0, 10.0, 70.0);
        assert!(r.contains(-30.0, 10.0));
        assert!(r.contains(30.0, 70.0));
        assert!(!r.contains(30.1, 40.0));
        assert_eq!(r.to_string(), "x[-30, 30] y[10, 70] mm");
    }

    #[test]
    fn test_band_is_half_open() {
        let band = RadialBand::new(1.0, 5.0).unwrap();
        assert!(band.contains(1.0));
        assert!(band.contains(4.999));
        assert!(!band.contains(5.0));
        assert!(!band.contains(0.5));
        assert_eq!(band.to_string(), "r[1, 5) mm");
    }

    #[test]
    fn test_band_rejects_degenerate() {
        assert!(RadialBand::new(-1.0, 2.0).is_err());
        assert!(RadialBand::new(3.0, 3.0).is_err());
        assert!(RadialBand::new(f64::NAN, 3.0).is_err());
        assert!(RadialBand::new(0.0, f64::INFINITY).is_ok());
    }
}
