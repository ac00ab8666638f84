//! Energy deposit to absorbed dose conversion

use crate::domain::dose_map::DoseMap;
use crate::domain::region::Region;
use crate::infra::error::{DoseError, DoseResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Joules per MeV
pub const MEV_TO_J: f64 = 1.602e-13;

/// Density in g/cm3 of a named material
pub fn material_density(table: &BTreeMap<String, f64>, material: &str) -> DoseResult<f64> {
    table
        .get(material)
        .copied()
        .ok_or_else(|| DoseError::Configuration(format!("unknown material '{}'", material)))
}

/// Voxel dimensions in mm
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoxelSize {
    pub x_mm: f64,
    pub y_mm: f64,
    pub z_mm: f64,
}

impl VoxelSize {
    pub fn volume_cm3(&self) -> f64 {
        self.x_mm * self.y_mm * self.z_mm / 1000.0
    }
}

/// MeV-per-voxel to Gy for a single material
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoseConversion {
    pub voxel: VoxelSize,
    pub density_g_cm3: f64,
}

impl DoseConversion {
    pub fn new(voxel: VoxelSize, density_g_cm3: f64) -> Self {
        Self { voxel, density_g_cm3 }
    }

    pub fn voxel_mass_kg(&self) -> f64 {
        self.voxel.volume_cm3() * self.density_g_cm3 / 1000.0
    }

    /// Gy per MeV deposited in one voxel (0 for a massless voxel)
    pub fn gy_per_mev(&self) -> f64 {
        let mass = self.voxel_mass_kg();
        if mass > 0.0 {
            MEV_TO_J / mass
        } else {
            0.0
        }
    }

    /// Whole map in Gy
    pub fn apply(&self, map: &DoseMap) -> DoseMap {
        let k = self.gy_per_mev();
        let values = map.values().iter().map(|v| v * k).collect();
        let sumw2 = map.sumw2().iter().map(|s| s * k * k).collect();
        map.derive(&format!("{}_Gy", map.name()), values, sumw2).with_title("Dose [Gy]")
    }

    /// Map in Gy using `inside` for bins centred in `region` and `self` elsewhere
    pub fn apply_regional(&self, map: &DoseMap, region: &Region, inside: &DoseConversion) -> DoseMap {
        let (k_out, k_in) = (self.gy_per_mev(), inside.gy_per_mev());
        let (x_axis, y_axis) = (map.x_axis(), map.y_axis());
        let nx = map.x_bins();
        let factor = |i: usize| {
            let (bx, by) = (i % nx, i / nx);
            if region.contains(x_axis.center(bx), y_axis.center(by)) {
                k_in
            } else {
                k_out
            }
        };
        let values = map.values().iter().enumerate().map(|(i, v)| v * factor(i)).collect();
        let sumw2 = map
            .sumw2()
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let k = factor(i);
                s * k * k
            })
            .collect();
        map.derive(&format!("{}_Gy", map.name()), values, sumw2).with_title("Dose [Gy]")
    }
}
