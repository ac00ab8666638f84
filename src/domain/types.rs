//! Shared types for dose scoring and comparison

use crate::domain::lineage::TrackLineageTag;
use serde::{Deserialize, Serialize};

/// Newtype wrapper for transport-engine track IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TrackId(pub i64);

impl TrackId {
    /// Parent id used by the transport engine for source primaries
    pub const NONE: TrackId = TrackId(0);

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Particle species as reported by the transport engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticleKind {
    Photon,
    Electron,
    Positron,
    Other(String),
}

impl std::str::FromStr for ParticleKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gamma" | "photon" => ParticleKind::Photon,
            "e-" | "electron" => ParticleKind::Electron,
            "e+" | "positron" => ParticleKind::Positron,
            other => ParticleKind::Other(other.to_string()),
        })
    }
}

impl ParticleKind {
    pub fn as_str(&self) -> &str {
        match self {
            ParticleKind::Photon => "gamma",
            ParticleKind::Electron => "e-",
            ParticleKind::Positron => "e+",
            ParticleKind::Other(s) => s,
        }
    }

    #[inline]
    pub fn is_photon(&self) -> bool {
        matches!(self, ParticleKind::Photon)
    }

    #[inline]
    pub fn is_charged_lepton(&self) -> bool {
        matches!(self, ParticleKind::Electron | ParticleKind::Positron)
    }
}

impl Serialize for ParticleKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParticleKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        // FromStr is infallible
        Ok(raw.parse().unwrap_or(ParticleKind::Other(raw)))
    }
}

/// Dose-carrier category a filter selects for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierCategory {
    Primary,
    Secondary,
}

impl CarrierCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarrierCategory::Primary => "primary",
            CarrierCategory::Secondary => "secondary",
        }
    }
}

/// One step reported by the transport engine's per-step callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub event_id: u64,
    pub track_id: TrackId,
    #[serde(default = "default_parent")]
    pub parent_id: TrackId,
    pub particle: ParticleKind,
    /// Process that created the track ("phot", "compt", "conv", ...); empty for primaries
    #[serde(default)]
    pub creator_process: String,
    pub x_mm: f64,
    pub y_mm: f64,
    /// Energy deposited during the step (MeV)
    #[serde(default)]
    pub edep: f64,
    /// Last step of the track
    #[serde(default)]
    pub last: bool,
}

fn default_parent() -> TrackId {
    TrackId::NONE
}

/// Energy deposit offered to a single scorer
///
/// `tag` is `None` when the track carries no lineage metadata.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEvent<'a> {
    pub tag: Option<&'a TrackLineageTag>,
    pub energy: f64,
    pub scorer_name: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_kind_from_str() {
        assert_eq!("gamma".parse::<ParticleKind>().unwrap(), ParticleKind::Photon);
        assert_eq!("e-".parse::<ParticleKind>().unwrap(), ParticleKind::Electron);
        assert_eq!("e+".parse::<ParticleKind>().unwrap(), ParticleKind::Positron);
        assert!(matches!("proton".parse::<ParticleKind>().unwrap(), ParticleKind::Other(_)));
    }

    #[test]
    fn test_step_record_deserialize_defaults() {
        let step: StepRecord =
            serde_json::from_str(r#"{"track_id":1,"particle":"gamma","x_mm":0.5,"y_mm":-2.0}"#)
                .unwrap();
        assert_eq!(step.track_id, TrackId(1));
        assert!(step.parent_id.is_none());
        assert!(step.particle.is_photon());
        assert_eq!(step.edep, 0.0);
        assert!(!step.last);
    }
}
