//! Per-track lineage metadata
//!
//! Each `Track` owns its `TrackLineageTag` directly; classification is a
//! plain field update, no opaque user-data lookup involved.

use crate::domain::types::{ParticleKind, TrackId};

/// Classification state of a single track
///
/// `primary_dose_carrier` is set-once: there is no API that clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackLineageTag {
    photon_lineage: bool,
    primary_dose_carrier: bool,
}

impl TrackLineageTag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_photon_lineage(&self) -> bool {
        self.photon_lineage
    }

    #[inline]
    pub fn is_primary_dose_carrier(&self) -> bool {
        self.primary_dose_carrier
    }

    pub fn set_photon_lineage(&mut self, value: bool) {
        self.photon_lineage = value;
    }

    /// Mark this track as the first charged secondary of a photon chain
    pub fn mark_primary_dose_carrier(&mut self) {
        self.primary_dose_carrier = true;
    }
}

/// A live track as seen by the step callback
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub parent: TrackId,
    pub particle: ParticleKind,
    pub tag: TrackLineageTag,
    pub steps: u64,
}

impl Track {
    #[inline]
    pub fn new(id: TrackId, parent: TrackId, particle: ParticleKind) -> Self {
        Self { id, parent, particle, tag: TrackLineageTag::new(), steps: 0 }
    }
}
