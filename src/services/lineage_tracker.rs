//! Per-step lineage classification
//!
//! The transport engine calls `on_step` for every step of every track, one
//! track at a time. The first step of a track creates its `Track` and
//! classifies it:
//! - source primaries are photon-lineage when they are photons
//! - photon secondaries inherit the parent's photon lineage
//! - a charged secondary of a photon-lineage parent is a primary dose carrier
//!
//! Classification happens once per track; later steps only deposit energy.
//! Terminated tracks leave a lineage snapshot behind so their secondaries,
//! which the engine usually processes afterwards, can still be resolved.
//! All per-event state is dropped by `end_event`.

use crate::domain::lineage::{Track, TrackLineageTag};
use crate::domain::types::{StepRecord, TrackId};
use crate::infra::metrics::ScoringMetrics;
use crate::services::scoring::MeshRegistry;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Classifies tracks and forwards their deposits to the scoring meshes
pub struct LineageTracker {
    /// Live tracks of the current event
    tracks: FxHashMap<TrackId, Track>,
    /// Photon-lineage flag of every track seen in the current event
    lineage: FxHashMap<TrackId, bool>,
    current_event: Option<u64>,
    metrics: Arc<ScoringMetrics>,
}

impl LineageTracker {
    pub fn new(metrics: Arc<ScoringMetrics>) -> Self {
        Self {
            tracks: FxHashMap::default(),
            lineage: FxHashMap::default(),
            current_event: None,
            metrics,
        }
    }

    /// Process one step: classify on first sight, then score its deposit
    pub fn on_step(&mut self, step: &StepRecord, registry: &mut MeshRegistry) {
        self.metrics.record_step();

        if self.current_event != Some(step.event_id) {
            if self.current_event.is_some() {
                self.end_event();
            }
            self.current_event = Some(step.event_id);
        }

        if !self.tracks.contains_key(&step.track_id) {
            self.begin_track(step);
        }

        let tag = self.tracks.get_mut(&step.track_id).map(|track| {
            track.steps += 1;
            track.tag
        });

        if step.edep > 0.0 {
            registry.score(step.x_mm, step.y_mm, step.edep, tag.as_ref(), &self.metrics);
        }

        if step.last {
            self.on_track_end(step.track_id);
        }
    }

    fn begin_track(&mut self, step: &StepRecord) {
        let mut track = Track::new(step.track_id, step.parent_id, step.particle.clone());

        let (parent_photon, orphan) = if step.parent_id.is_none() {
            (false, false)
        } else {
            match self.lineage.get(&step.parent_id) {
                Some(&photon) => (photon, false),
                None => (false, true),
            }
        };

        if step.parent_id.is_none() {
            track.tag.set_photon_lineage(step.particle.is_photon());
        } else if step.particle.is_photon() {
            track.tag.set_photon_lineage(parent_photon);
        } else if step.particle.is_charged_lepton() && parent_photon {
            track.tag.mark_primary_dose_carrier();
        }

        trace!(
            track_id = %track.id,
            parent_id = %track.parent,
            particle = %track.particle.as_str(),
            process = %step.creator_process,
            photon_lineage = track.tag.is_photon_lineage(),
            primary_carrier = track.tag.is_primary_dose_carrier(),
            "track_classified"
        );

        self.metrics.record_track_created(track.tag.is_primary_dose_carrier(), orphan);
        self.lineage.insert(track.id, track.tag.is_photon_lineage());
        self.tracks.insert(track.id, track);
    }

    /// Destroy a terminated track; its lineage snapshot stays until `end_event`
    pub fn on_track_end(&mut self, track_id: TrackId) {
        if let Some(track) = self.tracks.remove(&track_id) {
            trace!(track_id = %track_id, steps = track.steps, "track_ended");
        }
    }

    /// Drop all per-event state
    pub fn end_event(&mut self) {
        if let Some(event_id) = self.current_event.take() {
            debug!(
                event_id,
                live_tracks = self.tracks.len(),
                seen_tracks = self.lineage.len(),
                "event_ended"
            );
        }
        self.tracks.clear();
        self.lineage.clear();
    }

    /// Tag of a live track
    pub fn tag(&self, track_id: TrackId) -> Option<&TrackLineageTag> {
        self.tracks.get(&track_id).map(|t| &t.tag)
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn metrics(&self) -> &Arc<ScoringMetrics> {
        &self.metrics
    }
}
