//! Lock-free scoring counters and end-of-run summary
//!
//! Counters use atomics so the step callback never takes a lock. They are
//! statistics only and use Relaxed ordering throughout.

use crate::domain::types::CarrierCategory;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for one scoring run
pub struct ScoringMetrics {
    /// Steps seen by the lineage tracker
    steps_total: AtomicU64,
    /// Tracks created (first step seen)
    tracks_total: AtomicU64,
    /// Tracks marked as primary dose carriers
    primary_carriers_total: AtomicU64,
    /// Tracks whose parent was unknown when first seen
    orphan_tracks_total: AtomicU64,
    /// Deposits accepted by a Primary filter
    primary_accepted: AtomicU64,
    /// Deposits accepted by a Secondary filter
    secondary_accepted: AtomicU64,
    /// Deposits accepted by unfiltered scorers
    unfiltered_accepted: AtomicU64,
    /// Deposits rejected by a filter
    rejected_total: AtomicU64,
    /// Deposits that landed outside the mesh
    outside_total: AtomicU64,
    started_at: Instant,
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            steps_total: AtomicU64::new(0),
            tracks_total: AtomicU64::new(0),
            primary_carriers_total: AtomicU64::new(0),
            orphan_tracks_total: AtomicU64::new(0),
            primary_accepted: AtomicU64::new(0),
            secondary_accepted: AtomicU64::new(0),
            unfiltered_accepted: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            outside_total: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_step(&self) {
        self.steps_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_track_created(&self, primary_carrier: bool, orphan: bool) {
        self.tracks_total.fetch_add(1, Ordering::Relaxed);
        if primary_carrier {
            self.primary_carriers_total.fetch_add(1, Ordering::Relaxed);
        }
        if orphan {
            self.orphan_tracks_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_accepted(&self, category: Option<CarrierCategory>) {
        let counter = match category {
            Some(CarrierCategory::Primary) => &self.primary_accepted,
            Some(CarrierCategory::Secondary) => &self.secondary_accepted,
            None => &self.unfiltered_accepted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_outside(&self) {
        self.outside_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn steps_total(&self) -> u64 {
        self.steps_total.load(Ordering::Relaxed)
    }

    pub fn tracks_total(&self) -> u64 {
        self.tracks_total.load(Ordering::Relaxed)
    }

    pub fn primary_carriers_total(&self) -> u64 {
        self.primary_carriers_total.load(Ordering::Relaxed)
    }

    /// Snapshot of all counters
    pub fn report(&self) -> ScoringSummary {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        let steps = self.steps_total.load(Ordering::Relaxed);
        ScoringSummary {
            steps_total: steps,
            steps_per_sec: if elapsed > 0.0 { steps as f64 / elapsed } else { 0.0 },
            tracks_total: self.tracks_total.load(Ordering::Relaxed),
            primary_carriers_total: self.primary_carriers_total.load(Ordering::Relaxed),
            orphan_tracks_total: self.orphan_tracks_total.load(Ordering::Relaxed),
            primary_accepted: self.primary_accepted.load(Ordering::Relaxed),
            secondary_accepted: self.secondary_accepted.load(Ordering::Relaxed),
            unfiltered_accepted: self.unfiltered_accepted.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            outside_total: self.outside_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `ScoringMetrics`
#[derive(Debug, Clone, Serialize)]
pub struct ScoringSummary {
    pub steps_total: u64,
    pub steps_per_sec: f64,
    pub tracks_total: u64,
    pub primary_carriers_total: u64,
    pub orphan_tracks_total: u64,
    pub primary_accepted: u64,
    pub secondary_accepted: u64,
    pub unfiltered_accepted: u64,
    pub rejected_total: u64,
    pub outside_total: u64,
}

impl ScoringSummary {
    pub fn log(&self) {
        info!(
            steps_total = %self.steps_total,
            steps_per_sec = %format!("{:.1}", self.steps_per_sec),
            tracks_total = %self.tracks_total,
            primary_carriers = %self.primary_carriers_total,
            orphan_tracks = %self.orphan_tracks_total,
            primary_accepted = %self.primary_accepted,
            secondary_accepted = %self.secondary_accepted,
            unfiltered_accepted = %self.unfiltered_accepted,
            rejected = %self.rejected_total,
            outside = %self.outside_total,
            "scoring_metrics"
        );
    }
}
