//! Scoring meshes and their named scorers
//!
//! A mesh owns a fixed grid and a handful of scorers. Each scorer
//! accumulates energy into its own `DoseMapBuilder`, optionally gated by a
//! `DoseCarrierFilter`. `MeshRegistry` is the handle handed to the filter
//! configurator at run start.

use crate::domain::dose_map::{Axis, DoseMap, DoseMapBuilder};
use crate::domain::lineage::TrackLineageTag;
use crate::domain::types::ScoringEvent;
use crate::infra::metrics::ScoringMetrics;
use crate::services::carrier_filter::DoseCarrierFilter;
use crate::services::filter_configurator::{FilterTarget, MeshRegistryHandle};
use smallvec::SmallVec;
use tracing::debug;

/// One named energy-deposit scorer
#[derive(Debug, Clone)]
pub struct Scorer {
    name: String,
    filter: Option<DoseCarrierFilter>,
    builder: DoseMapBuilder,
}

impl Scorer {
    pub fn new(name: &str, x: Axis, y: Axis) -> Self {
        Self { name: name.to_string(), filter: None, builder: DoseMapBuilder::new(name, x, y) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> Option<&DoseCarrierFilter> {
        self.filter.as_ref()
    }
}

/// Fixed grid with named scorers
#[derive(Debug, Clone)]
pub struct ScoringMesh {
    name: String,
    x: Axis,
    y: Axis,
    scorers: SmallVec<[Scorer; 3]>,
}

impl ScoringMesh {
    pub fn new(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        Self { name: name.into(), x, y, scorers: SmallVec::new() }
    }

    /// Add a scorer; a duplicate name is ignored
    pub fn with_scorer(mut self, scorer_name: &str) -> Self {
        self.add_scorer(scorer_name);
        self
    }

    pub fn add_scorer(&mut self, scorer_name: &str) {
        if self.scorer(scorer_name).is_some() {
            debug!(mesh = %self.name, scorer = %scorer_name, "duplicate_scorer_ignored");
            return;
        }
        self.scorers.push(Scorer::new(scorer_name, self.x, self.y));
    }

    pub fn scorer(&self, name: &str) -> Option<&Scorer> {
        self.scorers.iter().find(|s| s.name == name)
    }

    pub fn scorers(&self) -> &[Scorer] {
        &self.scorers
    }

    /// Offer one energy deposit at (x, y) to every scorer
    pub fn score(
        &mut self,
        x: f64,
        y: f64,
        energy: f64,
        tag: Option<&TrackLineageTag>,
        metrics: &ScoringMetrics,
    ) {
        for scorer in self.scorers.iter_mut() {
            let event = ScoringEvent { tag, energy, scorer_name: &scorer.name };
            let category = match &scorer.filter {
                Some(filter) if !filter.accept(&event) => {
                    metrics.record_rejected();
                    continue;
                }
                Some(filter) => Some(filter.category()),
                None => None,
            };
            if scorer.builder.fill(x, y, energy) {
                metrics.record_accepted(category);
            } else {
                metrics.record_outside();
            }
        }
    }

    /// Current contents of every scorer
    pub fn snapshot_maps(&self) -> Vec<DoseMap> {
        self.scorers.iter().map(|s| s.builder.snapshot()).collect()
    }

    /// Finish the run and hand out one map per scorer
    pub fn into_maps(self) -> Vec<DoseMap> {
        self.scorers.into_iter().map(|s| s.builder.build()).collect()
    }
}

impl FilterTarget for ScoringMesh {
    fn mesh_name(&self) -> &str {
        &self.name
    }

    fn has_scorer(&self, scorer_name: &str) -> bool {
        self.scorer(scorer_name).is_some()
    }

    fn set_filter(&mut self, scorer_name: &str, filter: DoseCarrierFilter) -> bool {
        match self.scorers.iter_mut().find(|s| s.name == scorer_name) {
            Some(scorer) => {
                scorer.filter = Some(filter);
                true
            }
            None => false,
        }
    }
}

/// All meshes active for a run
#[derive(Debug, Clone, Default)]
pub struct MeshRegistry {
    meshes: Vec<ScoringMesh>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mesh: ScoringMesh) {
        self.meshes.push(mesh);
    }

    pub fn meshes(&self) -> &[ScoringMesh] {
        &self.meshes
    }

    /// Offer one deposit to every mesh
    pub fn score(
        &mut self,
        x: f64,
        y: f64,
        energy: f64,
        tag: Option<&TrackLineageTag>,
        metrics: &ScoringMetrics,
    ) {
        for mesh in self.meshes.iter_mut() {
            mesh.score(x, y, energy, tag, metrics);
        }
    }

    pub fn into_maps(self) -> Vec<DoseMap> {
        self.meshes.into_iter().flat_map(ScoringMesh::into_maps).collect()
    }
}

impl MeshRegistryHandle for MeshRegistry {
    type Mesh = ScoringMesh;

    fn meshes_mut(&mut self) -> &mut [ScoringMesh] {
        &mut self.meshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CarrierCategory;

    fn mesh() -> ScoringMesh {
        let x = Axis::new(10, -5.0, 5.0).unwrap();
        let y = Axis::new(10, -5.0, 5.0).unwrap();
        ScoringMesh::new("phantom", x, y)
            .with_scorer("eDep")
            .with_scorer("eDepPrimary")
            .with_scorer("eDepSecondary")
    }

    fn primary_tag() -> TrackLineageTag {
        let mut tag = TrackLineageTag::new();
        tag.mark_primary_dose_carrier();
        tag
    }

    #[test]
    fn test_duplicate_scorer_ignored() {
        let m = mesh().with_scorer("eDep");
        assert_eq!(m.scorers().len(), 3);
    }

    #[test]
    fn test_unfiltered_scorers_take_everything() {
        let metrics = ScoringMetrics::new();
        let mut m = mesh();
        m.score(0.5, 0.5, 2.0, None, &metrics);
        m.score(0.5, 0.5, 3.0, Some(&primary_tag()), &metrics);
        let maps = m.into_maps();
        assert!(maps.iter().all(|map| map.integral() == 5.0));
    }

    #[test]
    fn test_filtered_scorers_split_deposits() {
        let metrics = ScoringMetrics::new();
        let mut m = mesh();
        m.set_filter(
            "eDepPrimary",
            DoseCarrierFilter::for_scorer("eDepPrimary", CarrierCategory::Primary),
        );
        m.set_filter(
            "eDepSecondary",
            DoseCarrierFilter::for_scorer("eDepSecondary", CarrierCategory::Secondary),
        );
        m.score(0.5, 0.5, 2.0, None, &metrics);
        m.score(0.5, 0.5, 3.0, Some(&primary_tag()), &metrics);
        m.score(0.5, 0.5, 4.0, Some(&TrackLineageTag::new()), &metrics);

        let maps = m.into_maps();
        let total = |name: &str| maps.iter().find(|m| m.name() == name).unwrap().integral();
        assert_eq!(total("eDep"), 9.0);
        assert_eq!(total("eDepPrimary"), 3.0);
        assert_eq!(total("eDepSecondary"), 6.0);

        let summary = metrics.report();
        assert_eq!(summary.primary_accepted, 1);
        assert_eq!(summary.secondary_accepted, 2);
        assert_eq!(summary.rejected_total, 3);
    }

    #[test]
    fn test_outside_deposit_counted() {
        let metrics = ScoringMetrics::new();
        let mut m = mesh();
        m.score(50.0, 0.0, 1.0, None, &metrics);
        assert_eq!(metrics.report().outside_total, 3);
        assert!(m.snapshot_maps().iter().all(|map| map.integral() == 0.0));
    }
}
