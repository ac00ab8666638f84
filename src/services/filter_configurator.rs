//! Run-start wiring of dose-carrier filters onto named scorers
//!
//! For every mesh and every rule, a filter named `<scorer>Filter` is
//! attached when the scorer exists. Missing scorers are skipped; setup is
//! best-effort and never fails the run. Attaching replaces whatever filter
//! the scorer had, so calling this twice leaves one filter per scorer.

use crate::domain::types::CarrierCategory;
use crate::services::carrier_filter::DoseCarrierFilter;
use tracing::{debug, info};

/// Scorer name paired with the category its filter selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRule {
    pub scorer_name: &'static str,
    pub category: CarrierCategory,
}

/// Rules applied at every run start
pub const DOSE_FILTER_RULES: [FilterRule; 2] = [
    FilterRule { scorer_name: "eDepPrimary", category: CarrierCategory::Primary },
    FilterRule { scorer_name: "eDepSecondary", category: CarrierCategory::Secondary },
];

/// A mesh that can host scorer filters
pub trait FilterTarget {
    fn mesh_name(&self) -> &str;

    fn has_scorer(&self, scorer_name: &str) -> bool;

    /// Attach `filter`, replacing any existing one; false if the scorer is absent
    fn set_filter(&mut self, scorer_name: &str, filter: DoseCarrierFilter) -> bool;
}

/// Access to the meshes of a run
pub trait MeshRegistryHandle {
    type Mesh: FilterTarget;

    fn meshes_mut(&mut self) -> &mut [Self::Mesh];
}

/// Attach filters for `rules` on every mesh; returns the number attached
pub fn configure_filters<R: MeshRegistryHandle>(registry: &mut R, rules: &[FilterRule]) -> usize {
    let mut attached = 0;
    for mesh in registry.meshes_mut() {
        for rule in rules {
            if !mesh.has_scorer(rule.scorer_name) {
                debug!(
                    mesh = %mesh.mesh_name(),
                    scorer = %rule.scorer_name,
                    "scorer_absent_filter_skipped"
                );
                continue;
            }
            let filter = DoseCarrierFilter::for_scorer(rule.scorer_name, rule.category);
            let filter_name = filter.name().to_string();
            if mesh.set_filter(rule.scorer_name, filter) {
                attached += 1;
                debug!(
                    mesh = %mesh.mesh_name(),
                    scorer = %rule.scorer_name,
                    filter = %filter_name,
                    category = %rule.category.as_str(),
                    "dose_filter_attached"
                );
            }
        }
    }
    info!(filters_attached = attached, "dose_filters_configured");
    attached
}

/// Attach the standard primary/secondary filters
pub fn configure_dose_filters<R: MeshRegistryHandle>(registry: &mut R) -> usize {
    configure_filters(registry, &DOSE_FILTER_RULES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal mesh that records what was attached
    struct FakeMesh {
        name: String,
        filters: HashMap<String, Option<DoseCarrierFilter>>,
        set_calls: usize,
    }

    impl FakeMesh {
        fn with_scorers(names: &[&str]) -> Self {
            Self {
                name: "mesh".to_string(),
                filters: names.iter().map(|n| (n.to_string(), None)).collect(),
                set_calls: 0,
            }
        }
    }

    impl FilterTarget for FakeMesh {
        fn mesh_name(&self) -> &str {
            &self.name
        }

        fn has_scorer(&self, scorer_name: &str) -> bool {
            self.filters.contains_key(scorer_name)
        }

        fn set_filter(&mut self, scorer_name: &str, filter: DoseCarrierFilter) -> bool {
            self.set_calls += 1;
            match self.filters.get_mut(scorer_name) {
                Some(slot) => {
                    *slot = Some(filter);
                    true
                }
                None => false,
            }
        }
    }

    struct FakeRegistry(Vec<FakeMesh>);

    impl MeshRegistryHandle for FakeRegistry {
        type Mesh = FakeMesh;

        fn meshes_mut(&mut self) -> &mut [FakeMesh] {
            &mut self.0
        }
    }

    #[test]
    fn test_only_primary_scorer_present() {
        let mut registry = FakeRegistry(vec![FakeMesh::with_scorers(&["eDepPrimary"])]);
        assert_eq!(configure_dose_filters(&mut registry), 1);

        let mesh = &registry.0[0];
        let filter = mesh.filters["eDepPrimary"].as_ref().unwrap();
        assert_eq!(filter.name(), "eDepPrimaryFilter");
        assert_eq!(filter.category(), CarrierCategory::Primary);
        assert!(!mesh.filters.contains_key("eDepSecondary"));
        assert_eq!(mesh.set_calls, 1);
    }

    #[test]
    fn test_no_meshes() {
        let mut registry = FakeRegistry(Vec::new());
        assert_eq!(configure_dose_filters(&mut registry), 0);
    }

    #[test]
    fn test_every_mesh_configured() {
        let mut registry = FakeRegistry(vec![
            FakeMesh::with_scorers(&["eDep", "eDepPrimary", "eDepSecondary"]),
            FakeMesh::with_scorers(&["eDepSecondary"]),
            FakeMesh::with_scorers(&["eDep"]),
        ]);
        assert_eq!(configure_dose_filters(&mut registry), 3);
        assert!(registry.0[0].filters["eDep"].is_none());
        assert_eq!(
            registry.0[1].filters["eDepSecondary"].as_ref().unwrap().category(),
            CarrierCategory::Secondary
        );
    }

    #[test]
    fn test_reconfigure_replaces_filters() {
        let mut registry =
            FakeRegistry(vec![FakeMesh::with_scorers(&["eDepPrimary", "eDepSecondary"])]);
        assert_eq!(configure_dose_filters(&mut registry), 2);
        assert_eq!(configure_dose_filters(&mut registry), 2);
        let mesh = &registry.0[0];
        assert_eq!(mesh.filters.values().filter(|f| f.is_some()).count(), 2);
    }

    #[test]
    fn test_custom_rules() {
        let rules = [FilterRule { scorer_name: "eDep", category: CarrierCategory::Secondary }];
        let mut registry = FakeRegistry(vec![FakeMesh::with_scorers(&["eDep"])]);
        assert_eq!(configure_filters(&mut registry, &rules), 1);
        assert_eq!(registry.0[0].filters["eDep"].as_ref().unwrap().name(), "eDepFilter");
    }
}
