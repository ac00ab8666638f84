//! Dose-carrier filter for scorers
//!
//! A stateless predicate that splits energy deposits between the primary
//! dose carrier (first charged secondary of a photon chain) and everything
//! else. A track without lineage metadata is treated as not primary, so
//! `Secondary` is the catch-all.

use crate::domain::types::{CarrierCategory, ScoringEvent};

/// Decide whether `event` belongs to `category`
#[inline]
pub fn accept(category: CarrierCategory, event: &ScoringEvent<'_>) -> bool {
    let is_primary = event.tag.is_some_and(|tag| tag.is_primary_dose_carrier());
    match category {
        CarrierCategory::Primary => is_primary,
        CarrierCategory::Secondary => !is_primary,
    }
}

/// Named filter attached to a scorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseCarrierFilter {
    name: String,
    category: CarrierCategory,
}

impl DoseCarrierFilter {
    pub fn new(name: impl Into<String>, category: CarrierCategory) -> Self {
        Self { name: name.into(), category }
    }

    /// Filter named `<scorer_name>Filter`
    pub fn for_scorer(scorer_name: &str, category: CarrierCategory) -> Self {
        Self::new(format!("{}Filter", scorer_name), category)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> CarrierCategory {
        self.category
    }

    #[inline]
    pub fn accept(&self, event: &ScoringEvent<'_>) -> bool {
        accept(self.category, event)
    }
}
