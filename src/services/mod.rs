//! Services - scoring, lineage and comparison logic
//!
//! - `carrier_filter` - primary/secondary dose-carrier acceptance
//! - `filter_configurator` - attaches carrier filters to named scorers
//! - `scoring` - scoring meshes and their registry
//! - `lineage_tracker` - per-step lineage classification
//! - `aggregator` - region sums, profiles and primary/secondary fractions
//! - `comparison` - bin-wise map comparison
//! - `significance` - chi-square test and verdicts
//! - `conversion` - MeV to Gy
//! - `symmetry` - lateral profile symmetry

pub mod aggregator;
pub mod carrier_filter;
pub mod comparison;
pub mod conversion;
pub mod filter_configurator;
pub mod lineage_tracker;
pub mod scoring;
pub mod significance;
pub mod symmetry;

pub use aggregator::{
    CarrierBreakdown, CarrierFraction, CarrierMaps, Profile, RegionAggregator, WindowStats,
};
pub use carrier_filter::DoseCarrierFilter;
pub use comparison::{DifferenceSummary, DoseComparisonEngine};
pub use conversion::{DoseConversion, VoxelSize};
pub use filter_configurator::{configure_dose_filters, configure_filters, FilterRule};
pub use lineage_tracker::LineageTracker;
pub use scoring::{MeshRegistry, ScoringMesh};
pub use significance::{ChiSquareResult, SignificancePolicy, Verdict};
pub use symmetry::{analyze_symmetry, SymmetryAnalysis};
