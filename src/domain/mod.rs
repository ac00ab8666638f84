//! Domain models - tracks, lineage tags and dose maps
//!
//! - `types` - track ids, particle kinds, step records, scoring events
//! - `lineage` - `TrackLineageTag` and the `Track` that owns it
//! - `dose_map` - immutable 2-D dose histogram and its builder
//! - `region` - rectangular and radial aggregation regions

pub mod dose_map;
pub mod lineage;
pub mod region;
pub mod types;

pub use dose_map::{Axis, BinPosition, DoseMap, DoseMapBuilder};
pub use lineage::{Track, TrackLineageTag};
pub use region::{RadialBand, Region};
pub use types::{CarrierCategory, ParticleKind, ScoringEvent, StepRecord, TrackId};
