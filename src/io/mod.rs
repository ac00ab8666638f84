//! IO modules - files in and out
//!
//! - `dose_file` - persisted dose maps (JSON)
//! - `step_reader` - JSONL step streams
//! - `report` - comparison report (JSON and text)
//! - `render` - PNG comparison panels

pub mod dose_file;
pub mod render;
pub mod report;
pub mod step_reader;

pub use dose_file::{load_map, DoseMapFile};
pub use report::{CarrierSummary, ComparisonReport};
pub use step_reader::read_steps;
