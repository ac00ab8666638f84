//! Infrastructure - configuration, errors and metrics

pub mod config;
pub mod error;
pub mod metrics;

pub use config::Config;
pub use error::{DoseError, DoseResult};
pub use metrics::ScoringMetrics;
