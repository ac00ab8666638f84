//! JSONL step streams
//!
//! One `StepRecord` per line. Blank lines and lines starting with `#` are
//! skipped.

use crate::domain::types::StepRecord;
use crate::infra::error::{DoseError, DoseResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Parse every step in a reader
pub fn parse_steps<R: BufRead>(reader: R, source: &str) -> DoseResult<Vec<StepRecord>> {
    let mut steps = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: StepRecord = serde_json::from_str(trimmed).map_err(|e| DoseError::Parse {
            path: source.to_string(),
            reason: format!("line {}: {}", idx + 1, e),
        })?;
        steps.push(step);
    }
    debug!(source = %source, steps = steps.len(), "steps_parsed");
    Ok(steps)
}

/// Read a step file from disk
pub fn read_steps<P: AsRef<Path>>(path: P) -> DoseResult<Vec<StepRecord>> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    if !path.exists() {
        return Err(DoseError::FileNotFound { path: shown });
    }
    parse_steps(BufReader::new(File::open(path)?), &shown)
}
