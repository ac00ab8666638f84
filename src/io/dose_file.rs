//! Persisted dose maps
//!
//! A dose file is a JSON object holding named maps:
//!
//! ```json
//! { "maps": { "h20": { "name": "h20", "x": {...}, "y": {...}, "values": [...], ... } } }
//! ```

use crate::domain::dose_map::DoseMap;
use crate::infra::error::{DoseError, DoseResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoseMapFile {
    pub maps: BTreeMap<String, DoseMap>,
    /// Path the file was read from, for diagnostics
    #[serde(skip)]
    source: String,
}

impl DoseMapFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a map under its own name, replacing any previous one
    pub fn insert(&mut self, map: DoseMap) {
        self.maps.insert(map.name().to_string(), map);
    }

    pub fn get(&self, name: &str) -> Option<&DoseMap> {
        self.maps.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    /// Named map, or `MapNotFound` naming the source file
    pub fn require(&self, name: &str) -> DoseResult<&DoseMap> {
        let map = self.maps.get(name).ok_or_else(|| DoseError::MapNotFound {
            path: self.source.clone(),
            name: name.to_string(),
        })?;

        info!(
            file = %self.source,
            map = %name,
            bins = %map.geometry_label(),
            entries = map.entries(),
            integral = map.integral(),
            "dose_map_loaded"
        );
        Ok(map)
    }

    /// Read and validate every map in a file
    pub fn read<P: AsRef<Path>>(path: P) -> DoseResult<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        if !path.exists() {
            return Err(DoseError::FileNotFound { path: shown });
        }

        let file = fs::File::open(path)?;
        let mut parsed: DoseMapFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| DoseError::Parse { path: shown.clone(), reason: e.to_string() })?;

        for (name, map) in &parsed.maps {
            map.validate().map_err(|e| DoseError::Parse {
                path: shown.clone(),
                reason: format!("map '{}': {}", name, e),
            })?;
        }

        debug!(file = %shown, maps = parsed.maps.len(), "dose_file_read");
        parsed.source = shown;
        Ok(parsed)
    }

    /// Write the file, creating parent directories as needed
    pub fn write<P: AsRef<Path>>(&self, path: P) -> DoseResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut writer, self).map_err(|e| DoseError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        writer.flush()?;

        info!(file = %path.display(), maps = self.maps.len(), "dose_file_written");
        Ok(())
    }
}

/// Load one named map from a dose file
pub fn load_map<P: AsRef<Path>>(path: P, name: &str) -> DoseResult<DoseMap> {
    DoseMapFile::read(path)?.require(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dose_map::{Axis, DoseMapBuilder};
    use tempfile::tempdir;

    fn sample(name: &str) -> DoseMap {
        let x = Axis::new(3, -1.5, 1.5).unwrap();
        let y = Axis::new(2, 0.0, 2.0).unwrap();
        let mut b = DoseMapBuilder::new(name, x, y);
        b.fill(0.0, 0.5, 2.5);
        b.fill(1.0, 1.5, 1.0);
        b.build()
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dose.json");
        let mut file = DoseMapFile::new();
        file.insert(sample("h20"));
        file.insert(sample("eDepPrimary"));
        file.write(&path).unwrap();

        let map = load_map(&path, "h20").unwrap();
        assert_eq!(map.name(), "h20");
        assert_eq!(map.integral(), 3.5);
        assert_eq!(map.get(1, 0).unwrap(), 2.5);
        assert_eq!(map.entries(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_map(dir.path().join("absent.json"), "h20").unwrap_err();
        assert!(matches!(err, DoseError::FileNotFound { .. }));
        assert_eq!(err.category(), "InputError");
    }

    #[test]
    fn test_missing_map() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dose.json");
        let mut file = DoseMapFile::new();
        file.insert(sample("h10"));
        file.write(&path).unwrap();

        let err = load_map(&path, "h20").unwrap_err();
        assert!(matches!(err, DoseError::MapNotFound { ref name, .. } if name == "h20"));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dose.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_map(&path, "h20"), Err(DoseError::Parse { .. })));
    }

    #[test]
    fn test_degenerate_axis_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dose.json");
        let body = r#"{"maps":{"h20":{"name":"h20",
            "x":{"bins":0,"min":0.0,"max":1.0},
            "y":{"bins":3,"min":0.0,"max":3.0},
            "values":[],"sumw2":[],"entries":[]}}}"#;
        std::fs::write(&path, body).unwrap();

        let err = load_map(&path, "h20").unwrap_err();
        assert!(matches!(err, DoseError::Parse { .. }));
        assert_eq!(err.category(), "InputError");
        assert!(err.to_string().contains("map 'h20'"));

        let inverted = body.replace(r#""bins":0,"min":0.0,"max":1.0"#, r#""bins":2,"min":1.0,"max":-1.0"#);
        std::fs::write(&path, inverted).unwrap();
        assert!(matches!(load_map(&path, "h20"), Err(DoseError::Parse { .. })));
    }
}
