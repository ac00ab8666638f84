//! Error taxonomy for dose scoring and comparison

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoseError {
    /// Scorer or mesh absent during filter setup; absorbed by the caller
    #[error("configuration: {0}")]
    Configuration(String),

    #[error("input file not found: {path}")]
    FileNotFound { path: String },

    #[error("dose map '{name}' not found in {path}")]
    MapNotFound { path: String, name: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bin geometry mismatch: {left} vs {right}")]
    ShapeMismatch { left: String, right: String },

    #[error("failed to render {path}: {reason}")]
    Render { path: String, reason: String },

    #[error("bin ({x_bin}, {y_bin}) out of range for {x_bins}x{y_bins} map")]
    Index { x_bin: usize, y_bin: usize, x_bins: usize, y_bins: usize },
}

impl DoseError {
    /// Taxonomy name used in diagnostics
    pub fn category(&self) -> &'static str {
        match self {
            DoseError::Configuration(_) => "ConfigurationError",
            DoseError::FileNotFound { .. }
            | DoseError::MapNotFound { .. }
            | DoseError::Parse { .. }
            | DoseError::Io(_) => "InputError",
            DoseError::ShapeMismatch { .. } => "ShapeMismatchError",
            DoseError::Index { .. } => "IndexError",
            DoseError::Render { .. } => "OutputError",
        }
    }

    /// Whether the affected operation must stop
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DoseError::Configuration(_))
    }
}

pub type DoseResult<T> = Result<T, DoseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(DoseError::Configuration("x".into()).category(), "ConfigurationError");
        assert_eq!(
            DoseError::MapNotFound { path: "a.json".into(), name: "h20".into() }.category(),
            "InputError"
        );
        assert_eq!(
            DoseError::Index { x_bin: 9, y_bin: 0, x_bins: 2, y_bins: 2 }.category(),
            "IndexError"
        );
        let render = DoseError::Render { path: "cmp.png".into(), reason: "no font".into() };
        assert_eq!(render.category(), "OutputError");
        assert!(render.is_fatal());
    }

    #[test]
    fn test_configuration_is_not_fatal() {
        assert!(!DoseError::Configuration("missing scorer".into()).is_fatal());
        assert!(DoseError::ShapeMismatch { left: "a".into(), right: "b".into() }.is_fatal());
    }
}
