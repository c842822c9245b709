//! Controller configuration
//!
//! All knobs have compiled defaults; a TOML file may override any subset.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// Tunable controller parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Progress polling cadence while playing, in milliseconds
    pub progress_interval_ms: u64,

    /// Relative seek distance for transport skip actions, in milliseconds
    pub skip_interval_ms: u64,

    /// Controller event queue depth
    pub command_capacity: usize,

    /// Outbound event bus buffer per subscriber
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 1000,
            skip_interval_ms: 30_000,
            command_capacity: 64,
            event_capacity: 100,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from a TOML file
    ///
    /// Keys absent from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Load from an optional path, falling back to defaults when none given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.progress_interval_ms, 1000);
        assert_eq!(config.skip_interval_ms, 30_000);
        assert_eq!(config.command_capacity, 64);
        assert_eq!(config.event_capacity, 100);
    }

    #[test]
    fn test_partial_file_fills_remaining_from_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "progress_interval_ms = 250").unwrap();

        let config = ControllerConfig::load(file.path()).unwrap();
        assert_eq!(config.progress_interval_ms, 250);
        assert_eq!(config.skip_interval_ms, 30_000);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ControllerConfig::load(Path::new("/nonexistent/tonearm.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = ControllerConfig::load_or_default(None).unwrap();
        assert_eq!(config.progress_interval_ms, 1000);
    }
}
