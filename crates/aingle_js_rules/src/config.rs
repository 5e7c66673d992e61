//! Configuration for the script rule engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::script::DEFAULT_MAX_NESTING_DEPTH;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// The configuration text is not valid JSON for the expected type.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Settings for [`RuleEngine`](crate::RuleEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of scripting contexts per thread.
    pub max_nesting_depth: usize,
    /// Keep running the remaining rules when one fails.
    pub continue_on_rule_error: bool,
    /// Also insert inferred triples into the default graph.
    pub write_back: bool,
    /// Log every inferred triple at `debug` level.
    pub trace_inferences: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            continue_on_rule_error: false,
            write_back: false,
            trace_inferences: false,
        }
    }
}

impl EngineConfig {
    /// The first failing rule aborts the run and recursion is kept shallow.
    pub fn strict() -> Self {
        Self {
            max_nesting_depth: 4,
            ..Self::default()
        }
    }

    /// Failing rules are logged and skipped, and inferences are written back.
    pub fn lenient() -> Self {
        Self {
            max_nesting_depth: 64,
            continue_on_rule_error: true,
            write_back: true,
            trace_inferences: false,
        }
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_continue_on_rule_error(mut self, enabled: bool) -> Self {
        self.continue_on_rule_error = enabled;
        self
    }

    pub fn with_write_back(mut self, enabled: bool) -> Self {
        self.write_back = enabled;
        self
    }

    pub fn with_trace_inferences(mut self, enabled: bool) -> Self {
        self.trace_inferences = enabled;
        self
    }

    /// Parses and validates a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_nesting_depth, 16);
        assert!(!config.continue_on_rule_error);
        assert!(!config.write_back);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert!(!EngineConfig::strict().continue_on_rule_error);
        assert!(EngineConfig::lenient().continue_on_rule_error);
        assert!(EngineConfig::lenient().write_back);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{"write_back": true}"#).unwrap();
        assert!(config.write_back);
        assert_eq!(config.max_nesting_depth, 16);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = EngineConfig::from_json(r#"{"max_nesting_depth": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            EngineConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"continue_on_rule_error": true, "max_nesting_depth": 3}}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(config.continue_on_rule_error);
        assert_eq!(config.max_nesting_depth, 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
