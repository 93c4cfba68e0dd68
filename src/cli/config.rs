//! CLI Configuration.
//!
//! Configuration management for the CLI tool: a JSON file plus `SYNTHUSD_*`
//! environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::output::OutputFormat;
use crate::core::config::EngineParams;

// ═══════════════════════════════════════════════════════════════════════════════
// CLI CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log filter directive (`info`, `synthusd=debug`, ...)
    pub log_level: String,
    /// Output format
    pub format: OutputFormat,
    /// Colored text output
    pub color: bool,
    /// Scenario run when none is given on the command line
    pub scenario: Option<PathBuf>,
    /// Risk parameters for engines the CLI builds
    pub params: EngineParams,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            format: OutputFormat::Text,
            color: true,
            scenario: None,
            params: EngineParams::default(),
        }
    }
}

impl CliConfig {
    /// Load from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Load from environment variables on top of the defaults
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply `SYNTHUSD_*` environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(level) = std::env::var("SYNTHUSD_LOG") {
            self.log_level = level;
        }

        if let Ok(format) = std::env::var("SYNTHUSD_FORMAT") {
            if let Ok(format) = format.parse() {
                self.format = format;
            }
        }

        if let Ok(path) = std::env::var("SYNTHUSD_SCENARIO") {
            self.scenario = Some(PathBuf::from(path));
        }

        if std::env::var_os("NO_COLOR").is_some() {
            self.color = false;
        }

        self
    }

    /// Load `path` if it exists, otherwise defaults; then apply the environment
    pub fn resolve(path: &Path) -> Result<Self, ConfigError> {
        let base = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        let config = base.with_env();
        config.validate()?;
        Ok(config)
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Validation("log level cannot be empty".into()));
        }

        self.params
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("synthusd");
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".synthusd");
    }

    PathBuf::from(".synthusd")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CliConfig::default();
        assert_eq!(config.format, OutputFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CliConfig::default();
        config.log_level = " ".into();
        assert!(config.validate().is_err());

        let mut config = CliConfig::default();
        config.params.liquidation_threshold = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = CliConfig::default();
        config.format = OutputFormat::JsonPretty;
        config.scenario = Some(PathBuf::from("demo.json"));
        config.save(&path).unwrap();

        assert_eq!(CliConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.params, EngineParams::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
