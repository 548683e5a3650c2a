//! Configuration for Diction Series.

use crate::core::{AnalysisOptions, OverlapPolicy, ParticipantFilter, WindowConfig};
use crate::io::{DictionaryColumns, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration for analysis runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window length and step
    pub window: WindowConfig,

    /// How utterances are assigned to windows
    pub policy: OverlapPolicy,

    /// Speakers eligible for matching under the bounded policy
    pub participants: Vec<String>,

    /// Categorized word dictionary (CSV)
    pub dictionary_path: PathBuf,

    /// Column names in the dictionary file
    pub dictionary_columns: DictionaryColumns,

    /// Root holding `group N` transcript directories
    pub transcripts_dir: PathBuf,

    /// Root for analysis output
    pub output_dir: PathBuf,

    /// Per-session `session,start,end` cutoffs (bounded policy)
    pub cutoffs_path: Option<PathBuf>,

    /// Number of `group N` directories to scan
    pub num_groups: usize,

    /// Table format for outputs
    pub output_format: OutputFormat,

    /// Worker threads for batch runs
    pub workers: usize,

    /// Path for run logs
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diction-series");

        Self {
            window: WindowConfig::default(),
            policy: OverlapPolicy::Unbounded,
            participants: Vec::new(),
            dictionary_path: PathBuf::from("data/cata-dict.csv"),
            dictionary_columns: DictionaryColumns::default(),
            transcripts_dir: PathBuf::from("data/transcripts"),
            output_dir: PathBuf::from("data/analysis_results"),
            cutoffs_path: None,
            num_groups: 12,
            output_format: OutputFormat::Csv,
            workers: default_workers(),
            data_path: data_dir,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{path:?}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diction-series")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Analysis options derived from this configuration.
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            window: self.window,
            policy: self.policy,
            participants: ParticipantFilter::new(self.participants.iter().cloned()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.size_secs, 30.0);
        assert_eq!(config.window.step_secs, 15.0);
        assert_eq!(config.policy, OverlapPolicy::Unbounded);
        assert_eq!(config.num_groups, 12);
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.policy = OverlapPolicy::Bounded;
        config.participants = vec!["A".to_string(), "B".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.policy, OverlapPolicy::Bounded);
        assert!(loaded.analysis_options().participants.allows("B"));
        assert!(!loaded.analysis_options().participants.allows("C"));

        // Missing keys fall back to defaults
        std::fs::write(&path, r#"{"num_groups": 3}"#).unwrap();
        let partial = Config::load_from(&path).unwrap();
        assert_eq!(partial.num_groups, 3);
        assert_eq!(partial.window, WindowConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"window": {"size_secs": 30.0, "step_secs": -1.0}}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/diction-series.json")).unwrap();
        assert_eq!(config.num_groups, 12);
    }
}
