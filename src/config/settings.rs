//! Engine settings and configuration management.
//!
//! This module provides the tunables of the detection engine, supporting
//! multiple configuration sources with proper precedence.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::engine::TorHeuristic;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML configuration.
    #[error("Failed to serialize TOML configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Failed to parse JSON configuration.
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Unsupported file format.
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Main engine settings.
///
/// # Configuration Precedence
///
/// Settings are applied in the following order (later sources override earlier):
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
/// 4. CLI arguments
///
/// # Example
///
/// ```rust
/// use privacy_probe::config::EngineSettings;
///
/// let settings = EngineSettings::default()
///     .with_probe_timeout(1000)
///     .with_findings_limit(3);
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Timeout applied to each local environment probe, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Timeout for the Tor exit-list fetch, in milliseconds.
    #[serde(default = "default_tor_list_timeout_ms")]
    pub tor_list_timeout_ms: u64,

    /// Tor heuristic score for a definite match.
    #[serde(default = "default_tor_definite_threshold")]
    pub tor_definite_threshold: u32,

    /// Tor heuristic score for the synthetic tally result to be positive.
    #[serde(default = "default_tor_likely_threshold")]
    pub tor_likely_threshold: u32,

    /// Number of findings shown in a report.
    #[serde(default = "default_findings_display_limit")]
    pub findings_display_limit: usize,

    /// Per-probe weight overrides, keyed by probe id.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub weight_overrides: HashMap<String, u32>,
}

// Default value functions for serde
fn default_probe_timeout_ms() -> u64 {
    1500
}

fn default_tor_list_timeout_ms() -> u64 {
    5000
}

fn default_tor_definite_threshold() -> u32 {
    60
}

fn default_tor_likely_threshold() -> u32 {
    30
}

fn default_findings_display_limit() -> usize {
    5
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            tor_list_timeout_ms: default_tor_list_timeout_ms(),
            tor_definite_threshold: default_tor_definite_threshold(),
            tor_likely_threshold: default_tor_likely_threshold(),
            findings_display_limit: default_findings_display_limit(),
            weight_overrides: HashMap::new(),
        }
    }
}

impl EngineSettings {
    /// Creates a new EngineSettings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a configuration file.
    ///
    /// Supports both TOML and JSON formats, detected by file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match file_extension(path).as_str() {
            "toml" => Ok(toml::from_str(&content)?),
            "json" => Ok(serde_json::from_str(&content)?),
            ext => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Saves settings to a configuration file.
    ///
    /// The format is determined by the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        let content = match file_extension(path).as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            ext => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Loads settings from environment variables.
    ///
    /// Environment variables are prefixed with `PRIVACY_PROBE_`:
    /// - `PRIVACY_PROBE_PROBE_TIMEOUT_MS`
    /// - `PRIVACY_PROBE_TOR_LIST_TIMEOUT_MS`
    /// - `PRIVACY_PROBE_TOR_DEFINITE_THRESHOLD`
    /// - `PRIVACY_PROBE_TOR_LIKELY_THRESHOLD`
    /// - `PRIVACY_PROBE_FINDINGS_LIMIT`
    /// - `PRIVACY_PROBE_WEIGHTS` (`probe_id=weight,probe_id=weight`)
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings
    }

    /// Applies environment variable overrides to current settings.
    fn apply_env_overrides(&mut self) {
        if let Some(timeout) = env_parse("PRIVACY_PROBE_PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = timeout;
        }

        if let Some(timeout) = env_parse("PRIVACY_PROBE_TOR_LIST_TIMEOUT_MS") {
            self.tor_list_timeout_ms = timeout;
        }

        if let Some(threshold) = env_parse("PRIVACY_PROBE_TOR_DEFINITE_THRESHOLD") {
            self.tor_definite_threshold = threshold;
        }

        if let Some(threshold) = env_parse("PRIVACY_PROBE_TOR_LIKELY_THRESHOLD") {
            self.tor_likely_threshold = threshold;
        }

        if let Some(limit) = env_parse("PRIVACY_PROBE_FINDINGS_LIMIT") {
            self.findings_display_limit = limit;
        }

        if let Ok(val) = env::var("PRIVACY_PROBE_WEIGHTS") {
            self.weight_overrides.extend(parse_weight_overrides(&val));
        }
    }

    /// Merges current settings with environment variable overrides.
    pub fn merge_with_env(mut self) -> Self {
        self.apply_env_overrides();
        self
    }

    /// Merges settings with CLI arguments.
    pub fn merge_with_args(mut self, args: &CliArgs) -> Self {
        if let Some(timeout) = args.probe_timeout_ms {
            self.probe_timeout_ms = timeout;
        }
        if let Some(timeout) = args.tor_list_timeout_ms {
            self.tor_list_timeout_ms = timeout;
        }
        if let Some(limit) = args.findings_limit {
            self.findings_display_limit = limit;
        }
        for (probe_id, weight) in &args.weight_overrides {
            self.weight_overrides.insert(probe_id.clone(), *weight);
        }
        self
    }

    /// Validates all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_ms < 50 {
            return Err(ConfigError::ValidationError(
                "Probe timeout must be at least 50ms".to_string(),
            ));
        }
        if self.probe_timeout_ms > 10_000 {
            return Err(ConfigError::ValidationError(
                "Probe timeout cannot exceed 10000ms".to_string(),
            ));
        }

        if self.tor_list_timeout_ms < self.probe_timeout_ms {
            return Err(ConfigError::ValidationError(format!(
                "Tor list timeout ({}ms) cannot be shorter than the probe timeout ({}ms)",
                self.tor_list_timeout_ms, self.probe_timeout_ms
            )));
        }
        if self.tor_list_timeout_ms > 60_000 {
            return Err(ConfigError::ValidationError(
                "Tor list timeout cannot exceed 60000ms".to_string(),
            ));
        }

        for (name, value) in [
            ("definite", self.tor_definite_threshold),
            ("likely", self.tor_likely_threshold),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "Tor {} threshold must be between 1 and 100, got {}",
                    name, value
                )));
            }
        }
        if self.tor_likely_threshold > self.tor_definite_threshold {
            return Err(ConfigError::ValidationError(
                "Tor likely threshold cannot exceed the definite threshold".to_string(),
            ));
        }

        if self.findings_display_limit == 0 {
            return Err(ConfigError::ValidationError(
                "Findings display limit must be at least 1".to_string(),
            ));
        }

        if let Some(id) = self.weight_overrides.keys().find(|id| id.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "Weight override has an empty probe id: {:?}",
                id
            )));
        }

        Ok(())
    }

    /// Per-probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Tor exit-list timeout as a [`Duration`].
    pub fn tor_list_timeout(&self) -> Duration {
        Duration::from_millis(self.tor_list_timeout_ms)
    }

    /// Tor heuristic configured with these thresholds.
    pub fn tor_heuristic(&self) -> TorHeuristic {
        TorHeuristic::new(self.tor_definite_threshold, self.tor_likely_threshold)
    }

    // Builder-style methods for convenient configuration

    /// Sets the per-probe timeout in milliseconds.
    pub fn with_probe_timeout(mut self, timeout_ms: u64) -> Self {
        self.probe_timeout_ms = timeout_ms;
        self
    }

    /// Sets the Tor exit-list timeout in milliseconds.
    pub fn with_tor_list_timeout(mut self, timeout_ms: u64) -> Self {
        self.tor_list_timeout_ms = timeout_ms;
        self
    }

    /// Sets both Tor heuristic thresholds.
    pub fn with_tor_thresholds(mut self, definite: u32, likely: u32) -> Self {
        self.tor_definite_threshold = definite;
        self.tor_likely_threshold = likely;
        self
    }

    /// Sets the number of findings shown in a report.
    pub fn with_findings_limit(mut self, limit: usize) -> Self {
        self.findings_display_limit = limit;
        self
    }

    /// Overrides the weight of a probe.
    pub fn with_weight_override(mut self, probe_id: impl Into<String>, weight: u32) -> Self {
        self.weight_overrides.insert(probe_id.into(), weight);
        self
    }
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|val| val.trim().parse().ok())
}

/// Parses `probe_id=weight` pairs separated by commas. Malformed pairs are
/// skipped.
pub fn parse_weight_overrides(input: &str) -> HashMap<String, u32> {
    input
        .split(',')
        .filter_map(|pair| {
            let (id, weight) = pair.split_once('=')?;
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            Some((id.to_string(), weight.trim().parse().ok()?))
        })
        .collect()
}

/// CLI argument structure for parsing command line options.
///
/// All fields are optional to allow partial overrides.
#[derive(Debug, Default, Clone)]
pub struct CliArgs {
    /// Per-probe timeout in milliseconds.
    pub probe_timeout_ms: Option<u64>,
    /// Tor exit-list timeout in milliseconds.
    pub tor_list_timeout_ms: Option<u64>,
    /// Findings shown in the report.
    pub findings_limit: Option<usize>,
    /// Weight overrides given on the command line.
    pub weight_overrides: HashMap<String, u32>,
    /// Configuration file path.
    pub config_file: Option<PathBuf>,
}

impl CliArgs {
    /// Creates an empty CliArgs instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the final settings by applying the full configuration chain.
    ///
    /// 1. Default values
    /// 2. Configuration file (if specified)
    /// 3. Environment variables
    /// 4. CLI arguments (self)
    pub fn load_settings(&self) -> Result<EngineSettings, ConfigError> {
        let mut settings = if let Some(ref config_file) = self.config_file {
            EngineSettings::from_file(config_file)?
        } else {
            EngineSettings::default()
        };

        settings = settings.merge_with_env();
        settings = settings.merge_with_args(self);
        settings.validate()?;

        Ok(settings)
    }
}
