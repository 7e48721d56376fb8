//! Configuration module for privacy-probe.
//!
//! This module provides configuration management for the detection engine:
//! - Loading settings from files (TOML/JSON)
//! - Environment variable overrides
//! - CLI argument merging
//! - Validation and defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use privacy_probe::config::EngineSettings;
//!
//! // Load from a specific file
//! let settings = EngineSettings::from_file("engine.toml").unwrap();
//!
//! // Override with environment variables
//! let settings = settings.merge_with_env();
//! ```

mod settings;

pub use settings::{parse_weight_overrides, CliArgs, ConfigError, EngineSettings};
