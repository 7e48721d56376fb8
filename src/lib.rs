//! # Privacy Probe
//!
//! Detection of browser private / incognito mode and classification of a
//! browser's privacy posture, written in Rust.
//!
//! No single browser behavior reliably reveals a private window, so the
//! engine runs a set of independent, individually unreliable probes, weights
//! each one by how reliable it is on the detected browser engine, and folds
//! the evidence into one explainable verdict with a confidence tier and a
//! list of remediation suggestions.
//!
//! ## Features
//!
//! - **Engine Profiling**: Chromium, Gecko and WebKit detected from runtime markers
//! - **Concurrent Probe Harness**: Every probe runs under its own timeout and never fails the run
//! - **Weighted Aggregation**: Per-engine weights with reliability tiers
//! - **Tor Override**: Dedicated heuristic that can override the verdict
//! - **Suggestions**: Prioritized, browser-aware remediation advice
//! - **Flexible Configuration**: TOML/JSON files, environment variables, CLI arguments
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use privacy_probe::{
//!     config::EngineSettings,
//!     detector::{ClientSignals, PrivacyDetector},
//!     engine::EnvironmentMarkers,
//!     probe::ObservationSet,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Replay a recorded probe run
//!     let observations = ObservationSet::from_file("observations.json")?;
//!
//!     let detector = PrivacyDetector::new(EngineSettings::default(), observations.to_registry());
//!     let report = detector.run(&observations.markers, &observations.signals).await;
//!
//!     println!("{} ({})", report.status_label, report.normalized_score);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`probe`]: Probe trait, concurrent harness, registry and replay probes
//! - [`engine`]: Engine profile, weight table, aggregation, Tor heuristic, classification
//! - [`suggest`]: Rule-based remediation suggestions
//! - [`report`]: Final report assembly
//! - [`detector`]: End-to-end pipeline
//! - [`config`]: Configuration loading and management
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Detector                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌─────────┐  ┌───────────┐  ┌──────────┐           │
//! │  │ Profile │─▶│ Probes  │─▶│ Aggregate │─▶│ Classify │           │
//! │  └─────────┘  └────┬────┘  └───────────┘  └────┬─────┘           │
//! │                    │  Tor heuristic ───────────┘                 │
//! │                    │                           │                 │
//! │               ┌────┴─────┐              ┌──────┴──────┐          │
//! │               │ Registry │              │  Suggest +  │          │
//! │               └──────────┘              │   Report    │          │
//! │                                         └─────────────┘          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//!
//! Configuration follows a precedence chain:
//! 1. Default values
//! 2. Configuration file (TOML/JSON)
//! 3. Environment variables (`PRIVACY_PROBE_*`)
//! 4. CLI arguments
//!
//! See [`config::EngineSettings`] for all available options.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Full version string with name
pub const FULL_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Module Exports
// ============================================================================

/// Probe contract, concurrent harness, registry and recorded replays.
pub mod probe;

/// Engine profiling, weighting, aggregation and classification.
pub mod engine;

/// Remediation suggestions derived from a classification.
pub mod suggest;

/// Report assembly.
pub mod report;

/// End-to-end detection pipeline.
pub mod detector;

/// Configuration management for loading settings from files, env, and CLI.
pub mod config;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

// Probe types
pub use probe::{
    Observation, ObservationError, ObservationSet, Probe, ProbeError, ProbeOutcome, ProbeRegistry,
    ProbeResult, ReplayEntry, ReplayProbe,
};

// Engine types
pub use engine::{
    ClassificationResult, ConfidenceTier, EngineProfile, EnvironmentMarkers, ReliabilityTier,
    StatusLabel, Tally, TorAssessment, TorHeuristic, WeightEntry, WeightTable,
};

// Suggestion and report types
pub use report::{ProbeEvidence, Report};
pub use suggest::{Impact, Suggestion, SuggestionContext};

// Pipeline types
pub use detector::{ClientSignals, PrivacyDetector};

// Config types
pub use config::{CliArgs, ConfigError, EngineSettings};

// ============================================================================
// Prelude Module
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use privacy_probe::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{CliArgs, EngineSettings};
    pub use crate::detector::{ClientSignals, PrivacyDetector};
    pub use crate::engine::{EngineProfile, EnvironmentMarkers, WeightTable};
    pub use crate::probe::{Observation, Probe, ProbeError, ProbeOutcome, ProbeRegistry};
    pub use crate::report::Report;
    pub use crate::{FULL_VERSION, NAME, VERSION};
}
