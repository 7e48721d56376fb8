//! Evidence aggregation and classification engine.
//!
//! This module turns a batch of individually unreliable probe results into a
//! single explainable verdict.
//!
//! # Submodules
//!
//! - [`profile`] - Engine family detection from environment markers
//! - [`weights`] - Per-engine weight and reliability table
//! - [`aggregate`] - Fold of probe results into a [`Tally`]
//! - [`tor`] - Dedicated Tor Browser heuristic and override signal
//! - [`classify`] - Score, confidence tier and status label
//!
//! # Example
//!
//! ```rust
//! use privacy_probe::engine::{aggregate, classify, EngineProfile, TorAssessment, WeightTable};
//! use privacy_probe::probe::ProbeResult;
//!
//! let results = vec![
//!     ProbeResult::positive("storage_quota", "quota capped at 120 MB"),
//!     ProbeResult::positive("file_system", "temporary file system only"),
//! ];
//!
//! let table = WeightTable::builtin();
//! let tally = aggregate(EngineProfile::Chromium, &table, &results);
//! let verdict = classify(&tally, &TorAssessment::none());
//!
//! assert_eq!(verdict.normalized_score, 100);
//! assert_eq!(verdict.status_label(), "Private / Incognito Detected");
//! ```

pub mod aggregate;
pub mod classify;
pub mod profile;
pub mod tor;
pub mod weights;

pub use aggregate::{aggregate, Tally};
pub use classify::{classify, ClassificationResult, ConfidenceTier, StatusLabel};
pub use profile::{detect_engine_profile, EngineProfile, EnvironmentMarkers};
pub use tor::{TorAssessment, TorHeuristic};
pub use weights::{probe_ids, ReliabilityTier, WeightEntry, WeightTable};
