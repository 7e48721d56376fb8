//! Probe abstraction and execution.
//!
//! A probe is a single, independently executed environment check that reports
//! a tri-state [`ProbeOutcome`]. Probes are individually unreliable: the
//! harness never lets one of them fail the run, it downgrades every fault to
//! [`ProbeOutcome::Indeterminate`] instead.
//!
//! # Submodules
//!
//! - [`harness`] - Concurrent execution with per-probe timeouts
//! - [`registry`] - Named probe registry with timeout overrides
//! - [`replay`] - Probes that replay recorded observations
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use privacy_probe::probe::{Observation, Probe, ProbeError};
//!
//! struct QuotaProbe;
//!
//! #[async_trait]
//! impl Probe for QuotaProbe {
//!     fn id(&self) -> &str {
//!         "storage_quota"
//!     }
//!
//!     async fn execute(&self) -> Result<Observation, ProbeError> {
//!         Ok(Observation::positive("quota below 120 MB").with_aux(119.0))
//!     }
//! }
//! ```

pub mod harness;
pub mod registry;
pub mod replay;

pub use harness::{run_probe, run_probe_set, run_scheduled};
pub use registry::{ProbeRegistry, ScheduledProbe};
pub use replay::{ObservationError, ObservationSet, ReplayEntry, ReplayFault, ReplayProbe};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tri-state result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// The probe observed the privacy-protective trait it tests for.
    Positive,
    /// The probe ran and did not observe the trait.
    Negative,
    /// The probe could not produce a verdict (unsupported, failed, timed out).
    Indeterminate,
}

impl ProbeOutcome {
    /// Whether the probe produced a usable verdict.
    pub fn is_decisive(&self) -> bool {
        !matches!(self, ProbeOutcome::Indeterminate)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Positive => write!(f, "positive"),
            ProbeOutcome::Negative => write!(f, "negative"),
            ProbeOutcome::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Errors a probe may report instead of an observation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// The capability under test does not exist in this environment.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The probe started but could not complete.
    #[error("failed: {0}")]
    Failed(String),
}

/// What a probe reports back to the harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub outcome: ProbeOutcome,
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_value: Option<f64>,
}

impl Observation {
    pub fn new(outcome: ProbeOutcome, evidence: impl Into<String>) -> Self {
        Self {
            outcome,
            evidence: evidence.into(),
            aux_value: None,
        }
    }

    pub fn positive(evidence: impl Into<String>) -> Self {
        Self::new(ProbeOutcome::Positive, evidence)
    }

    pub fn negative(evidence: impl Into<String>) -> Self {
        Self::new(ProbeOutcome::Negative, evidence)
    }

    pub fn indeterminate(evidence: impl Into<String>) -> Self {
        Self::new(ProbeOutcome::Indeterminate, evidence)
    }

    /// Attaches a numeric measurement (e.g. a storage quota in MB).
    pub fn with_aux(mut self, value: f64) -> Self {
        self.aux_value = Some(value);
        self
    }
}

/// Immutable record of one probe execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// Name of the probe, used as the weight table key.
    pub probe_id: String,

    /// Identifier of the technique the probe used.
    pub method: String,

    pub outcome: ProbeOutcome,

    /// Human-readable reason for the outcome.
    pub evidence: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_value: Option<f64>,

    /// Wall-clock time the harness waited for the probe.
    pub duration_ms: u64,

    /// Internal diagnostic detail. Never leaves the crate through a report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ProbeResult {
    pub fn new(probe_id: impl Into<String>, outcome: ProbeOutcome, evidence: impl Into<String>) -> Self {
        Self {
            probe_id: probe_id.into(),
            method: "unspecified".to_string(),
            outcome,
            evidence: evidence.into(),
            aux_value: None,
            duration_ms: 0,
            diagnostic: None,
        }
    }

    pub fn positive(probe_id: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self::new(probe_id, ProbeOutcome::Positive, evidence)
    }

    pub fn negative(probe_id: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self::new(probe_id, ProbeOutcome::Negative, evidence)
    }

    pub fn indeterminate(probe_id: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self::new(probe_id, ProbeOutcome::Indeterminate, evidence)
    }

    /// Builds a result from a probe's observation.
    pub fn from_observation(
        probe_id: impl Into<String>,
        method: impl Into<String>,
        observation: Observation,
        duration_ms: u64,
    ) -> Self {
        Self {
            probe_id: probe_id.into(),
            method: method.into(),
            outcome: observation.outcome,
            evidence: observation.evidence,
            aux_value: observation.aux_value,
            duration_ms,
            diagnostic: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_aux(mut self, value: f64) -> Self {
        self.aux_value = Some(value);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

/// Trait implemented by every environment check.
///
/// Implementations live outside this crate (browser bindings, recorded
/// observations, test doubles). The harness treats them as black boxes and
/// only relies on them being `Send + Sync` so they can run concurrently.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable probe name, matched against the weight table.
    fn id(&self) -> &str;

    /// Identifier of the detection technique.
    fn method(&self) -> &str {
        "unspecified"
    }

    /// Runs the check.
    async fn execute(&self) -> Result<Observation, ProbeError>;
}
