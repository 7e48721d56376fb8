//! Replay probes built from recorded observations.
//!
//! A recorded observation file captures what a client-side probe run saw:
//! environment markers, the caller-supplied signals, and one entry per probe.
//! Replaying it through the engine reproduces a classification offline, which
//! is how the command-line tool and the integration tests drive the pipeline.
//!
//! ```json
//! {
//!   "markers": { "errorMessage": "precision -1 out of range" },
//!   "signals": { "globalPrivacyControl": true },
//!   "probes": [
//!     { "id": "indexeddb_open", "outcome": "positive", "evidence": "IDB open rejected" },
//!     { "id": "service_worker", "error": "unsupported", "evidence": "navigator.serviceWorker missing" },
//!     { "id": "tor_exit_list", "outcome": "negative", "delayMs": 1200 }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Observation, Probe, ProbeError, ProbeOutcome, ProbeRegistry};
use crate::detector::ClientSignals;
use crate::engine::EnvironmentMarkers;

/// Errors raised while loading an observation file.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("Failed to read observation file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON observations: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML observations: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported observation file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid observation entry: {0}")]
    Invalid(String),
}

/// Fault a replayed probe should report instead of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayFault {
    Unsupported,
    Failed,
}

/// One recorded probe execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayEntry {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProbeOutcome>,

    #[serde(default)]
    pub evidence: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_value: Option<f64>,

    /// Simulated execution time.
    #[serde(default)]
    pub delay_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplayFault>,
}

impl ReplayEntry {
    pub fn outcome(id: impl Into<String>, outcome: ProbeOutcome, evidence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: None,
            outcome: Some(outcome),
            evidence: evidence.into(),
            aux_value: None,
            delay_ms: 0,
            error: None,
        }
    }

    pub fn fault(id: impl Into<String>, fault: ReplayFault, evidence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: None,
            outcome: None,
            evidence: evidence.into(),
            aux_value: None,
            delay_ms: 0,
            error: Some(fault),
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_aux(mut self, value: f64) -> Self {
        self.aux_value = Some(value);
        self
    }

    fn validate(&self) -> Result<(), ObservationError> {
        if self.id.trim().is_empty() {
            return Err(ObservationError::Invalid("probe id cannot be empty".to_string()));
        }
        match (self.outcome, self.error) {
            (None, None) => Err(ObservationError::Invalid(format!(
                "probe {} needs either an outcome or an error",
                self.id
            ))),
            (Some(_), Some(_)) => Err(ObservationError::Invalid(format!(
                "probe {} cannot have both an outcome and an error",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}

/// Probe that reports a recorded entry after its recorded delay.
#[derive(Debug, Clone)]
pub struct ReplayProbe {
    entry: ReplayEntry,
}

impl ReplayProbe {
    pub fn new(entry: ReplayEntry) -> Self {
        Self { entry }
    }
}

#[async_trait]
impl Probe for ReplayProbe {
    fn id(&self) -> &str {
        &self.entry.id
    }

    fn method(&self) -> &str {
        self.entry.method.as_deref().unwrap_or("replay")
    }

    async fn execute(&self) -> Result<Observation, ProbeError> {
        if self.entry.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.entry.delay_ms)).await;
        }

        match (self.entry.error, self.entry.outcome) {
            (Some(ReplayFault::Unsupported), _) => {
                Err(ProbeError::Unsupported(self.entry.evidence.clone()))
            }
            (Some(ReplayFault::Failed), _) => Err(ProbeError::Failed(self.entry.evidence.clone())),
            (None, Some(outcome)) => {
                let mut observation = Observation::new(outcome, self.entry.evidence.clone());
                observation.aux_value = self.entry.aux_value;
                Ok(observation)
            }
            (None, None) => Err(ProbeError::Failed("no recorded outcome".to_string())),
        }
    }
}

/// A complete recorded probe run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSet {
    #[serde(default)]
    pub markers: EnvironmentMarkers,

    #[serde(default)]
    pub signals: ClientSignals,

    #[serde(default)]
    pub probes: Vec<ReplayEntry>,
}

impl ObservationSet {
    /// Loads observations from a TOML or JSON file, chosen by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ObservationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let set: Self = match extension.as_str() {
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            ext => return Err(ObservationError::UnsupportedFormat(ext.to_string())),
        };

        set.validate()?;
        Ok(set)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ObservationError> {
        let set: Self = serde_json::from_str(content)?;
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<(), ObservationError> {
        self.probes.iter().try_for_each(ReplayEntry::validate)
    }

    /// Builds a registry holding one replay probe per entry.
    ///
    /// A later entry with the same id replaces an earlier one.
    pub fn to_registry(&self) -> ProbeRegistry {
        let mut registry = ProbeRegistry::new();
        for entry in &self.probes {
            registry.register(Arc::new(ReplayProbe::new(entry.clone())));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_outcome() {
        let probe = ReplayProbe::new(
            ReplayEntry::outcome("storage_quota", ProbeOutcome::Positive, "quota 118 MB").with_aux(118.0),
        );

        let observation = probe.execute().await.unwrap();
        assert_eq!(observation.outcome, ProbeOutcome::Positive);
        assert_eq!(observation.aux_value, Some(118.0));
        assert_eq!(probe.method(), "replay");
    }

    #[tokio::test]
    async fn test_replay_fault() {
        let probe = ReplayProbe::new(ReplayEntry::fault(
            "file_system",
            ReplayFault::Unsupported,
            "webkitRequestFileSystem missing",
        ));

        assert_eq!(
            probe.execute().await,
            Err(ProbeError::Unsupported("webkitRequestFileSystem missing".to_string()))
        );
    }

    #[test]
    fn test_parse_json_set() {
        let set = ObservationSet::from_json_str(
            r#"{
                "markers": { "userAgent": "Mozilla/5.0 Firefox/128.0" },
                "signals": { "doNotTrack": true },
                "probes": [
                    { "id": "indexeddb_open", "outcome": "positive", "evidence": "rejected" },
                    { "id": "cache_api", "error": "failed", "evidence": "SecurityError", "delayMs": 5 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(set.probes.len(), 2);
        assert_eq!(set.probes[1].error, Some(ReplayFault::Failed));
        assert_eq!(set.probes[1].delay_ms, 5);
        assert_eq!(set.signals.do_not_track, Some(true));
        assert_eq!(set.to_registry().len(), 2);
    }

    #[test]
    fn test_entry_without_outcome_is_rejected() {
        let err = ObservationSet::from_json_str(r#"{ "probes": [ { "id": "x" } ] }"#).unwrap_err();
        assert!(matches!(err, ObservationError::Invalid(_)));
    }

    #[test]
    fn test_entry_with_outcome_and_error_is_rejected() {
        let err = ObservationSet::from_json_str(
            r#"{ "probes": [ { "id": "x", "outcome": "negative", "error": "failed" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ObservationError::Invalid(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observations.yaml");
        std::fs::write(&path, "probes: []").unwrap();

        let err = ObservationSet::from_file(&path).unwrap_err();
        assert!(matches!(err, ObservationError::UnsupportedFormat(ext) if ext == "yaml"));
    }

    #[test]
    fn test_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observations.toml");
        std::fs::write(
            &path,
            r#"
[markers]
errorMessage = "toFixed() digits argument must be between 0 and 100"

[[probes]]
id = "storage_quota"
outcome = "positive"
evidence = "quota 120 MB"
auxValue = 120.0
"#,
        )
        .unwrap();

        let set = ObservationSet::from_file(&path).unwrap();
        assert_eq!(set.probes[0].aux_value, Some(120.0));
        assert!(set.markers.error_message.is_some());
    }
}
