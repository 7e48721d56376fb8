//! Report assembly.
//!
//! The report is the one structure handed to the presentation layer. Assembly
//! is a straight projection of the classification, the suggestions and the
//! raw probe evidence: no probing, no scoring. It only tidies up the output
//! by de-duplicating findings, capping them for display and stripping
//! internal diagnostics from probe evidence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{ClassificationResult, ConfidenceTier, EngineProfile};
use crate::probe::{ProbeOutcome, ProbeResult};
use crate::suggest::Suggestion;

/// Default number of findings shown before the overflow counter kicks in.
pub const DEFAULT_FINDINGS_LIMIT: usize = 5;

/// Public view of one probe execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeEvidence {
    pub probe_id: String,
    pub method: String,
    pub outcome: ProbeOutcome,
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_value: Option<f64>,
    pub duration_ms: u64,
}

impl From<&ProbeResult> for ProbeEvidence {
    fn from(result: &ProbeResult) -> Self {
        Self {
            probe_id: result.probe_id.clone(),
            method: result.method.clone(),
            outcome: result.outcome,
            evidence: result.evidence.clone(),
            aux_value: result.aux_value,
            duration_ms: result.duration_ms,
        }
    }
}

/// Final result of one classification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub engine_profile: EngineProfile,
    pub status_label: String,
    pub normalized_score: u8,
    pub confidence_tier: ConfidenceTier,
    pub is_tor: bool,
    /// Findings shown to the user, most significant first.
    pub findings: Vec<String>,
    /// Findings left out of `findings` by the display limit.
    pub hidden_findings: usize,
    pub suggestions: Vec<Suggestion>,
    pub probes: Vec<ProbeEvidence>,
}

impl Report {
    /// Whether the verdict should be presented as tentative.
    pub fn is_tentative(&self) -> bool {
        self.confidence_tier.is_tentative()
    }

    pub fn total_findings(&self) -> usize {
        self.findings.len() + self.hidden_findings
    }
}

/// Options controlling assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    pub engine_profile: EngineProfile,
    pub findings_limit: usize,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            engine_profile: EngineProfile::Unknown,
            findings_limit: DEFAULT_FINDINGS_LIMIT,
        }
    }
}

/// Merges a classification, its suggestions and the raw probe results.
pub fn assemble(
    classification: &ClassificationResult,
    suggestions: Vec<Suggestion>,
    raw_results: &[ProbeResult],
    options: AssembleOptions,
) -> Report {
    let mut findings: Vec<String> = Vec::new();
    for finding in &classification.findings {
        if !findings.contains(finding) {
            findings.push(finding.clone());
        }
    }

    let limit = options.findings_limit.max(1);
    let hidden_findings = findings.len().saturating_sub(limit);
    findings.truncate(limit);

    Report {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        engine_profile: options.engine_profile,
        status_label: classification.status_label().to_string(),
        normalized_score: classification.normalized_score,
        confidence_tier: classification.confidence,
        is_tor: classification.is_tor_override,
        findings,
        hidden_findings,
        suggestions,
        probes: collapse_probes(raw_results),
    }
}

/// One evidence entry per probe id. The first result for an id is kept, the
/// same one the aggregator scores.
fn collapse_probes(raw_results: &[ProbeResult]) -> Vec<ProbeEvidence> {
    let mut probes: Vec<ProbeEvidence> = Vec::with_capacity(raw_results.len());
    for result in raw_results {
        if probes.iter().any(|p| p.probe_id == result.probe_id) {
            continue;
        }
        probes.push(ProbeEvidence::from(result));
    }
    probes
}
