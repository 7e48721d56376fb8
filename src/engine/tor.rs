//! Dedicated Tor Browser heuristic.
//!
//! Tor-specific traits (letterboxed window, fixed font list, UTC clock, the
//! exit-node list) are strongly correlated with each other, so they are not
//! scored one by one in the general tally. They are folded here into a single
//! [`TorAssessment`] which serves two purposes:
//!
//! - a definite match overrides the status label regardless of the tally
//! - a single synthetic `tor_heuristic` result feeds the tally, so the
//!   correlated traits count once

use serde::{Deserialize, Serialize};

use super::weights::probe_ids;
use crate::probe::harness::synthetic;
use crate::probe::{ProbeOutcome, ProbeResult};

/// Points contributed by each Tor probe when positive.
const TOR_SIGNALS: &[(&str, u32)] = &[
    (probe_ids::TOR_EXIT_LIST, 100),
    (probe_ids::TOR_LETTERBOXING, 30),
    (probe_ids::TOR_FONT_WHITELIST, 25),
    (probe_ids::TOR_USER_AGENT, 20),
    (probe_ids::TOR_UTC_TIMEZONE, 15),
    (probe_ids::TOR_WEBGL_DISABLED, 10),
];

/// Thresholds for the Tor heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorHeuristic {
    /// Score at or above which the match is definite.
    pub definite_threshold: u32,
    /// Score at or above which the synthetic result is positive.
    pub likely_threshold: u32,
}

impl Default for TorHeuristic {
    fn default() -> Self {
        Self {
            definite_threshold: 60,
            likely_threshold: 30,
        }
    }
}

impl TorHeuristic {
    pub fn new(definite_threshold: u32, likely_threshold: u32) -> Self {
        Self {
            definite_threshold,
            likely_threshold,
        }
    }

    /// Ids of every probe the heuristic consumes.
    pub fn probe_ids() -> impl Iterator<Item = &'static str> {
        TOR_SIGNALS.iter().map(|(id, _)| *id)
    }

    pub fn is_tor_probe(probe_id: &str) -> bool {
        TOR_SIGNALS.iter().any(|(id, _)| *id == probe_id)
    }

    /// Scores the Tor probes found in `results`; other results are ignored.
    pub fn assess(&self, results: &[ProbeResult]) -> TorAssessment {
        let mut score: u32 = 0;
        let mut tested = false;
        let mut signals = Vec::new();

        for result in results {
            let Some(&(_, points)) = TOR_SIGNALS.iter().find(|(id, _)| *id == result.probe_id) else {
                continue;
            };
            match result.outcome {
                ProbeOutcome::Positive => {
                    tested = true;
                    score = score.saturating_add(points);
                    signals.push(result.evidence.clone());
                }
                ProbeOutcome::Negative => tested = true,
                ProbeOutcome::Indeterminate => {}
            }
        }

        TorAssessment {
            score: score.min(100),
            signals,
            tested,
            definite_threshold: self.definite_threshold,
            likely_threshold: self.likely_threshold,
        }
    }
}

/// Outcome of the Tor heuristic for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorAssessment {
    /// 0..=100
    pub score: u32,
    /// Evidence of the Tor probes that triggered.
    pub signals: Vec<String>,
    /// At least one Tor probe produced a verdict.
    pub tested: bool,
    pub definite_threshold: u32,
    pub likely_threshold: u32,
}

impl TorAssessment {
    /// An assessment with no Tor signal at all.
    pub fn none() -> Self {
        let heuristic = TorHeuristic::default();
        Self {
            score: 0,
            signals: Vec::new(),
            tested: false,
            definite_threshold: heuristic.definite_threshold,
            likely_threshold: heuristic.likely_threshold,
        }
    }

    /// An assessment that is a definite match, for callers that know.
    pub fn definite(evidence: impl Into<String>) -> Self {
        Self {
            score: 100,
            signals: vec![evidence.into()],
            tested: true,
            ..Self::none()
        }
    }

    pub fn is_definite(&self) -> bool {
        self.tested && self.score >= self.definite_threshold
    }

    pub fn is_likely(&self) -> bool {
        self.tested && self.score >= self.likely_threshold
    }

    /// Projects the assessment onto the `tor_heuristic` result scored by
    /// the aggregator.
    pub fn to_probe_result(&self) -> ProbeResult {
        let id = probe_ids::TOR_HEURISTIC;
        let result = if !self.tested {
            synthetic(id, ProbeOutcome::Indeterminate, "no Tor probe produced a verdict")
        } else if self.is_likely() {
            synthetic(
                id,
                ProbeOutcome::Positive,
                format!("Tor Browser traits present (score {}): {}", self.score, self.signals.join(", ")),
            )
        } else {
            synthetic(
                id,
                ProbeOutcome::Negative,
                format!("Tor Browser traits below threshold (score {})", self.score),
            )
        };
        result.with_aux(f64::from(self.score))
    }
}
