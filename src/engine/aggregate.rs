//! Evidence aggregation.
//!
//! Folds a batch of probe results into a [`Tally`] against the weight table.
//! The fold is pure and order-independent apart from the order of
//! `triggered_findings`, which follows the order of the input.
//!
//! Scoring rules per result with an applicable weight entry:
//!
//! | Outcome         | achieved | max     | findings  |
//! |-----------------|----------|---------|-----------|
//! | `Positive`      | +weight  | +weight | +evidence |
//! | `Negative`      |          | +weight |           |
//! | `Indeterminate` |          |         |           |
//!
//! HIGH-tier entries count an attempt for every result, and a hit when
//! positive. Indeterminate probes stay out of the denominator so an
//! environment that blocks many APIs does not look more or less private just
//! because signal is missing.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::profile::EngineProfile;
use super::weights::{ReliabilityTier, WeightTable};
use crate::probe::{ProbeOutcome, ProbeResult};

/// Running score accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub achieved_score: u32,
    pub max_score: u32,
    pub high_tier_hits: u32,
    pub high_tier_attempts: u32,
    pub triggered_findings: Vec<String>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one result scored with the given weight and tier.
    pub fn record(&mut self, result: &ProbeResult, weight: u32, tier: ReliabilityTier) {
        if tier == ReliabilityTier::High {
            self.high_tier_attempts += 1;
        }

        match result.outcome {
            ProbeOutcome::Positive => {
                self.achieved_score = self.achieved_score.saturating_add(weight);
                self.max_score = self.max_score.saturating_add(weight);
                self.triggered_findings.push(result.evidence.clone());
                if tier == ReliabilityTier::High {
                    self.high_tier_hits += 1;
                }
            }
            ProbeOutcome::Negative => {
                self.max_score = self.max_score.saturating_add(weight);
            }
            ProbeOutcome::Indeterminate => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_score == 0
    }
}

/// Aggregates probe results for an engine profile.
///
/// Results whose probe has no entry for the profile are excluded from
/// scoring. When the same probe id appears more than once only its first
/// result is scored.
pub fn aggregate(profile: EngineProfile, table: &WeightTable, results: &[ProbeResult]) -> Tally {
    let mut tally = Tally::new();
    let mut scored: Vec<&str> = Vec::new();

    for result in results {
        let Some(entry) = table.lookup(profile, &result.probe_id) else {
            debug!(
                "No weight entry for {} on {}, excluded from scoring",
                result.probe_id, profile
            );
            continue;
        };

        if scored.contains(&result.probe_id.as_str()) {
            debug!("Duplicate result for {} ignored", result.probe_id);
            continue;
        }
        scored.push(&result.probe_id);

        trace!(
            "Scoring {} ({} x{}): {}",
            entry.probe_id,
            entry.tier,
            entry.weight,
            result.outcome
        );
        tally.record(result, entry.weight, entry.tier);
    }

    debug!(
        "Tally for {}: {}/{} ({} of {} high-tier probes hit)",
        profile, tally.achieved_score, tally.max_score, tally.high_tier_hits, tally.high_tier_attempts
    );

    tally
}
