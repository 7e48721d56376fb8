//! End-to-end detection pipeline.
//!
//! [`PrivacyDetector`] wires the pieces together for one run:
//!
//! 1. detect the engine profile from environment markers
//! 2. select the probes weighted for that profile, plus the Tor probes
//! 3. run them concurrently, each under its own timeout
//! 4. fold the Tor probes into one assessment and add caller signals
//! 5. aggregate, classify, suggest and assemble the report
//!
//! The detector only holds read-only state, so a single instance can serve
//! concurrent runs without locking.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineSettings;
use crate::engine::{
    aggregate, classify, detect_engine_profile, probe_ids, EnvironmentMarkers, TorHeuristic,
    WeightTable,
};
use crate::probe::harness::synthetic;
use crate::probe::{run_scheduled, ProbeOutcome, ProbeRegistry, ProbeResult};
use crate::report::{assemble, AssembleOptions, Report};
use crate::suggest::{generate_suggestions, SuggestionContext};

/// Probe ids whose results the pipeline derives itself. Registered probes
/// with these ids are never scheduled.
const SYNTHESIZED: &[&str] = &[
    probe_ids::TOR_HEURISTIC,
    probe_ids::GLOBAL_PRIVACY_CONTROL,
    probe_ids::DO_NOT_TRACK,
];

/// Signals supplied by the caller rather than measured by a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSignals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_privacy_control: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_track: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpn_detected: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_blocker: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
}

impl ClientSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gpc(mut self, enabled: bool) -> Self {
        self.global_privacy_control = Some(enabled);
        self
    }

    pub fn with_dnt(mut self, enabled: bool) -> Self {
        self.do_not_track = Some(enabled);
        self
    }

    pub fn with_vpn(mut self, detected: bool) -> Self {
        self.vpn_detected = Some(detected);
        self
    }

    pub fn with_ad_blocker(mut self, present: bool) -> Self {
        self.ad_blocker = Some(present);
        self
    }

    pub fn with_browser_name(mut self, name: impl Into<String>) -> Self {
        self.browser_name = Some(name.into());
        self
    }

    /// Synthetic results for the signals that are known.
    fn to_probe_results(&self) -> Vec<ProbeResult> {
        let signals = [
            (
                probe_ids::GLOBAL_PRIVACY_CONTROL,
                self.global_privacy_control,
                "Global Privacy Control",
            ),
            (probe_ids::DO_NOT_TRACK, self.do_not_track, "Do Not Track"),
        ];

        signals
            .into_iter()
            .filter_map(|(id, value, label)| {
                value.map(|enabled| {
                    if enabled {
                        synthetic(id, ProbeOutcome::Positive, format!("{} signal sent", label))
                    } else {
                        synthetic(id, ProbeOutcome::Negative, format!("{} signal not sent", label))
                    }
                })
            })
            .collect()
    }
}

/// Runs the detection pipeline against a probe registry.
#[derive(Debug, Clone)]
pub struct PrivacyDetector {
    settings: EngineSettings,
    registry: ProbeRegistry,
    table: Arc<WeightTable>,
    tor: TorHeuristic,
}

impl PrivacyDetector {
    /// Creates a detector using the built-in weight table with any
    /// configured overrides applied.
    ///
    /// The Tor exit-list probe, when registered, gets the longer network
    /// timeout from the settings.
    pub fn new(settings: EngineSettings, mut registry: ProbeRegistry) -> Self {
        let table = if settings.weight_overrides.is_empty() {
            WeightTable::shared()
        } else {
            Arc::new(WeightTable::builtin().with_overrides(&settings.weight_overrides))
        };

        if registry.set_timeout(probe_ids::TOR_EXIT_LIST, settings.tor_list_timeout()) {
            debug!(
                "Tor exit-list probe timeout set to {} ms",
                settings.tor_list_timeout_ms
            );
        }

        let tor = settings.tor_heuristic();
        Self {
            settings,
            registry,
            table,
            tor,
        }
    }

    /// Replaces the weight table. Configured overrides are applied to it.
    pub fn with_weight_table(mut self, table: WeightTable) -> Self {
        self.table = Arc::new(table.with_overrides(&self.settings.weight_overrides));
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn weight_table(&self) -> &WeightTable {
        &self.table
    }

    /// Runs every applicable probe and produces a report.
    pub async fn run(&self, markers: &EnvironmentMarkers, signals: &ClientSignals) -> Report {
        let profile = detect_engine_profile(markers);
        info!("Detected engine profile: {}", profile);

        let mut wanted: Vec<&str> = self.table.probe_ids_for(profile);
        for id in TorHeuristic::probe_ids() {
            wanted.push(id);
        }
        wanted.retain(|id| {
            let derived = SYNTHESIZED.contains(id);
            if derived {
                debug!("{} is derived by the pipeline, not scheduled", id);
            }
            !derived
        });
        let scheduled = self.registry.select(wanted);
        debug!("Scheduling {} probes for {}", scheduled.len(), profile);

        let mut results = run_scheduled(&scheduled, self.settings.probe_timeout()).await;

        let assessment = self.tor.assess(&results);
        if assessment.tested {
            debug!("Tor heuristic score: {}", assessment.score);
        }
        results.push(assessment.to_probe_result());
        results.extend(signals.to_probe_results());

        let tally = aggregate(profile, &self.table, &results);
        let classification = classify(&tally, &assessment);
        info!(
            "Classified as {} (score {}, confidence {:?})",
            classification.status_label(),
            classification.normalized_score,
            classification.confidence
        );

        // A private verdict built only from agnostic signals is not treated
        // as an incognito session.
        let engine_ids = self.table.engine_entries(profile);
        let engine_evidence = results.iter().any(|r| {
            r.outcome.is_decisive() && engine_ids.iter().any(|e| e.probe_id == r.probe_id)
        });
        let incognito = classification.is_tor_override
            || (classification.is_private() && engine_evidence);
        if classification.is_private() && !incognito {
            debug!("Private verdict has no engine-specific evidence");
        }

        let ad_blocker_probe = results
            .iter()
            .any(|r| r.probe_id == probe_ids::AD_BLOCKER && r.outcome == ProbeOutcome::Positive);
        let context = SuggestionContext::from_classification(&classification)
            .with_incognito(incognito)
            .with_gpc(signals.global_privacy_control == Some(true))
            .with_dnt(signals.do_not_track == Some(true))
            .with_ad_blocker(signals.ad_blocker == Some(true) || ad_blocker_probe)
            .with_vpn(signals.vpn_detected == Some(true))
            .with_browser_name(signals.browser_name.clone());

        let suggestions = generate_suggestions(&context);

        assemble(
            &classification,
            suggestions,
            &results,
            AssembleOptions {
                engine_profile: profile,
                findings_limit: self.settings.findings_display_limit,
            },
        )
    }

    /// Re-classifies after the caller's signals changed, for example once a
    /// VPN check completes.
    ///
    /// This is a second full run: every probe is executed again and nothing
    /// from a previous report is reused.
    pub async fn reclassify(&self, markers: &EnvironmentMarkers, signals: &ClientSignals) -> Report {
        info!("Re-running classification with updated signals");
        self.run(markers, signals).await
    }
}
