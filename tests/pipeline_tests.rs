//! Integration tests for the detection pipeline
//!
//! Tests for replayed probe runs, per-probe timeouts, fault tolerance,
//! re-classification and concurrent runs against a shared detector.

use std::sync::Arc;
use std::time::{Duration, Instant};

use privacy_probe::config::EngineSettings;
use privacy_probe::detector::{ClientSignals, PrivacyDetector};
use privacy_probe::engine::{probe_ids, ConfidenceTier, EngineProfile, EnvironmentMarkers, WeightTable};
use privacy_probe::probe::{
    ObservationSet, ProbeOutcome, ProbeRegistry, ReplayEntry, ReplayFault, ReplayProbe,
};

/// Mock implementations for pipeline testing
mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use privacy_probe::probe::{Observation, Probe, ProbeError};

    /// Probe that counts how many times it ran
    pub struct CountingProbe {
        pub id: &'static str,
        pub runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Probe for CountingProbe {
        fn id(&self) -> &str {
            self.id
        }

        fn method(&self) -> &str {
            "counting"
        }

        async fn execute(&self) -> Result<Observation, ProbeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(Observation::positive("counted"))
        }
    }

    /// Probe that always panics
    pub struct PanickingProbe(pub &'static str);

    #[async_trait]
    impl Probe for PanickingProbe {
        fn id(&self) -> &str {
            self.0
        }

        async fn execute(&self) -> Result<Observation, ProbeError> {
            panic!("probe exploded");
        }
    }
}

fn chromium() -> EnvironmentMarkers {
    EnvironmentMarkers::new().with_error_message("toFixed() digits argument must be between 0 and 100")
}

fn gecko() -> EnvironmentMarkers {
    EnvironmentMarkers::new().with_error_message("precision -1 out of range")
}

fn registry(entries: Vec<ReplayEntry>) -> ProbeRegistry {
    let mut registry = ProbeRegistry::new();
    for entry in entries {
        registry.register(Arc::new(ReplayProbe::new(entry)));
    }
    registry
}

// ============================================================================
// End-to-end Scenarios
// ============================================================================

#[tokio::test]
async fn test_chromium_incognito_replay() {
    let detector = PrivacyDetector::new(
        EngineSettings::default(),
        registry(vec![
            ReplayEntry::outcome(probe_ids::STORAGE_QUOTA, ProbeOutcome::Positive, "quota 120 MB")
                .with_aux(120.0),
            ReplayEntry::outcome(probe_ids::FILE_SYSTEM, ProbeOutcome::Positive, "temporary only"),
            ReplayEntry::fault(probe_ids::SERVICE_WORKER, ReplayFault::Unsupported, "no serviceWorker"),
        ]),
    );

    let report = detector.run(&chromium(), &ClientSignals::new()).await;

    assert_eq!(report.status_label, "Private / Incognito Detected");
    assert_eq!(report.normalized_score, 100);
    assert_eq!(report.confidence_tier, ConfidenceTier::High);
    assert_eq!(report.findings, vec!["quota 120 MB", "temporary only"]);

    let service_worker = report
        .probes
        .iter()
        .find(|p| p.probe_id == probe_ids::SERVICE_WORKER)
        .unwrap();
    assert_eq!(service_worker.outcome, ProbeOutcome::Indeterminate);
    assert!(service_worker.evidence.starts_with("probe unsupported"));
}

#[tokio::test]
async fn test_empty_table_unknown_engine() {
    let detector = PrivacyDetector::new(EngineSettings::default(), ProbeRegistry::new())
        .with_weight_table(WeightTable::new());

    let report = detector.run(&EnvironmentMarkers::new(), &ClientSignals::new()).await;

    assert_eq!(report.engine_profile, EngineProfile::Unknown);
    assert_eq!(report.normalized_score, 0);
    assert_eq!(report.confidence_tier, ConfidenceTier::None);
    assert_eq!(report.status_label, "Standard Mode");
    assert!(report.is_tentative());

    let actions: Vec<&str> = report.suggestions.iter().map(|s| s.action.as_str()).collect();
    assert!(actions.contains(&"Use private browsing mode"));
    assert!(actions.contains(&"Install a content blocker"));
}

#[tokio::test]
async fn test_tor_exit_list_overrides_verdict() {
    let detector = PrivacyDetector::new(
        EngineSettings::default(),
        registry(vec![
            ReplayEntry::outcome(probe_ids::INDEXEDDB_OPEN, ProbeOutcome::Negative, "open succeeded"),
            ReplayEntry::outcome(probe_ids::TOR_EXIT_LIST, ProbeOutcome::Positive, "IP is a Tor exit node"),
        ]),
    );

    let report = detector.run(&gecko(), &ClientSignals::new()).await;

    assert!(report.is_tor);
    assert_eq!(report.status_label, "Tor Browser Detected");
    assert_eq!(report.confidence_tier, ConfidenceTier::High);
    assert_eq!(report.suggestions.len(), 1);
    assert!(report
        .probes
        .iter()
        .any(|p| p.probe_id == probe_ids::TOR_HEURISTIC && p.outcome == ProbeOutcome::Positive));
}

#[tokio::test]
async fn test_caller_signals_scored_and_suggested() {
    let detector = PrivacyDetector::new(EngineSettings::default(), ProbeRegistry::new());
    let signals = ClientSignals::new()
        .with_gpc(true)
        .with_dnt(true)
        .with_browser_name("Firefox");

    let report = detector.run(&gecko(), &signals).await;

    // Both signals positive, nothing else tested.
    assert_eq!(report.normalized_score, 100);
    assert!(report
        .suggestions
        .iter()
        .all(|s| s.action != "Enable Global Privacy Control"));
    assert!(report
        .suggestions
        .iter()
        .any(|s| s.action == "Set Enhanced Tracking Protection to Strict"));
}

// ============================================================================
// Fault Tolerance Tests
// ============================================================================

#[tokio::test]
async fn test_slow_probe_times_out_without_blocking() {
    let settings = EngineSettings::default().with_probe_timeout(100);
    let detector = PrivacyDetector::new(
        settings,
        registry(vec![
            ReplayEntry::outcome(probe_ids::STORAGE_QUOTA, ProbeOutcome::Positive, "quota 120 MB"),
            ReplayEntry::outcome(probe_ids::FILE_SYSTEM, ProbeOutcome::Positive, "temporary only")
                .with_delay_ms(2_000),
        ]),
    );

    let started = Instant::now();
    let report = detector.run(&chromium(), &ClientSignals::new()).await;

    assert!(started.elapsed() < Duration::from_millis(1_500));
    let file_system = report
        .probes
        .iter()
        .find(|p| p.probe_id == probe_ids::FILE_SYSTEM)
        .unwrap();
    assert_eq!(file_system.outcome, ProbeOutcome::Indeterminate);
    assert!(file_system.evidence.contains("timed out"));
    // Only the quota probe was tested.
    assert_eq!(report.normalized_score, 100);
}

#[tokio::test]
async fn test_tor_exit_list_has_its_own_budget() {
    let settings = EngineSettings::default()
        .with_probe_timeout(100)
        .with_tor_list_timeout(1_000);
    let detector = PrivacyDetector::new(
        settings,
        registry(vec![ReplayEntry::outcome(
            probe_ids::TOR_EXIT_LIST,
            ProbeOutcome::Positive,
            "IP is a Tor exit node",
        )
        .with_delay_ms(300)]),
    );

    let report = detector.run(&chromium(), &ClientSignals::new()).await;
    assert!(report.is_tor);
}

#[tokio::test]
async fn test_tor_exit_list_over_its_budget_is_indeterminate() {
    let settings = EngineSettings::default()
        .with_probe_timeout(100)
        .with_tor_list_timeout(200);
    let detector = PrivacyDetector::new(
        settings,
        registry(vec![
            ReplayEntry::outcome(probe_ids::TOR_EXIT_LIST, ProbeOutcome::Positive, "IP is a Tor exit node")
                .with_delay_ms(1_000),
            ReplayEntry::outcome(probe_ids::STORAGE_QUOTA, ProbeOutcome::Positive, "quota 120 MB"),
        ]),
    );

    let started = Instant::now();
    let report = detector.run(&chromium(), &ClientSignals::new()).await;

    assert!(started.elapsed() < Duration::from_millis(900));
    let exit_list = report
        .probes
        .iter()
        .find(|p| p.probe_id == probe_ids::TOR_EXIT_LIST)
        .unwrap();
    assert_eq!(exit_list.outcome, ProbeOutcome::Indeterminate);
    assert!(exit_list.evidence.contains("timed out after 200 ms"));

    // The rest of the batch still scores.
    assert!(!report.is_tor);
    assert_eq!(report.normalized_score, 100);
    assert_eq!(report.findings, vec!["quota 120 MB"]);
}

#[tokio::test]
async fn test_panicking_probe_is_absorbed() {
    let mut registry = ProbeRegistry::new();
    registry.register(Arc::new(mock::PanickingProbe(probe_ids::STORAGE_QUOTA)));
    let detector = PrivacyDetector::new(EngineSettings::default(), registry);

    let report = detector.run(&chromium(), &ClientSignals::new()).await;

    assert_eq!(report.status_label, "Standard Mode");
    assert_eq!(report.probes[0].outcome, ProbeOutcome::Indeterminate);
}

#[tokio::test]
async fn test_registered_signal_id_does_not_shadow_caller_signal() {
    let detector = PrivacyDetector::new(
        EngineSettings::default(),
        registry(vec![
            ReplayEntry::outcome(probe_ids::GLOBAL_PRIVACY_CONTROL, ProbeOutcome::Positive, "recorded GPC header"),
            ReplayEntry::outcome(probe_ids::INDEXEDDB_OPEN, ProbeOutcome::Positive, "open rejected"),
        ]),
    );

    let report = detector.run(&gecko(), &ClientSignals::new().with_gpc(false)).await;

    let gpc: Vec<_> = report
        .probes
        .iter()
        .filter(|p| p.probe_id == probe_ids::GLOBAL_PRIVACY_CONTROL)
        .collect();
    assert_eq!(gpc.len(), 1);
    assert_eq!(gpc[0].outcome, ProbeOutcome::Negative);
    assert_eq!(gpc[0].method, "synthetic");

    // Findings and evidence come from the same result.
    assert!(!report.findings.iter().any(|f| f == "recorded GPC header"));
    assert_eq!(report.findings, vec!["open rejected"]);
    assert!(report
        .suggestions
        .iter()
        .any(|s| s.action == "Enable Global Privacy Control"));
}

// ============================================================================
// Re-classification and Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_reclassify_reexecutes_probes() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let runs = Arc::new(AtomicUsize::new(0));
    let mut registry = ProbeRegistry::new();
    registry.register(Arc::new(mock::CountingProbe {
        id: probe_ids::STORAGE_QUOTA,
        runs: Arc::clone(&runs),
    }));
    let detector = PrivacyDetector::new(EngineSettings::default(), registry);

    detector.run(&chromium(), &ClientSignals::new()).await;
    detector
        .reclassify(&chromium(), &ClientSignals::new().with_vpn(true))
        .await;

    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let detector = Arc::new(PrivacyDetector::new(
        EngineSettings::default(),
        registry(vec![
            ReplayEntry::outcome(probe_ids::STORAGE_QUOTA, ProbeOutcome::Positive, "quota 120 MB")
                .with_delay_ms(50),
            ReplayEntry::outcome(probe_ids::INDEXEDDB_OPEN, ProbeOutcome::Negative, "open succeeded")
                .with_delay_ms(50),
        ]),
    ));

    let chromium_markers = chromium();
    let gecko_markers = gecko();
    let signals = ClientSignals::new();
    let (a, b) = tokio::join!(
        detector.run(&chromium_markers, &signals),
        detector.run(&gecko_markers, &signals),
    );

    assert_eq!(a.engine_profile, EngineProfile::Chromium);
    assert_eq!(b.engine_profile, EngineProfile::Gecko);
    assert_eq!(a.status_label, "Private / Incognito Detected");
    assert_ne!(a.run_id, b.run_id);
}

#[tokio::test]
async fn test_observation_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");
    std::fs::write(
        &path,
        r#"{
            "markers": { "errorMessage": "precision -1 out of range" },
            "signals": { "globalPrivacyControl": false, "browserName": "Firefox" },
            "probes": [
                { "id": "indexeddb_open", "outcome": "positive", "evidence": "IDB open rejected" },
                { "id": "service_worker", "outcome": "positive", "evidence": "serviceWorker undefined" },
                { "id": "cache_api", "error": "failed", "evidence": "SecurityError" }
            ]
        }"#,
    )
    .unwrap();

    let observations = ObservationSet::from_file(&path).unwrap();
    let detector = PrivacyDetector::new(EngineSettings::default(), observations.to_registry());
    let report = detector
        .run(&observations.markers, &observations.signals)
        .await;

    assert_eq!(report.engine_profile, EngineProfile::Gecko);
    // 70 achieved out of 70 + 10 (GPC negative).
    assert_eq!(report.normalized_score, 88);
    assert_eq!(report.status_label, "Private / Incognito Detected");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["statusLabel"], "Private / Incognito Detected");
    assert!(json["probes"].as_array().unwrap().len() >= 3);
}
