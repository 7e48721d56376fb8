//! Probe execution harness.
//!
//! Every probe runs on its own tokio task under its own timeout. The harness
//! waits until all of them have settled (success, fault, or timeout) and hands
//! back one [`ProbeResult`] per probe, in input order. A probe fault never
//! escapes: errors, panics and timeouts all become
//! [`ProbeOutcome::Indeterminate`] with an explanatory evidence string.
//!
//! A timed-out probe is not aborted. Its task is detached and may keep
//! running; whatever it eventually produces is discarded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, warn};

use super::registry::ScheduledProbe;
use super::{Probe, ProbeError, ProbeOutcome, ProbeResult};

/// Runs a single probe with the given timeout.
///
/// Never fails: any fault is folded into an indeterminate result.
pub async fn run_probe(probe: Arc<dyn Probe>, timeout: Duration) -> ProbeResult {
    let probe_id = probe.id().to_string();
    let method = probe.method().to_string();
    let started = Instant::now();

    let task = tokio::spawn(async move { probe.execute().await });
    let settled = tokio::time::timeout(timeout, task).await;
    let duration_ms = elapsed_ms(started);

    let result = match settled {
        Ok(Ok(Ok(observation))) => {
            ProbeResult::from_observation(&probe_id, &method, observation, duration_ms)
        }
        Ok(Ok(Err(ProbeError::Unsupported(reason)))) => {
            debug!("Probe {} unsupported: {}", probe_id, reason);
            ProbeResult::indeterminate(&probe_id, format!("probe unsupported: {}", reason))
                .with_diagnostic(format!("unsupported: {}", reason))
        }
        Ok(Ok(Err(ProbeError::Failed(reason)))) => {
            warn!("Probe {} failed: {}", probe_id, reason);
            ProbeResult::indeterminate(&probe_id, format!("probe failed: {}", reason))
                .with_diagnostic(format!("failed: {}", reason))
        }
        Ok(Err(join_error)) => {
            warn!("Probe {} task did not complete: {}", probe_id, join_error);
            let evidence = if join_error.is_panic() {
                "probe panicked"
            } else {
                "probe cancelled"
            };
            ProbeResult::indeterminate(&probe_id, evidence).with_diagnostic(join_error.to_string())
        }
        Err(_) => {
            warn!("Probe {} timed out after {:?}", probe_id, timeout);
            ProbeResult::indeterminate(
                &probe_id,
                format!("probe timed out after {} ms", timeout.as_millis()),
            )
            .with_diagnostic(format!("waited {} ms", duration_ms))
        }
    };

    let result = result.with_method(method).with_duration_ms(duration_ms);

    debug!(
        "Probe {} settled: {} in {} ms",
        result.probe_id, result.outcome, result.duration_ms
    );

    result
}

/// Runs every probe concurrently with the same timeout.
///
/// Waits for all probes to settle; results are returned in input order.
pub async fn run_probe_set(probes: &[Arc<dyn Probe>], per_probe_timeout: Duration) -> Vec<ProbeResult> {
    join_all(
        probes
            .iter()
            .map(|probe| run_probe(Arc::clone(probe), per_probe_timeout)),
    )
    .await
}

/// Runs scheduled probes concurrently, honouring per-probe timeout overrides.
///
/// Probes without an override get `default_timeout`.
pub async fn run_scheduled(scheduled: &[ScheduledProbe], default_timeout: Duration) -> Vec<ProbeResult> {
    let results = join_all(scheduled.iter().map(|entry| {
        let timeout = entry.timeout.unwrap_or(default_timeout);
        run_probe(Arc::clone(&entry.probe), timeout)
    }))
    .await;

    let settled = results.iter().filter(|r| r.outcome.is_decisive()).count();
    debug!(
        "Probe batch complete: {} of {} decisive",
        settled,
        results.len()
    );

    results
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Convenience for callers that already hold the outcome of a probe that
/// was never run through the harness.
pub(crate) fn synthetic(probe_id: &str, outcome: ProbeOutcome, evidence: impl Into<String>) -> ProbeResult {
    ProbeResult::new(probe_id, outcome, evidence).with_method("synthetic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Observation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FixedProbe {
        id: &'static str,
        delay: Duration,
        result: Result<Observation, ProbeError>,
    }

    #[async_trait]
    impl Probe for FixedProbe {
        fn id(&self) -> &str {
            self.id
        }

        fn method(&self) -> &str {
            "fixed"
        }

        async fn execute(&self) -> Result<Observation, ProbeError> {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    struct PanickingProbe;

    #[async_trait]
    impl Probe for PanickingProbe {
        fn id(&self) -> &str {
            "panics"
        }

        async fn execute(&self) -> Result<Observation, ProbeError> {
            panic!("probe blew up");
        }
    }

    struct SlowFlagProbe {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Probe for SlowFlagProbe {
        fn id(&self) -> &str {
            "slow_flag"
        }

        async fn execute(&self) -> Result<Observation, ProbeError> {
            tokio::time::sleep(Duration::from_millis(150)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(Observation::positive("finished late"))
        }
    }

    fn fixed(id: &'static str, delay_ms: u64, result: Result<Observation, ProbeError>) -> Arc<dyn Probe> {
        Arc::new(FixedProbe {
            id,
            delay: Duration::from_millis(delay_ms),
            result,
        })
    }

    #[tokio::test]
    async fn test_successful_probe_keeps_observation() {
        let probe = fixed("storage_quota", 0, Ok(Observation::positive("low quota").with_aux(100.0)));
        let result = run_probe(probe, Duration::from_secs(1)).await;

        assert_eq!(result.outcome, ProbeOutcome::Positive);
        assert_eq!(result.evidence, "low quota");
        assert_eq!(result.method, "fixed");
        assert_eq!(result.aux_value, Some(100.0));
        assert!(result.diagnostic.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_probe_is_indeterminate() {
        let probe = fixed("file_system", 0, Err(ProbeError::Unsupported("no API".into())));
        let result = run_probe(probe, Duration::from_secs(1)).await;

        assert_eq!(result.outcome, ProbeOutcome::Indeterminate);
        assert!(result.evidence.contains("unsupported"));
        assert!(result.diagnostic.is_some());
    }

    #[tokio::test]
    async fn test_failed_probe_is_indeterminate() {
        let probe = fixed("indexeddb_open", 0, Err(ProbeError::Failed("blocked".into())));
        let result = run_probe(probe, Duration::from_secs(1)).await;

        assert_eq!(result.outcome, ProbeOutcome::Indeterminate);
        assert_eq!(result.evidence, "probe failed: blocked");
    }

    #[tokio::test]
    async fn test_panicking_probe_is_indeterminate() {
        let result = run_probe(Arc::new(PanickingProbe), Duration::from_secs(1)).await;

        assert_eq!(result.probe_id, "panics");
        assert_eq!(result.outcome, ProbeOutcome::Indeterminate);
        assert_eq!(result.evidence, "probe panicked");
    }

    #[tokio::test]
    async fn test_timeout_is_indeterminate() {
        let probe = fixed("service_worker", 500, Ok(Observation::positive("too late")));
        let result = run_probe(probe, Duration::from_millis(20)).await;

        assert_eq!(result.outcome, ProbeOutcome::Indeterminate);
        assert_eq!(result.evidence, "probe timed out after 20 ms");
    }

    #[tokio::test]
    async fn test_timed_out_probe_keeps_running_detached() {
        let finished = Arc::new(AtomicBool::new(false));
        let probe = Arc::new(SlowFlagProbe {
            finished: Arc::clone(&finished),
        });

        let result = run_probe(probe, Duration::from_millis(10)).await;
        assert_eq!(result.outcome, ProbeOutcome::Indeterminate);
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_probe_set_preserves_input_order() {
        let probes = vec![
            fixed("slowest", 60, Ok(Observation::negative("a"))),
            fixed("fast", 0, Ok(Observation::positive("b"))),
            fixed("middle", 30, Err(ProbeError::Failed("c".into()))),
        ];

        let results = run_probe_set(&probes, Duration::from_secs(1)).await;
        let ids: Vec<&str> = results.iter().map(|r| r.probe_id.as_str()).collect();
        assert_eq!(ids, vec!["slowest", "fast", "middle"]);
    }

    #[tokio::test]
    async fn test_probe_set_runs_concurrently() {
        let probes: Vec<Arc<dyn Probe>> = (0..4)
            .map(|_| fixed("sleepy", 150, Ok(Observation::negative("ok"))))
            .collect();

        let started = Instant::now();
        let results = run_probe_set(&probes, Duration::from_secs(2)).await;

        assert_eq!(results.len(), 4);
        assert!(started.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_scheduled_override_extends_budget() {
        let scheduled = vec![
            ScheduledProbe::new(fixed("tor_exit_list", 80, Ok(Observation::positive("listed"))))
                .with_timeout(Duration::from_millis(500)),
            ScheduledProbe::new(fixed("webrtc_blocked", 80, Ok(Observation::positive("no candidates")))),
        ];

        let results = run_scheduled(&scheduled, Duration::from_millis(20)).await;
        assert_eq!(results[0].outcome, ProbeOutcome::Positive);
        assert_eq!(results[1].outcome, ProbeOutcome::Indeterminate);
    }

    #[test]
    fn test_synthetic_result_method() {
        let result = synthetic("do_not_track", ProbeOutcome::Positive, "DNT header set");
        assert_eq!(result.method, "synthetic");
        assert_eq!(result.duration_ms, 0);
    }
}
