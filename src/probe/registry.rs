//! Named probe registry.
//!
//! The registry is the collaborator boundary: probe implementations are
//! registered here by whoever embeds the engine, and the detector selects the
//! subset that applies to the detected engine profile.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::Probe;

/// A probe paired with its timeout budget.
#[derive(Clone)]
pub struct ScheduledProbe {
    pub probe: Arc<dyn Probe>,
    /// Overrides the batch-wide timeout when set.
    pub timeout: Option<Duration>,
}

impl ScheduledProbe {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self { probe, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> &str {
        self.probe.id()
    }
}

impl std::fmt::Debug for ScheduledProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledProbe")
            .field("id", &self.probe.id())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Registry of probes keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    entries: BTreeMap<String, ScheduledProbe>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a probe under its own id, replacing any previous entry.
    pub fn register(&mut self, probe: Arc<dyn Probe>) -> &mut Self {
        let id = probe.id().to_string();
        if self.entries.insert(id.clone(), ScheduledProbe::new(probe)).is_some() {
            debug!("Replaced probe registration for {}", id);
        }
        self
    }

    /// Registers a probe with its own timeout budget.
    pub fn register_with_timeout(&mut self, probe: Arc<dyn Probe>, timeout: Duration) -> &mut Self {
        let id = probe.id().to_string();
        let entry = ScheduledProbe::new(probe).with_timeout(timeout);
        if self.entries.insert(id.clone(), entry).is_some() {
            debug!("Replaced probe registration for {}", id);
        }
        self
    }

    /// Sets a timeout override on an already registered probe.
    ///
    /// Returns `false` when no probe is registered under `id`.
    pub fn set_timeout(&mut self, id: &str, timeout: Duration) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.timeout = Some(timeout);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ScheduledProbe> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the scheduled probes for the requested ids.
    ///
    /// Ids without a registered probe are skipped; duplicates are scheduled
    /// once, at their first position.
    pub fn select<'a, I>(&self, ids: I) -> Vec<ScheduledProbe>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut selected: Vec<ScheduledProbe> = Vec::new();
        for id in ids {
            if selected.iter().any(|s| s.id() == id) {
                continue;
            }
            match self.entries.get(id) {
                Some(entry) => selected.push(entry.clone()),
                None => debug!("No probe registered for {}, skipping", id),
            }
        }
        selected
    }
}
