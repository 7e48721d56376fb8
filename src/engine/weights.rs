//! Per-engine probe weighting.
//!
//! The weight table is configuration data: which probes run for a given
//! engine profile, how much each contributes to the score, and how reliable
//! its signal is. Re-tuning a weight or adding an engine is a data change.
//!
//! A probe that has no entry for the active profile is not run at all. It is
//! not scored as zero.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::profile::EngineProfile;

/// Well-known probe ids.
pub mod probe_ids {
    pub const STORAGE_QUOTA: &str = "storage_quota";
    pub const FILE_SYSTEM: &str = "file_system";
    pub const INDEXEDDB_DURABILITY: &str = "indexeddb_durability";
    pub const INDEXEDDB_OPEN: &str = "indexeddb_open";
    pub const SERVICE_WORKER: &str = "service_worker";
    pub const HEAP_LIMIT: &str = "heap_limit";
    pub const CACHE_API: &str = "cache_api";
    pub const LOCAL_STORAGE_WRITE: &str = "local_storage_write";

    pub const TOR_HEURISTIC: &str = "tor_heuristic";
    pub const AD_BLOCKER: &str = "ad_blocker";
    pub const WEBRTC_BLOCKED: &str = "webrtc_blocked";
    pub const GLOBAL_PRIVACY_CONTROL: &str = "global_privacy_control";
    pub const DO_NOT_TRACK: &str = "do_not_track";

    pub const TOR_EXIT_LIST: &str = "tor_exit_list";
    pub const TOR_LETTERBOXING: &str = "tor_letterboxing";
    pub const TOR_FONT_WHITELIST: &str = "tor_font_whitelist";
    pub const TOR_USER_AGENT: &str = "tor_user_agent";
    pub const TOR_UTC_TIMEZONE: &str = "tor_utc_timezone";
    pub const TOR_WEBGL_DISABLED: &str = "tor_webgl_disabled";
}

/// Reliability of a probe's signal on a given engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReliabilityTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ReliabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReliabilityTier::Low => write!(f, "LOW"),
            ReliabilityTier::Medium => write!(f, "MEDIUM"),
            ReliabilityTier::High => write!(f, "HIGH"),
        }
    }
}

/// Weight and reliability of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub probe_id: String,
    pub weight: u32,
    pub tier: ReliabilityTier,
}

impl WeightEntry {
    pub fn new(probe_id: impl Into<String>, weight: u32, tier: ReliabilityTier) -> Self {
        Self {
            probe_id: probe_id.into(),
            weight,
            tier,
        }
    }

    pub fn high(probe_id: impl Into<String>, weight: u32) -> Self {
        Self::new(probe_id, weight, ReliabilityTier::High)
    }

    pub fn medium(probe_id: impl Into<String>, weight: u32) -> Self {
        Self::new(probe_id, weight, ReliabilityTier::Medium)
    }

    pub fn low(probe_id: impl Into<String>, weight: u32) -> Self {
        Self::new(probe_id, weight, ReliabilityTier::Low)
    }
}

static BUILTIN: Lazy<Arc<WeightTable>> = Lazy::new(|| Arc::new(WeightTable::builtin()));

/// Read-only mapping from engine profile to weighted probes, plus the
/// engine-agnostic list applied to every profile.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    engines: HashMap<EngineProfile, Vec<WeightEntry>>,
    agnostic: Vec<WeightEntry>,
}

impl WeightTable {
    /// Creates an empty table. Nothing is scored against it.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        use probe_ids::*;

        Self::new()
            .with_engine(
                EngineProfile::Chromium,
                vec![
                    WeightEntry::high(STORAGE_QUOTA, 40),
                    WeightEntry::high(FILE_SYSTEM, 35),
                    WeightEntry::medium(INDEXEDDB_DURABILITY, 15),
                    WeightEntry::low(SERVICE_WORKER, 10),
                    WeightEntry::low(HEAP_LIMIT, 10),
                ],
            )
            .with_engine(
                EngineProfile::Gecko,
                vec![
                    WeightEntry::high(INDEXEDDB_OPEN, 40),
                    WeightEntry::high(SERVICE_WORKER, 30),
                    WeightEntry::medium(STORAGE_QUOTA, 20),
                    WeightEntry::low(CACHE_API, 10),
                ],
            )
            .with_engine(
                EngineProfile::WebKit,
                vec![
                    WeightEntry::high(LOCAL_STORAGE_WRITE, 40),
                    WeightEntry::high(INDEXEDDB_OPEN, 30),
                    WeightEntry::medium(STORAGE_QUOTA, 20),
                    WeightEntry::low(CACHE_API, 10),
                ],
            )
            .with_agnostic(vec![
                WeightEntry::medium(TOR_HEURISTIC, 30),
                WeightEntry::medium(AD_BLOCKER, 15),
                WeightEntry::low(WEBRTC_BLOCKED, 10),
                WeightEntry::low(GLOBAL_PRIVACY_CONTROL, 10),
                WeightEntry::low(DO_NOT_TRACK, 5),
            ])
    }

    /// Shared handle to the built-in table. Safe for concurrent reads.
    pub fn shared() -> Arc<WeightTable> {
        Arc::clone(&BUILTIN)
    }

    /// Sets the entries for a specific engine.
    ///
    /// [`EngineProfile::Unknown`] is always derived from the known engines,
    /// so entries given for it are ignored.
    pub fn with_engine(mut self, profile: EngineProfile, entries: Vec<WeightEntry>) -> Self {
        if profile == EngineProfile::Unknown {
            debug!("Ignoring explicit weight entries for the unknown profile");
            return self;
        }
        self.engines.insert(profile, entries);
        self
    }

    /// Sets the engine-agnostic entries.
    pub fn with_agnostic(mut self, entries: Vec<WeightEntry>) -> Self {
        self.agnostic = entries;
        self
    }

    /// Replaces the weight of every entry whose id appears in `overrides`.
    /// Tiers are never changed.
    pub fn with_overrides(mut self, overrides: &HashMap<String, u32>) -> Self {
        if overrides.is_empty() {
            return self;
        }
        let entries = self
            .engines
            .values_mut()
            .flat_map(|v| v.iter_mut())
            .chain(self.agnostic.iter_mut());
        for entry in entries {
            if let Some(&weight) = overrides.get(&entry.probe_id) {
                debug!("Weight override for {}: {} -> {}", entry.probe_id, entry.weight, weight);
                entry.weight = weight;
            }
        }
        self
    }

    /// Engine-specific entries for a profile.
    ///
    /// `Unknown` yields the union of every known engine's entries; an id
    /// listed by several engines keeps its first occurrence.
    pub fn engine_entries(&self, profile: EngineProfile) -> Vec<&WeightEntry> {
        let profiles: Vec<EngineProfile> = match profile {
            EngineProfile::Unknown => EngineProfile::known().to_vec(),
            known => vec![known],
        };

        let mut seen = HashSet::new();
        profiles
            .iter()
            .filter_map(|p| self.engines.get(p))
            .flatten()
            .filter(|entry| seen.insert(entry.probe_id.as_str()))
            .collect()
    }

    pub fn agnostic_entries(&self) -> &[WeightEntry] {
        &self.agnostic
    }

    /// Every entry applicable to a profile: engine-specific first, then
    /// engine-agnostic. An engine-specific entry shadows an agnostic one with
    /// the same id.
    pub fn entries_for(&self, profile: EngineProfile) -> Vec<&WeightEntry> {
        let mut entries = self.engine_entries(profile);
        let engine_ids: HashSet<&str> = entries.iter().map(|e| e.probe_id.as_str()).collect();
        entries.extend(
            self.agnostic
                .iter()
                .filter(|e| !engine_ids.contains(e.probe_id.as_str())),
        );
        entries
    }

    /// Looks up the applicable entry for a probe.
    pub fn lookup(&self, profile: EngineProfile, probe_id: &str) -> Option<&WeightEntry> {
        self.entries_for(profile)
            .into_iter()
            .find(|e| e.probe_id == probe_id)
    }

    /// Ids of the probes to run for a profile.
    pub fn probe_ids_for(&self, profile: EngineProfile) -> Vec<&str> {
        self.entries_for(profile)
            .into_iter()
            .map(|e| e.probe_id.as_str())
            .collect()
    }

    /// Total nominal weight for a profile. Informational only; scoring
    /// normalizes against attempted weight.
    pub fn nominal_weight(&self, profile: EngineProfile) -> u32 {
        self.entries_for(profile).iter().map(|e| e.weight).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.agnostic.is_empty() && self.engines.values().all(Vec::is_empty)
    }
}
