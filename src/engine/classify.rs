//! Classification of a completed tally.
//!
//! [`classify`] is pure and total: the same tally and Tor assessment always
//! yield the same result, and no input makes it fail.

use serde::{Deserialize, Serialize};

use super::aggregate::Tally;
use super::tor::TorAssessment;

/// Score at or above which the status is "Private / Incognito Detected".
pub const PRIVATE_THRESHOLD: u8 = 60;
/// Score at or above which the status is "Privacy-Enhanced Mode".
pub const ENHANCED_THRESHOLD: u8 = 35;
/// Score at or above which the status is "Some Privacy Features Active".
pub const FEATURES_THRESHOLD: u8 = 15;

/// Qualitative certainty of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Whether the verdict should be presented as tentative.
    pub fn is_tentative(&self) -> bool {
        matches!(self, ConfidenceTier::None | ConfidenceTier::Low)
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::None => write!(f, "NONE"),
            ConfidenceTier::Low => write!(f, "LOW"),
            ConfidenceTier::Medium => write!(f, "MEDIUM"),
            ConfidenceTier::High => write!(f, "HIGH"),
        }
    }
}

/// Verdict label shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusLabel {
    #[serde(rename = "Tor Browser Detected")]
    TorBrowser,
    #[serde(rename = "Private / Incognito Detected")]
    PrivateIncognito,
    #[serde(rename = "Privacy-Enhanced Mode")]
    PrivacyEnhanced,
    #[serde(rename = "Some Privacy Features Active")]
    SomePrivacyFeatures,
    #[serde(rename = "Standard Mode")]
    Standard,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::TorBrowser => "Tor Browser Detected",
            StatusLabel::PrivateIncognito => "Private / Incognito Detected",
            StatusLabel::PrivacyEnhanced => "Privacy-Enhanced Mode",
            StatusLabel::SomePrivacyFeatures => "Some Privacy Features Active",
            StatusLabel::Standard => "Standard Mode",
        }
    }

    /// Label for a normalized score, ignoring overrides.
    pub fn from_score(score: u8) -> Self {
        if score >= PRIVATE_THRESHOLD {
            StatusLabel::PrivateIncognito
        } else if score >= ENHANCED_THRESHOLD {
            StatusLabel::PrivacyEnhanced
        } else if score >= FEATURES_THRESHOLD {
            StatusLabel::SomePrivacyFeatures
        } else {
            StatusLabel::Standard
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// 0..=100
    pub normalized_score: u8,
    pub confidence: ConfidenceTier,
    pub status: StatusLabel,
    pub is_tor_override: bool,
    pub findings: Vec<String>,
}

impl ClassificationResult {
    pub fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    /// Private window or Tor Browser.
    pub fn is_private(&self) -> bool {
        matches!(self.status, StatusLabel::TorBrowser | StatusLabel::PrivateIncognito)
    }
}

/// `round(100 * achieved / max)`, clamped to 0..=100. An empty denominator
/// scores 0.
pub fn normalized_score(tally: &Tally) -> u8 {
    let max = u64::from(tally.max_score.max(1));
    let achieved = u64::from(tally.achieved_score);
    // Round half up in integer arithmetic.
    let score = (200 * achieved + max) / (2 * max);
    u8::try_from(score.min(100)).unwrap_or(100)
}

/// Confidence derived from how many reliable probes triggered.
pub fn confidence_for(tally: &Tally) -> ConfidenceTier {
    if tally.achieved_score == 0 {
        ConfidenceTier::None
    } else if tally.high_tier_hits >= 2 || (tally.high_tier_hits == 1 && tally.high_tier_attempts == 1) {
        ConfidenceTier::High
    } else if tally.high_tier_hits == 1 || tally.triggered_findings.len() >= 3 {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

/// Classifies a completed tally.
///
/// A definite Tor match wins outright: the status becomes
/// [`StatusLabel::TorBrowser`] and confidence is forced to HIGH whatever the
/// numeric score is.
pub fn classify(tally: &Tally, tor: &TorAssessment) -> ClassificationResult {
    let normalized_score = normalized_score(tally);
    let is_tor_override = tor.is_definite();

    let (status, confidence) = if is_tor_override {
        (StatusLabel::TorBrowser, ConfidenceTier::High)
    } else {
        (StatusLabel::from_score(normalized_score), confidence_for(tally))
    };

    ClassificationResult {
        normalized_score,
        confidence,
        status,
        is_tor_override,
        findings: tally.triggered_findings.clone(),
    }
}
