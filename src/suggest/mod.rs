//! Rule-based remediation suggestions.
//!
//! Suggestions are produced from a flat [`SuggestionContext`] by a
//! priority-ordered rule table. Two "already optimal" cases end evaluation
//! early with a single informational suggestion; otherwise every matching
//! rule contributes, in table order. The output is never empty.

pub mod browsers;

use serde::{Deserialize, Serialize};

use crate::engine::ClassificationResult;
use browsers::{is_hardened, tracking_protection_copy};

/// Score at or above which an incognito session with a content blocker is
/// considered an excellent setup.
pub const EXCELLENT_SCORE: u8 = 80;

/// Score below which a VPN is recommended when none was detected.
pub const VPN_SCORE: u8 = 40;

/// How much acting on a suggestion improves privacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    High,
    Medium,
    Low,
    Info,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Impact::High => write!(f, "HIGH"),
            Impact::Medium => write!(f, "MEDIUM"),
            Impact::Low => write!(f, "LOW"),
            Impact::Info => write!(f, "INFO"),
        }
    }
}

/// One actionable recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub action: String,
    pub description: String,
    pub impact: Impact,
    pub reason: String,
}

impl Suggestion {
    pub fn new(
        action: impl Into<String>,
        description: impl Into<String>,
        impact: Impact,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            description: description.into(),
            impact,
            reason: reason.into(),
        }
    }
}

/// Inputs to the suggestion rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionContext {
    pub is_tor: bool,
    pub is_incognito: bool,
    pub has_gpc: bool,
    pub has_dnt: bool,
    /// Normalized classification score, 0..=100.
    pub protection_score: u8,
    pub has_ad_blocker: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    pub vpn_detected: bool,
}

impl SuggestionContext {
    /// Seeds a context from a classification; the remaining signals default
    /// to absent.
    pub fn from_classification(result: &ClassificationResult) -> Self {
        Self {
            is_tor: result.is_tor_override,
            is_incognito: result.is_private(),
            protection_score: result.normalized_score,
            ..Self::default()
        }
    }

    pub fn with_incognito(mut self, incognito: bool) -> Self {
        self.is_incognito = incognito;
        self
    }

    pub fn with_gpc(mut self, enabled: bool) -> Self {
        self.has_gpc = enabled;
        self
    }

    pub fn with_dnt(mut self, enabled: bool) -> Self {
        self.has_dnt = enabled;
        self
    }

    pub fn with_ad_blocker(mut self, present: bool) -> Self {
        self.has_ad_blocker = present;
        self
    }

    pub fn with_browser_name(mut self, name: Option<String>) -> Self {
        self.browser_name = name;
        self
    }

    pub fn with_vpn(mut self, detected: bool) -> Self {
        self.vpn_detected = detected;
        self
    }
}

type Rule = fn(&SuggestionContext) -> Option<Suggestion>;

/// Terminal rules: the first match is the whole output.
const TERMINAL_RULES: &[Rule] = &[maximum_anonymity, excellent_setup];

/// Independent rules, evaluated in order; each match appends.
const RULES: &[Rule] = &[
    private_browsing,
    content_blocker,
    tracking_protection,
    global_privacy_control,
    vpn,
];

/// Generates ordered suggestions, most actionable first. Never empty.
pub fn generate_suggestions(context: &SuggestionContext) -> Vec<Suggestion> {
    if let Some(terminal) = TERMINAL_RULES.iter().find_map(|rule| rule(context)) {
        return vec![terminal];
    }

    let mut suggestions: Vec<Suggestion> = RULES.iter().filter_map(|rule| rule(context)).collect();

    if suggestions.is_empty() {
        suggestions.push(Suggestion::new(
            "Keep your current setup",
            "Your browser's privacy configuration looks fine. Keep extensions and the browser up to date.",
            Impact::Info,
            "No remediation rule matched",
        ));
    }

    suggestions
}

fn maximum_anonymity(ctx: &SuggestionContext) -> Option<Suggestion> {
    ctx.is_tor.then(|| {
        Suggestion::new(
            "You're already using maximum anonymity",
            "Tor Browser routes traffic through the Tor network and resists fingerprinting. Avoid resizing the window or installing extensions.",
            Impact::Info,
            "Tor Browser detected",
        )
    })
}

fn excellent_setup(ctx: &SuggestionContext) -> Option<Suggestion> {
    (ctx.protection_score >= EXCELLENT_SCORE && ctx.is_incognito && ctx.has_ad_blocker).then(|| {
        Suggestion::new(
            "Excellent setup",
            "Private browsing together with a content blocker covers the most common tracking vectors.",
            Impact::Info,
            format!(
                "Protection score {} with private mode and a content blocker",
                ctx.protection_score
            ),
        )
    })
}

fn private_browsing(ctx: &SuggestionContext) -> Option<Suggestion> {
    (!ctx.is_incognito).then(|| {
        Suggestion::new(
            "Use private browsing mode",
            "Private or incognito windows discard cookies, site data and history when closed.",
            Impact::High,
            "No private browsing session detected",
        )
    })
}

fn content_blocker(ctx: &SuggestionContext) -> Option<Suggestion> {
    (!ctx.has_ad_blocker).then(|| {
        Suggestion::new(
            "Install a content blocker",
            "An extension such as uBlock Origin blocks ads, trackers and known malicious domains.",
            Impact::High,
            "No ad-blocking or content-blocking extension detected",
        )
    })
}

fn tracking_protection(ctx: &SuggestionContext) -> Option<Suggestion> {
    let hardened = ctx.browser_name.as_deref().map(is_hardened).unwrap_or(false);
    if hardened {
        return None;
    }

    let copy = tracking_protection_copy(ctx.browser_name.as_deref());
    Some(Suggestion::new(
        copy.action,
        copy.description,
        Impact::Medium,
        format!("Tracking protection in {} is configurable", copy.browser),
    ))
}

fn global_privacy_control(ctx: &SuggestionContext) -> Option<Suggestion> {
    if ctx.has_gpc {
        return None;
    }

    let reason = if ctx.has_dnt {
        "Do Not Track is on, but it is a legacy signal; Global Privacy Control supersedes it"
    } else {
        "Global Privacy Control signal not sent"
    };
    Some(Suggestion::new(
        "Enable Global Privacy Control",
        "GPC tells sites not to sell or share your data and is legally binding in some jurisdictions.",
        Impact::Medium,
        reason,
    ))
}

fn vpn(ctx: &SuggestionContext) -> Option<Suggestion> {
    (!ctx.vpn_detected && ctx.protection_score < VPN_SCORE).then(|| {
        Suggestion::new(
            "Consider a VPN",
            "A trustworthy VPN hides your IP address from the sites you visit and from your network provider.",
            Impact::Low,
            format!(
                "No VPN detected and protection score is {}",
                ctx.protection_score
            ),
        )
    })
}
