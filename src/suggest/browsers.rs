//! Browser-specific copy for the tracking-protection suggestion.

/// Browsers that already ship hardened privacy defaults.
const HARDENED: &[&str] = &["brave", "tor browser", "tor", "librewolf", "mullvad browser", "mullvad"];

/// Recommendation text for one browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingProtectionCopy {
    pub browser: &'static str,
    pub action: &'static str,
    pub description: &'static str,
}

const GENERIC: TrackingProtectionCopy = TrackingProtectionCopy {
    browser: "your browser",
    action: "Enable built-in tracking protection",
    description: "Open your browser's privacy settings and turn on its strictest tracking or cross-site cookie protection.",
};

/// Lookup table keyed on a lowercase name fragment. Order matters: the
/// first fragment contained in the browser name wins.
const COPY: &[(&str, TrackingProtectionCopy)] = &[
    (
        "firefox",
        TrackingProtectionCopy {
            browser: "Firefox",
            action: "Set Enhanced Tracking Protection to Strict",
            description: "Settings > Privacy & Security > Enhanced Tracking Protection > Strict blocks cross-site cookies, fingerprinters and cryptominers.",
        },
    ),
    (
        "edge",
        TrackingProtectionCopy {
            browser: "Edge",
            action: "Set Tracking prevention to Strict",
            description: "Settings > Privacy, search, and services > Tracking prevention > Strict blocks most trackers across sites.",
        },
    ),
    (
        "opera",
        TrackingProtectionCopy {
            browser: "Opera",
            action: "Enable the built-in ad and tracker blocker",
            description: "Settings > Privacy protection > Block ads and Block trackers are off by default.",
        },
    ),
    (
        "vivaldi",
        TrackingProtectionCopy {
            browser: "Vivaldi",
            action: "Turn on tracker and ad blocking",
            description: "Settings > Privacy and Security > Tracker and Ad Blocking > Block Trackers and Ads.",
        },
    ),
    (
        "chrom",
        TrackingProtectionCopy {
            browser: "Chrome",
            action: "Block third-party cookies",
            description: "Settings > Privacy and security > Third-party cookies > Block third-party cookies, and review Ad privacy settings.",
        },
    ),
    (
        "safari",
        TrackingProtectionCopy {
            browser: "Safari",
            action: "Enable Prevent cross-site tracking",
            description: "Settings > Privacy > Prevent cross-site tracking, and set Advanced Tracking and Fingerprinting Protection to All Browsing.",
        },
    ),
];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Whether the browser already ships hardened privacy defaults.
pub fn is_hardened(name: &str) -> bool {
    let name = normalize(name);
    HARDENED
        .iter()
        .any(|key| name == *key || name.starts_with(&format!("{} ", key)))
}

/// Tracking-protection copy for a detected browser name, falling back to a
/// generic recommendation.
pub fn tracking_protection_copy(name: Option<&str>) -> TrackingProtectionCopy {
    let Some(name) = name.map(normalize) else {
        return GENERIC;
    };
    COPY.iter()
        .find(|(key, _)| name.contains(key))
        .map(|(_, copy)| *copy)
        .unwrap_or(GENERIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardened_browsers() {
        assert!(is_hardened("Brave"));
        assert!(is_hardened("Tor Browser"));
        assert!(is_hardened("LibreWolf"));
        assert!(is_hardened("Mullvad Browser"));
        assert!(!is_hardened("Firefox"));
        assert!(!is_hardened("Torch"));
        assert!(!is_hardened("Navigator"));
    }

    #[test]
    fn test_browser_specific_copy() {
        assert_eq!(tracking_protection_copy(Some("Firefox")).browser, "Firefox");
        assert_eq!(tracking_protection_copy(Some("Microsoft Edge")).browser, "Edge");
        assert_eq!(tracking_protection_copy(Some("Google Chrome")).browser, "Chrome");
        assert_eq!(tracking_protection_copy(Some("Chromium")).browser, "Chrome");
        assert_eq!(tracking_protection_copy(Some(" safari ")).browser, "Safari");
    }

    #[test]
    fn test_unknown_browser_gets_generic_copy() {
        assert_eq!(tracking_protection_copy(Some("Lynx")), GENERIC);
        assert_eq!(tracking_protection_copy(None), GENERIC);
    }
}
