//! Engine profile detection.
//!
//! Probe reliability depends on which browser engine is being inspected, so
//! the first step of every run is to classify the host into a coarse engine
//! family. Detection only looks at markers the client already collected and
//! never fails: anything it cannot resolve becomes [`EngineProfile::Unknown`].

use serde::{Deserialize, Serialize};

/// Coarse browser engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineProfile {
    /// Blink/V8 (Chrome, Edge, Brave, Opera, Vivaldi)
    Chromium,
    /// Gecko/SpiderMonkey (Firefox, Tor Browser, LibreWolf)
    Gecko,
    /// WebKit/JavaScriptCore (Safari, every iOS browser)
    WebKit,
    #[default]
    Unknown,
}

impl EngineProfile {
    /// Engine-specific profiles, in the order their weight lists are merged
    /// for [`EngineProfile::Unknown`].
    pub fn known() -> [EngineProfile; 3] {
        [EngineProfile::Chromium, EngineProfile::Gecko, EngineProfile::WebKit]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineProfile::Chromium => "chromium",
            EngineProfile::Gecko => "gecko",
            EngineProfile::WebKit => "webkit",
            EngineProfile::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EngineProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment markers collected on the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentMarkers {
    /// Message of the RangeError thrown by `(-1).toFixed(-1)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// `eval.toString().length`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_source_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// `navigator.vendor`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

impl EnvironmentMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_eval_source_length(mut self, length: u32) -> Self {
        self.eval_source_length = Some(length);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }
}

/// Classifies the host engine from its markers.
///
/// Precedence: error-message fingerprint, then `eval` source length, then
/// the User-Agent string. The User-Agent is last because it is the marker
/// hardened browsers most often spoof.
pub fn detect_engine_profile(markers: &EnvironmentMarkers) -> EngineProfile {
    from_error_message(markers)
        .or_else(|| from_eval_length(markers))
        .or_else(|| from_user_agent(markers))
        .unwrap_or(EngineProfile::Unknown)
}

fn from_error_message(markers: &EnvironmentMarkers) -> Option<EngineProfile> {
    let message = markers.error_message.as_deref()?.trim();

    if message.starts_with("toFixed() digits argument") {
        Some(EngineProfile::Chromium)
    } else if message.starts_with("precision ") && message.ends_with("out of range") {
        Some(EngineProfile::Gecko)
    } else if message.starts_with("toFixed() argument") {
        Some(EngineProfile::WebKit)
    } else {
        None
    }
}

fn from_eval_length(markers: &EnvironmentMarkers) -> Option<EngineProfile> {
    match markers.eval_source_length? {
        33 => Some(EngineProfile::Chromium),
        // SpiderMonkey and JavaScriptCore print the same source; the vendor
        // string tells them apart.
        37 => {
            let apple = markers
                .vendor
                .as_deref()
                .map(|v| v.starts_with("Apple"))
                .unwrap_or(false);
            Some(if apple {
                EngineProfile::WebKit
            } else {
                EngineProfile::Gecko
            })
        }
        _ => None,
    }
}

fn from_user_agent(markers: &EnvironmentMarkers) -> Option<EngineProfile> {
    let ua = markers.user_agent.as_deref()?;

    if ua.contains("Firefox/") {
        Some(EngineProfile::Gecko)
    } else if ua.contains("Chrome/") || ua.contains("Chromium/") || ua.contains("Edg/") {
        Some(EngineProfile::Chromium)
    } else if ua.contains("Safari/") || ua.contains("AppleWebKit/") {
        Some(EngineProfile::WebKit)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
    const FIREFOX_UA: &str = "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0";
    const SAFARI_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15";

    #[test]
    fn test_error_message_fingerprints() {
        let chromium = EnvironmentMarkers::new()
            .with_error_message("toFixed() digits argument must be between 0 and 100");
        let gecko = EnvironmentMarkers::new().with_error_message("precision -1 out of range");
        let webkit = EnvironmentMarkers::new()
            .with_error_message("toFixed() argument must be between 0 and 100");

        assert_eq!(detect_engine_profile(&chromium), EngineProfile::Chromium);
        assert_eq!(detect_engine_profile(&gecko), EngineProfile::Gecko);
        assert_eq!(detect_engine_profile(&webkit), EngineProfile::WebKit);
    }

    #[test]
    fn test_error_message_beats_spoofed_user_agent() {
        let markers = EnvironmentMarkers::new()
            .with_error_message("precision -1 out of range")
            .with_user_agent(CHROME_UA);

        assert_eq!(detect_engine_profile(&markers), EngineProfile::Gecko);
    }

    #[test]
    fn test_eval_length_with_vendor() {
        let chromium = EnvironmentMarkers::new().with_eval_source_length(33);
        let webkit = EnvironmentMarkers::new()
            .with_eval_source_length(37)
            .with_vendor("Apple Computer, Inc.");
        let gecko = EnvironmentMarkers::new().with_eval_source_length(37).with_vendor("");

        assert_eq!(detect_engine_profile(&chromium), EngineProfile::Chromium);
        assert_eq!(detect_engine_profile(&webkit), EngineProfile::WebKit);
        assert_eq!(detect_engine_profile(&gecko), EngineProfile::Gecko);
    }

    #[test]
    fn test_user_agent_fallback() {
        let ua = |s: &str| EnvironmentMarkers::new().with_user_agent(s);

        assert_eq!(detect_engine_profile(&ua(CHROME_UA)), EngineProfile::Chromium);
        assert_eq!(detect_engine_profile(&ua(FIREFOX_UA)), EngineProfile::Gecko);
        assert_eq!(detect_engine_profile(&ua(SAFARI_UA)), EngineProfile::WebKit);
    }

    #[test]
    fn test_unresolvable_is_unknown() {
        assert_eq!(
            detect_engine_profile(&EnvironmentMarkers::default()),
            EngineProfile::Unknown
        );

        let garbage = EnvironmentMarkers::new()
            .with_error_message("something else entirely")
            .with_eval_source_length(12)
            .with_user_agent("curl/8.5.0");
        assert_eq!(detect_engine_profile(&garbage), EngineProfile::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(EngineProfile::WebKit.to_string(), "webkit");
        assert_eq!(EngineProfile::default(), EngineProfile::Unknown);
    }
}
