//! Device fingerprint derivation.
//!
//! A session is bound to a stable hash over coarse client signals
//! (browser family, OS family, device class) plus the source IP.
//! Parsing is deliberately coarse: a browser minor-version bump must
//! not change the fingerprint.

use sha2::{Digest, Sha256};

/// Coarse client signals parsed from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSignals {
    pub browser: &'static str,
    pub os: &'static str,
    pub device: &'static str,
}

/// Parse browser/OS/device families out of a raw user-agent string.
pub fn parse_client_signals(user_agent: &str) -> ClientSignals {
    // Order matters: Edge and Opera embed "Chrome", Chrome embeds
    // "Safari".
    let browser = if user_agent.contains("Firefox/") {
        "firefox"
    } else if user_agent.contains("Edg/") {
        "edge"
    } else if user_agent.contains("OPR/") || user_agent.contains("Opera") {
        "opera"
    } else if user_agent.contains("Chrome/") {
        "chrome"
    } else if user_agent.contains("Safari/") {
        "safari"
    } else {
        "unknown"
    };

    let os = if user_agent.contains("Windows") {
        "windows"
    } else if user_agent.contains("Android") {
        "android"
    } else if user_agent.contains("iPhone") || user_agent.contains("iPad") {
        "ios"
    } else if user_agent.contains("Mac OS X") {
        "macos"
    } else if user_agent.contains("Linux") {
        "linux"
    } else {
        "unknown"
    };

    let device = if user_agent.contains("iPad") || user_agent.contains("Tablet") {
        "tablet"
    } else if user_agent.contains("Mobile") || user_agent.contains("iPhone") {
        "mobile"
    } else {
        "desktop"
    };

    ClientSignals {
        browser,
        os,
        device,
    }
}

/// Derive the device fingerprint: `hex(sha256(browser|os|device|ip))`.
pub fn device_fingerprint(user_agent: &str, ip_address: &str) -> String {
    let signals = parse_client_signals(user_agent);
    let mut hasher = Sha256::new();
    hasher.update(signals.browser.as_bytes());
    hasher.update(b"|");
    hasher.update(signals.os.as_bytes());
    hasher.update(b"|");
    hasher.update(signals.device.as_bytes());
    hasher.update(b"|");
    hasher.update(ip_address.as_bytes());
    hex::encode(hasher.finalize())
}
