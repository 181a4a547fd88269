//! Posture: how aggressively the engine is allowed to probe the
//! network. Declared in ascending order of aggressiveness so the
//! derived `Ord` doubles as the "exceeds recommendation" comparison.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Stealth,
    Cautious,
    Balanced,
    Aggressive,
}

impl Default for Posture {
    fn default() -> Self {
        Posture::Balanced
    }
}

/// The concrete behavior a posture resolves to. Fixed per posture
/// rather than independently configurable, so choosing a posture is an
/// all-or-nothing decision an operator can reason about at a glance.
/// Must be implemented verbatim: tests and the verifier/scanner gating
/// both depend on these exact values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureProfile {
    #[serde(with = "duration_secs")]
    pub verify_interval: Duration,
    #[serde(with = "duration_secs")]
    pub scan_interval: Duration,
    pub timeout_secs: u64,
    pub max_probes_per_host: u32,
    pub max_concurrent_scans: u32,
    pub retries: u32,
    pub per_host_min_interval_ms: u64,
    pub jitter_pct: f64,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

impl Posture {
    pub fn profile(self) -> PostureProfile {
        match self {
            Posture::Stealth => PostureProfile {
                verify_interval: Duration::from_secs(4 * 3600),
                scan_interval: Duration::from_secs(24 * 3600),
                timeout_secs: 5,
                max_probes_per_host: 2,
                max_concurrent_scans: 1,
                retries: 0,
                per_host_min_interval_ms: 60_000,
                jitter_pct: 0.30,
            },
            Posture::Cautious => PostureProfile {
                verify_interval: Duration::from_secs(30 * 60),
                scan_interval: Duration::from_secs(2 * 3600),
                timeout_secs: 3,
                max_probes_per_host: 5,
                max_concurrent_scans: 2,
                retries: 1,
                per_host_min_interval_ms: 12_000,
                jitter_pct: 0.20,
            },
            Posture::Balanced => PostureProfile {
                verify_interval: Duration::from_secs(5 * 60),
                scan_interval: Duration::from_secs(15 * 60),
                timeout_secs: 2,
                max_probes_per_host: 10,
                max_concurrent_scans: 3,
                retries: 2,
                per_host_min_interval_ms: 6_000,
                jitter_pct: 0.10,
            },
            Posture::Aggressive => PostureProfile {
                verify_interval: Duration::from_secs(30),
                scan_interval: Duration::from_secs(5 * 60),
                timeout_secs: 1,
                max_probes_per_host: 100,
                max_concurrent_scans: 10,
                retries: 3,
                per_host_min_interval_ms: 1_000,
                jitter_pct: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posture_ordering_is_ascending_aggressiveness() {
        assert!(Posture::Stealth < Posture::Cautious);
        assert!(Posture::Cautious < Posture::Balanced);
        assert!(Posture::Balanced < Posture::Aggressive);
    }

    #[test]
    fn stealth_verifies_every_four_hours() {
        assert_eq!(Posture::Stealth.profile().verify_interval, Duration::from_secs(4 * 3600));
    }

    #[test]
    fn stealth_scans_once_a_day() {
        assert_eq!(Posture::Stealth.profile().scan_interval, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn aggressive_has_the_shortest_intervals() {
        let profile = Posture::Aggressive.profile();
        assert_eq!(profile.verify_interval, Duration::from_secs(30));
        assert_eq!(profile.scan_interval, Duration::from_secs(5 * 60));
        assert_eq!(profile.jitter_pct, 0.0);
    }

    #[test]
    fn timeout_and_concurrency_scale_with_aggressiveness() {
        assert_eq!(Posture::Stealth.profile().timeout_secs, 5);
        assert_eq!(Posture::Cautious.profile().timeout_secs, 3);
        assert_eq!(Posture::Balanced.profile().timeout_secs, 2);
        assert_eq!(Posture::Aggressive.profile().timeout_secs, 1);

        assert_eq!(Posture::Stealth.profile().max_concurrent_scans, 1);
        assert_eq!(Posture::Aggressive.profile().max_concurrent_scans, 10);
    }
}
