//! Hostname inference: multiple sources can each propose a hostname for
//! a node, with the most-trusted still-live candidate winning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a hostname candidate came from, ordered highest-trust first.
/// Distinct from [`crate::evidence::EvidenceSource`]: hostname sources
/// are narrower and carry their own base confidences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostnameSource {
    OperatorTruth,
    AuthenticatedApi,
    ShellProbe,
    ReverseDns,
    ServiceBanner,
    NetbiosOrMdns,
    IpDerived,
    Unknown,
}

impl HostnameSource {
    pub fn base_confidence(self) -> f64 {
        match self {
            HostnameSource::OperatorTruth => 1.0,
            HostnameSource::AuthenticatedApi => 0.90,
            HostnameSource::ShellProbe => 0.85,
            HostnameSource::ReverseDns => 0.65,
            HostnameSource::ServiceBanner => 0.50,
            HostnameSource::NetbiosOrMdns => 0.45,
            HostnameSource::IpDerived => 0.10,
            HostnameSource::Unknown => 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostnameCandidate {
    pub hostname: String,
    pub source: HostnameSource,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

impl HostnameCandidate {
    pub fn new(hostname: impl Into<String>, source: HostnameSource, observed_at: DateTime<Utc>) -> Self {
        HostnameCandidate {
            hostname: hostname.into(),
            source,
            confidence: source.base_confidence(),
            observed_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostnameInference {
    pub candidates: Vec<HostnameCandidate>,
}

impl HostnameInference {
    pub fn new() -> Self {
        HostnameInference::default()
    }

    /// Inserts or refreshes a candidate. A `(hostname, source)` pair is
    /// unique: a later observation from the same source for the same
    /// hostname replaces the earlier one instead of accumulating.
    pub fn observe(&mut self, candidate: HostnameCandidate) {
        if let Some(existing) = self
            .candidates
            .iter_mut()
            .find(|c| c.source == candidate.source && c.hostname == candidate.hostname)
        {
            *existing = candidate;
        } else {
            self.candidates.push(candidate);
        }
    }

    /// The candidate with the highest confidence, ties broken by most
    /// recently observed.
    pub fn best(&self) -> Option<&HostnameCandidate> {
        self.candidates.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.observed_at.cmp(&b.observed_at))
        })
    }

    pub fn best_hostname(&self) -> Option<&str> {
        self.best().map(|c| c.hostname.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(hostname: &str, source: HostnameSource) -> HostnameCandidate {
        HostnameCandidate::new(hostname, source, Utc::now())
    }

    #[test]
    fn best_prefers_higher_trust_source() {
        let mut inference = HostnameInference::new();
        inference.observe(candidate("host-guess.lan", HostnameSource::IpDerived));
        inference.observe(candidate("db-primary", HostnameSource::ShellProbe));
        assert_eq!(inference.best_hostname(), Some("db-primary"));
    }

    #[test]
    fn observing_same_source_and_hostname_replaces_not_accumulates() {
        let mut inference = HostnameInference::new();
        inference.observe(candidate("old-name", HostnameSource::ReverseDns));
        inference.observe(candidate("old-name", HostnameSource::ReverseDns));
        assert_eq!(inference.candidates.len(), 1);
    }

    #[test]
    fn operator_truth_outranks_everything() {
        let mut inference = HostnameInference::new();
        inference.observe(candidate("api-name", HostnameSource::AuthenticatedApi));
        inference.observe(candidate("truth-name", HostnameSource::OperatorTruth));
        assert_eq!(inference.best_hostname(), Some("truth-name"));
    }
}
