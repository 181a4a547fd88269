//! Capability: a node-scoped assertion (kubernetes, docker, ssh, ...)
//! whose confidence is computed from its evidence set by diminishing
//! corroboration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;
use crate::property::PropertyBag;

/// Maturity bucket derived from aggregate confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    Speculative,
    Probable,
    Confirmed,
}

impl CapabilityStatus {
    /// Status thresholds: >= 0.7 confirmed, >= 0.4 probable, else
    /// speculative.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.7 {
            CapabilityStatus::Confirmed
        } else if confidence >= 0.4 {
            CapabilityStatus::Probable
        } else {
            CapabilityStatus::Speculative
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Functional trait this capability groups evidence for, e.g.
    /// `"kubernetes"`, `"docker"`, `"ssh"`. Kept as a string rather than a
    /// closed enum because adapters may introduce new capability kinds
    /// beyond the common ones.
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
    pub status: CapabilityStatus,
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_probed: Option<DateTime<Utc>>,
}

impl Capability {
    pub fn new(kind: impl Into<String>) -> Self {
        Capability {
            kind: kind.into(),
            confidence: 0.0,
            status: CapabilityStatus::Speculative,
            properties: PropertyBag::new(),
            evidence: Vec::new(),
            last_probed: None,
        }
    }

    /// Folds one more evidence record into this capability and
    /// recomputes the aggregate confidence and status. Never discards
    /// evidence contributed by other sources.
    pub fn add_evidence(&mut self, evidence: Evidence) {
        self.last_probed = Some(evidence.observed_at);
        self.evidence.push(evidence);
        self.recompute();
    }

    /// Aggregate confidence: `max(confidences) + sum_{i>=1}((1 - max) *
    /// 0.05 * (c_i / max))`, capped at 1.0, where the sum ranges over all
    /// evidence other than the single highest-confidence one.
    fn recompute(&mut self) {
        if self.evidence.is_empty() {
            self.confidence = 0.0;
            self.status = CapabilityStatus::Speculative;
            return;
        }

        let max = self
            .evidence
            .iter()
            .map(|e| e.confidence)
            .fold(f64::MIN, f64::max);

        let mut used_max = false;
        let mut aggregate = max;
        if max > 0.0 {
            for e in &self.evidence {
                if !used_max && e.confidence == max {
                    used_max = true;
                    continue;
                }
                aggregate += (1.0 - max) * 0.05 * (e.confidence / max);
            }
        }

        self.confidence = aggregate.min(1.0);
        self.status = CapabilityStatus::from_confidence(self.confidence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceSource;
    use crate::property::PropertyValue;

    fn ev(confidence: f64) -> Evidence {
        Evidence::new(
            "capability",
            "kubernetes",
            PropertyValue::Bool(true),
            EvidenceSource::AuthenticatedApi,
            Utc::now(),
        )
        .with_confidence(confidence)
    }

    #[test]
    fn single_evidence_matches_its_confidence() {
        let mut cap = Capability::new("kubernetes");
        cap.add_evidence(ev(0.95));
        assert!((cap.confidence - 0.95).abs() < 1e-9);
        assert_eq!(cap.status, CapabilityStatus::Confirmed);
    }

    #[test]
    fn corroborating_evidence_raises_confidence_above_max_but_not_to_one() {
        let mut cap = Capability::new("kubernetes");
        cap.add_evidence(ev(0.95));
        cap.add_evidence(ev(0.85));
        assert!(cap.confidence > 0.95);
        assert!(cap.confidence <= 0.99);
    }

    #[test]
    fn confidence_never_exceeds_one() {
        let mut cap = Capability::new("docker");
        for _ in 0..20 {
            cap.add_evidence(ev(0.99));
        }
        assert!(cap.confidence <= 1.0);
    }

    #[test]
    fn status_thresholds_hold() {
        assert_eq!(CapabilityStatus::from_confidence(0.75), CapabilityStatus::Confirmed);
        assert_eq!(CapabilityStatus::from_confidence(0.5), CapabilityStatus::Probable);
        assert_eq!(CapabilityStatus::from_confidence(0.1), CapabilityStatus::Speculative);
    }

    proptest::proptest! {
        #[test]
        fn aggregate_confidence_stays_within_unit_range(confidences in proptest::collection::vec(0.0f64..=1.0, 1..20)) {
            let mut cap = Capability::new("fuzzed");
            for c in confidences {
                cap.add_evidence(ev(c));
            }
            proptest::prop_assert!(cap.confidence >= 0.0 && cap.confidence <= 1.0);
        }
    }
}
