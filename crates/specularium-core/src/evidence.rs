//! Evidence: an immutable observation with a source-dependent confidence.
//! Capabilities and hostname inference both fold evidence into an
//! aggregate; this module owns the fixed base-confidence table and the
//! deterministic id scheme.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::property::PropertyValue;

/// Where an evidence record came from. Base confidences are fixed; an
/// adapter should use [`EvidenceSource::base_confidence`] unless it has
/// a principled reason to override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    OperatorAsserted,
    AuthenticatedApi,
    CredentialedShellProbe,
    ProcessFilesystemInspection,
    ServiceBanner,
    ReverseDns,
    PortOpen,
    Correlation,
}

impl EvidenceSource {
    /// Reference source confidences, highest-trust source first.
    pub fn base_confidence(self) -> f64 {
        match self {
            EvidenceSource::OperatorAsserted => 1.0,
            EvidenceSource::AuthenticatedApi => 0.95,
            EvidenceSource::CredentialedShellProbe => 0.90,
            EvidenceSource::ProcessFilesystemInspection => 0.85,
            EvidenceSource::ServiceBanner => 0.70,
            EvidenceSource::ReverseDns => 0.60,
            EvidenceSource::PortOpen => 0.50,
            EvidenceSource::Correlation => 0.40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub source: EvidenceSource,
    pub property: String,
    pub value: PropertyValue,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Evidence {
    /// Builds a new evidence record at a category/property key, using the
    /// source's base confidence. `category` participates in the
    /// deterministic id but is not stored on the record itself — callers
    /// that need it keep it as the `EvidenceSet` map key.
    pub fn new(
        category: &str,
        property: impl Into<String>,
        value: PropertyValue,
        source: EvidenceSource,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let property = property.into();
        let confidence = source.base_confidence();
        let id = Self::deterministic_id(category, &property, &value, source, observed_at);
        Evidence {
            id,
            source,
            property,
            value,
            confidence: confidence.clamp(0.0, 1.0),
            expires_at: None,
            secret_ref: None,
            raw: None,
            depends_on: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn with_secret_ref(mut self, secret_ref: impl Into<String>) -> Self {
        self.secret_ref = Some(secret_ref.into());
        self
    }

    /// Deterministic id over `(category, property, value, source,
    /// observed_at_nanos)`, SHA-256 truncated to 8 bytes.
    pub fn deterministic_id(
        category: &str,
        property: &str,
        value: &PropertyValue,
        source: EvidenceSource,
        observed_at: DateTime<Utc>,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(category.as_bytes());
        hasher.update([0u8]);
        hasher.update(property.as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(value).unwrap_or_default());
        hasher.update([0u8]);
        hasher.update(format!("{:?}", source).as_bytes());
        hasher.update([0u8]);
        hasher.update(observed_at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_never_exceeds_bounds() {
        let e = Evidence::new(
            "environment",
            "is_root",
            PropertyValue::Bool(true),
            EvidenceSource::OperatorAsserted,
            Utc::now(),
        )
        .with_confidence(5.0);
        assert!(e.confidence <= 1.0);
    }

    #[test]
    fn deterministic_id_is_stable_for_identical_inputs() {
        let ts = Utc::now();
        let v = PropertyValue::Text("x".into());
        let a = Evidence::deterministic_id("cat", "prop", &v, EvidenceSource::PortOpen, ts);
        let b = Evidence::deterministic_id("cat", "prop", &v, EvidenceSource::PortOpen, ts);
        assert_eq!(a, b);
    }

    #[test]
    fn deterministic_id_changes_with_value() {
        let ts = Utc::now();
        let a = Evidence::deterministic_id(
            "cat",
            "prop",
            &PropertyValue::Text("x".into()),
            EvidenceSource::PortOpen,
            ts,
        );
        let b = Evidence::deterministic_id(
            "cat",
            "prop",
            &PropertyValue::Text("y".into()),
            EvidenceSource::PortOpen,
            ts,
        );
        assert_ne!(a, b);
    }
}
