//! Operator-asserted truth for a node, and the discrepancies raised
//! when discovered state disagrees with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::property::PropertyValue;

/// The fixed set of keys an operator can assert truth for. Anything
/// outside this set is left to discovered state with no truth-checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruthableKey {
    Existence,
    Ip,
    Hostname,
    MacAddress,
    Type,
    Description,
    Location,
    Owner,
    ExpectedPorts,
}

impl TruthableKey {
    pub const ALL: [TruthableKey; 9] = [
        TruthableKey::Existence,
        TruthableKey::Ip,
        TruthableKey::Hostname,
        TruthableKey::MacAddress,
        TruthableKey::Type,
        TruthableKey::Description,
        TruthableKey::Location,
        TruthableKey::Owner,
        TruthableKey::ExpectedPorts,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTruth {
    #[serde(default)]
    pub properties: std::collections::BTreeMap<TruthableKey, PropertyValue>,
    pub asserted_by: String,
    pub asserted_at: DateTime<Utc>,
}

impl NodeTruth {
    pub fn new(asserted_by: impl Into<String>, asserted_at: DateTime<Utc>) -> Self {
        NodeTruth {
            properties: std::collections::BTreeMap::new(),
            asserted_by: asserted_by.into(),
            asserted_at,
        }
    }

    pub fn assert(&mut self, key: TruthableKey, value: PropertyValue) {
        self.properties.insert(key, value);
    }
}

/// How an operator closed out a discrepancy: by correcting the truth
/// record to match reality, by fixing reality to match the truth
/// record, or by dismissing it as not worth acting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    UpdatedTruth,
    FixedReality,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: String,
    pub node_id: String,
    pub property_key: TruthableKey,
    pub truth_value: PropertyValue,
    pub actual_value: PropertyValue,
    /// Adapter whose discovered value triggered (or last refreshed)
    /// this discrepancy.
    pub source: String,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl Discrepancy {
    pub fn new(
        node_id: impl Into<String>,
        property_key: TruthableKey,
        truth_value: PropertyValue,
        actual_value: PropertyValue,
        source: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let node_id = node_id.into();
        Discrepancy {
            id: format!("{node_id}:{:?}", property_key).to_lowercase(),
            node_id,
            property_key,
            truth_value,
            actual_value,
            source: source.into(),
            detected_at,
            resolved_at: None,
            resolution: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.resolution.is_none()
    }

    /// Refreshes an already-open discrepancy with a newer observation,
    /// or reopens one that had been resolved (an operator's fix didn't
    /// hold, or the disagreement recurred).
    pub fn touch(&mut self, actual_value: PropertyValue, source: &str, observed_at: DateTime<Utc>) {
        self.actual_value = actual_value;
        self.source = source.to_string();
        self.detected_at = observed_at;
        self.resolution = None;
        self.resolved_at = None;
    }

    pub fn resolve(&mut self, resolution: Resolution, resolved_at: DateTime<Utc>) {
        self.resolution = Some(resolution);
        self.resolved_at = Some(resolved_at);
    }
}

/// Compares a node's truth assertions against its discovered state and
/// returns the discrepancies that should exist now. A key with no truth
/// assertion, or whose discovered value loosely matches, produces
/// nothing; callers are responsible for upserting against prior
/// discrepancies and resolving ones no longer returned here.
pub fn check_truth<'a>(
    node_id: &str,
    truth: &'a NodeTruth,
    discovered: impl Fn(TruthableKey) -> Option<&'a PropertyValue>,
    source: &str,
    observed_at: DateTime<Utc>,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for (key, truth_value) in &truth.properties {
        if let Some(discovered_value) = discovered(*key) {
            if !truth_value.loosely_equals(discovered_value) {
                out.push(Discrepancy::new(
                    node_id,
                    *key,
                    truth_value.clone(),
                    discovered_value.clone(),
                    source,
                    observed_at,
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_values_produce_no_discrepancy() {
        let mut truth = NodeTruth::new("operator", Utc::now());
        truth.assert(TruthableKey::Hostname, PropertyValue::Text("db1".into()));
        let discovered = PropertyValue::Text("db1".into());
        let out = check_truth("n1", &truth, |_| Some(&discovered), "verifier", Utc::now());
        assert!(out.is_empty());
    }

    #[test]
    fn mismatched_values_raise_a_discrepancy() {
        let mut truth = NodeTruth::new("operator", Utc::now());
        truth.assert(TruthableKey::Hostname, PropertyValue::Text("db1".into()));
        let discovered = PropertyValue::Text("db2".into());
        let out = check_truth("n1", &truth, |_| Some(&discovered), "verifier", Utc::now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].property_key, TruthableKey::Hostname);
        assert_eq!(out[0].node_id, "n1");
        assert!(out[0].is_open());
    }

    #[test]
    fn key_with_no_discovered_value_is_skipped() {
        let mut truth = NodeTruth::new("operator", Utc::now());
        truth.assert(TruthableKey::Owner, PropertyValue::Text("ops-team".into()));
        let out = check_truth("n1", &truth, |_| None, "verifier", Utc::now());
        assert!(out.is_empty());
    }

    #[test]
    fn resolving_sets_resolved_at() {
        let mut truth = NodeTruth::new("operator", Utc::now());
        truth.assert(TruthableKey::Hostname, PropertyValue::Text("db1".into()));
        let discovered = PropertyValue::Text("db2".into());
        let mut discrepancy = check_truth("n1", &truth, |_| Some(&discovered), "verifier", Utc::now())
            .remove(0);
        let resolved_at = Utc::now();
        discrepancy.resolve(Resolution::FixedReality, resolved_at);
        assert_eq!(discrepancy.resolution, Some(Resolution::FixedReality));
        assert_eq!(discrepancy.resolved_at, Some(resolved_at));
        assert!(!discrepancy.is_open());
    }
}
