//! EvidenceSet: accumulates bootstrap's evidence per key across all
//! phases so synthesis can reason about the whole environment at once
//! instead of each phase's raw output.

use std::collections::BTreeMap;

use specularium_core::evidence::Evidence;
use specularium_core::property::PropertyValue;

#[derive(Debug, Default)]
pub struct EvidenceSet {
    by_key: BTreeMap<String, Vec<Evidence>>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        EvidenceSet::default()
    }

    pub fn record(&mut self, key: impl Into<String>, evidence: Evidence) {
        self.by_key.entry(key.into()).or_default().push(evidence);
    }

    pub fn extend(&mut self, key: impl Into<String>, evidence: Vec<Evidence>) {
        self.by_key.entry(key.into()).or_default().extend(evidence);
    }

    /// The value carried by the single highest-confidence observation
    /// for a key, or `None` if nothing was ever recorded for it.
    pub fn best_value(&self, key: &str) -> Option<&PropertyValue> {
        self.by_key.get(key).and_then(|entries| {
            entries
                .iter()
                .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
                .map(|e| &e.value)
        })
    }

    /// Same diminishing-corroboration formula a capability uses: the
    /// top confidence plus a shrinking contribution from the rest.
    pub fn aggregate_confidence(&self, key: &str) -> f64 {
        let Some(entries) = self.by_key.get(key) else {
            return 0.0;
        };
        if entries.is_empty() {
            return 0.0;
        }
        let max = entries.iter().map(|e| e.confidence).fold(f64::MIN, f64::max);
        let mut used_max = false;
        let mut aggregate = max;
        if max > 0.0 {
            for e in entries {
                if !used_max && e.confidence == max {
                    used_max = true;
                    continue;
                }
                aggregate += (1.0 - max) * 0.05 * (e.confidence / max);
            }
        }
        aggregate.min(1.0)
    }

    /// A flattened `key -> best value` view, for logging or rendering
    /// to an operator without exposing the full evidence trail.
    pub fn summary(&self) -> BTreeMap<String, PropertyValue> {
        self.by_key
            .iter()
            .filter_map(|(key, entries)| {
                entries
                    .iter()
                    .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
                    .map(|e| (key.clone(), e.value.clone()))
            })
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use specularium_core::evidence::EvidenceSource;

    #[test]
    fn best_value_picks_highest_confidence_entry() {
        let mut set = EvidenceSet::new();
        set.record(
            "environment::is_root",
            Evidence::new(
                "environment",
                "is_root",
                PropertyValue::Bool(false),
                EvidenceSource::PortOpen,
                Utc::now(),
            ),
        );
        set.record(
            "environment::is_root",
            Evidence::new(
                "environment",
                "is_root",
                PropertyValue::Bool(true),
                EvidenceSource::OperatorAsserted,
                Utc::now(),
            ),
        );
        assert_eq!(
            set.best_value("environment::is_root"),
            Some(&PropertyValue::Bool(true))
        );
    }

    #[test]
    fn missing_key_has_zero_confidence() {
        let set = EvidenceSet::new();
        assert_eq!(set.aggregate_confidence("nothing::here"), 0.0);
    }
}
