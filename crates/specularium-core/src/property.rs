//! Dynamic property bag replacement: a sealed sum type over the property
//! kinds actually produced by adapters (port lists, service banners, MAC
//! addresses, hostname inference, evidence lists, capabilities, ...).
//!
//! Wire formats stay untyped JSON/YAML; this type is the boundary where
//! an adapter's loosely-shaped observation becomes something the
//! reconciler can pattern-match on. Anything that doesn't fit a known
//! shape round-trips through the `Json` variant so no adapter payload is
//! ever rejected at this layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::evidence::Evidence;
use crate::hostname::HostnameInference;

/// One open port discovered on a node, with best-effort service
/// identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    pub port: u16,
    pub service: Option<String>,
    pub banner: Option<String>,
}

/// Operating-system fingerprint, as produced by the nmap adapter's OS
/// detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsInfo {
    pub family: String,
    pub accuracy: u8,
}

/// A property value attached to a node, edge, evidence record, or
/// capability. Variants are tried in order by serde's untagged matching;
/// `Json` is the catch-all so no shape is ever lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Ports(Vec<u16>),
    Services(BTreeMap<u16, PortInfo>),
    OsInfo(OsInfo),
    HostnameInference(HostnameInference),
    Evidence(Vec<Evidence>),
    Capabilities(BTreeMap<String, Capability>),
    List(Vec<PropertyValue>),
    Json(serde_json::Value),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Coercing equality used by truth-checking: strings, numbers and
    /// bools compare across representations so `"80"` and `80.0` are
    /// considered equal when truth and discovered values disagree only
    /// in encoding.
    pub fn loosely_equals(&self, other: &PropertyValue) -> bool {
        if self == other {
            return true;
        }
        let a = self.coercion_key();
        let b = other.coercion_key();
        a.is_some() && a == b
    }

    fn coercion_key(&self) -> Option<String> {
        match self {
            PropertyValue::Text(s) => Some(s.trim().to_lowercase()),
            PropertyValue::Number(n) => Some(format_number(*n)),
            PropertyValue::Bool(b) => Some(b.to_string()),
            PropertyValue::Json(serde_json::Value::String(s)) => Some(s.trim().to_lowercase()),
            PropertyValue::Json(serde_json::Value::Number(n)) => n.as_f64().map(format_number),
            PropertyValue::Json(serde_json::Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Ordered map of property key to value. A `BTreeMap` keeps iteration
/// (and therefore YAML/JSON export) deterministic, which matters for
/// stable round-trips through the codecs.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loosely_equals_coerces_string_and_number() {
        let a = PropertyValue::Text("80".to_string());
        let b = PropertyValue::Number(80.0);
        assert!(a.loosely_equals(&b));
    }

    #[test]
    fn loosely_equals_is_case_insensitive_for_strings() {
        let a = PropertyValue::Text("Host.Local".to_string());
        let b = PropertyValue::Text("host.local".to_string());
        assert!(a.loosely_equals(&b));
    }

    #[test]
    fn loosely_equals_rejects_unrelated_values() {
        let a = PropertyValue::Text("10.0.0.5".to_string());
        let b = PropertyValue::Text("10.0.0.9".to_string());
        assert!(!a.loosely_equals(&b));
    }
}
