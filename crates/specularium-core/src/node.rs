//! Node: one discovered host or device, and the inferred/discovered
//! state attached to it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::hostname::HostnameInference;
use crate::property::{PropertyBag, PropertyValue};
use crate::truth::NodeTruth;

/// Best-effort classification of what a node is, inferred from its open
/// ports and capabilities rather than asserted by any single adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Server,
    Switch,
    Router,
    AccessPoint,
    Vm,
    Vip,
    Container,
    Interface,
    /// The engine's own host. Spelled `self` on the wire; `self` is a
    /// reserved word so the variant itself is named `SelfNode`.
    #[serde(rename = "self")]
    SelfNode,
    Unknown,
}

impl Default for NodeType {
    fn default() -> Self {
        NodeType::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Unverified,
    Verifying,
    Verified,
    Unreachable,
    Degraded,
}

impl Default for NodeStatus {
    fn default() -> Self {
        NodeStatus::Unverified
    }
}

/// One source's contribution to a node's discovered properties, kept
/// separate per source so a later reconciliation can tell whose value
/// is whose instead of only seeing the last writer.
pub type DiscoveredBySource = BTreeMap<String, PropertyBag>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub ip: String,
    #[serde(default)]
    pub hostname: HostnameInference,
    #[serde(default)]
    pub node_type: NodeType,
    #[serde(default)]
    pub status: NodeStatus,
    /// Operator-facing display name, independent of the inferred
    /// hostname.
    #[serde(default)]
    pub label: Option<String>,
    /// Id of the node this one is logically attached to (a VM's host, a
    /// container's node), when known.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Name of the adapter that last wrote to this node.
    #[serde(default)]
    pub source: String,
    /// Union of every source's last-reported value for each discovered
    /// key, keyed by source name then property key.
    #[serde(default)]
    pub discovered: DiscoveredBySource,
    #[serde(default)]
    pub capabilities: BTreeMap<String, Capability>,
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default)]
    pub truth: Option<NodeTruth>,
    /// Mirrors whether this node currently has any open (unresolved)
    /// discrepancy; kept in sync by the reconciler rather than computed
    /// on read, so a store scan doesn't have to touch the discrepancy
    /// list to answer "does this node disagree with truth".
    #[serde(default)]
    pub has_discrepancy: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_verified: Option<DateTime<Utc>>,
    /// Priority of the adapter that most recently won a `properties`
    /// key conflict on this node. In-memory bookkeeping for
    /// reconciliation's source-authority rule; never persisted or
    /// exported.
    #[serde(skip)]
    pub winning_priority: u8,
}

impl Node {
    pub fn new(id: impl Into<String>, ip: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Node {
            id: id.into(),
            ip: ip.into(),
            hostname: HostnameInference::new(),
            node_type: NodeType::default(),
            status: NodeStatus::default(),
            label: None,
            parent_id: None,
            source: String::new(),
            discovered: BTreeMap::new(),
            capabilities: BTreeMap::new(),
            properties: PropertyBag::new(),
            truth: None,
            has_discrepancy: false,
            created_at: observed_at,
            updated_at: observed_at,
            last_verified: None,
            winning_priority: 0,
        }
    }

    /// Records one source's value for a discovered key, overwriting
    /// only that source's prior value (last-writer-wins per
    /// `(source, key)`, not across sources).
    pub fn set_discovered(&mut self, source: &str, key: impl Into<String>, value: PropertyValue) {
        self.discovered
            .entry(source.to_string())
            .or_default()
            .insert(key.into(), value);
    }

    /// Reads the most recently written value for a key across all
    /// sources that have reported it, preferring the source with the
    /// lexicographically last name as a stable (if arbitrary) tiebreak
    /// when several sources report the same key and a caller hasn't
    /// already resolved precedence upstream.
    pub fn discovered_value(&self, key: &str) -> Option<&PropertyValue> {
        self.discovered
            .values()
            .filter_map(|bag| bag.get(key))
            .last()
    }

    pub fn capability(&self, kind: &str) -> Option<&Capability> {
        self.capabilities.get(kind)
    }

    /// Advances `updated_at` and attributes the touch to `source`.
    pub fn touch(&mut self, source: &str, observed_at: DateTime<Utc>) {
        if observed_at > self.updated_at {
            self.updated_at = observed_at;
        }
        self.source = source.to_string();
    }

    /// Sets verification status and, when the node is newly reachable,
    /// stamps `last_verified`. A `verified` node always carries a
    /// non-empty `last_verified`.
    pub fn set_status(&mut self, status: NodeStatus, observed_at: DateTime<Utc>) {
        self.status = status;
        if matches!(status, NodeStatus::Verified | NodeStatus::Degraded) {
            self.last_verified = Some(observed_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_discovered_is_scoped_per_source() {
        let mut node = Node::new("abc123", "10.0.0.5", Utc::now());
        node.set_discovered("scanner", "open_ports", PropertyValue::Ports(vec![22, 80]));
        node.set_discovered("verifier", "open_ports", PropertyValue::Ports(vec![22]));
        assert_eq!(node.discovered.len(), 2);
        assert!(node.discovered["scanner"].contains_key("open_ports"));
        assert!(node.discovered["verifier"].contains_key("open_ports"));
    }

    #[test]
    fn touch_advances_updated_at_but_not_backwards() {
        let t0 = Utc::now();
        let mut node = Node::new("abc123", "10.0.0.5", t0);
        let earlier = t0 - chrono::Duration::seconds(60);
        node.touch("verifier", earlier);
        assert_eq!(node.updated_at, t0);
        assert_eq!(node.source, "verifier");
    }

    #[test]
    fn verified_status_stamps_last_verified() {
        let mut node = Node::new("abc123", "10.0.0.5", Utc::now());
        assert!(node.last_verified.is_none());
        let now = Utc::now();
        node.set_status(NodeStatus::Verified, now);
        assert_eq!(node.last_verified, Some(now));
    }
}
