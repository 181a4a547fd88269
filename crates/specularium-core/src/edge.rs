//! Edge: a relationship between two nodes. Ids are derived from the
//! unordered endpoint pair plus edge type so the same physical link
//! reported twice (in either direction, by any source) reconciles onto
//! one record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::property::PropertyBag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    PhysicalLink,
    L3Adjacency,
    RoutesTo,
    HostedOn,
    ManagedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub edge_type: EdgeType,
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub properties: PropertyBag,
    pub confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Edge {
    pub fn new(
        edge_type: EdgeType,
        a: impl Into<String>,
        b: impl Into<String>,
        confidence: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let a = a.into();
        let b = b.into();
        let id = Self::deterministic_id(edge_type, &a, &b);
        Edge {
            id,
            edge_type,
            a,
            b,
            properties: PropertyBag::new(),
            confidence: confidence.clamp(0.0, 1.0),
            first_seen: observed_at,
            last_seen: observed_at,
        }
    }

    /// Id over the edge type and the endpoint pair sorted so that
    /// direction of report doesn't matter: `(a, b)` and `(b, a)` yield
    /// the same id.
    pub fn deterministic_id(edge_type: EdgeType, a: &str, b: &str) -> String {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", edge_type).as_bytes());
        hasher.update([0u8]);
        hasher.update(lo.as_bytes());
        hasher.update([0u8]);
        hasher.update(hi.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }

    pub fn touch(&mut self, observed_at: DateTime<Utc>) {
        if observed_at > self.last_seen {
            self.last_seen = observed_at;
        }
    }

    pub fn involves(&self, node_id: &str) -> bool {
        self.a == node_id || self.b == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_direction_independent() {
        let forward = Edge::deterministic_id(EdgeType::PhysicalLink, "node-a", "node-b");
        let backward = Edge::deterministic_id(EdgeType::PhysicalLink, "node-b", "node-a");
        assert_eq!(forward, backward);
    }

    #[test]
    fn id_varies_by_edge_type() {
        let link = Edge::deterministic_id(EdgeType::PhysicalLink, "a", "b");
        let routes = Edge::deterministic_id(EdgeType::RoutesTo, "a", "b");
        assert_ne!(link, routes);
    }

    #[test]
    fn involves_checks_either_endpoint() {
        let edge = Edge::new(EdgeType::L3Adjacency, "a", "b", 0.8, Utc::now());
        assert!(edge.involves("a"));
        assert!(edge.involves("b"));
        assert!(!edge.involves("c"));
    }
}
