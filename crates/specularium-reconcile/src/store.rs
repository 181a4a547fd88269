//! In-memory durable graph store. A durable on-disk backing store (the
//! spec's excluded SQLite repository) is out of scope; this holds the
//! live graph for the process's lifetime behind a single lock.

use std::collections::BTreeMap;
use std::sync::RwLock;

use specularium_core::edge::Edge;
use specularium_core::node::Node;
use specularium_core::truth::Discrepancy;

#[derive(Default)]
pub struct GraphStore {
    nodes: RwLock<BTreeMap<String, Node>>,
    edges: RwLock<BTreeMap<String, Edge>>,
    /// Discrepancies keyed by node id, each node's list keyed in turn
    /// by property key within the `Vec`. Kept separate from `Node`
    /// itself so a node's `has_discrepancy` bool can be cheap while the
    /// full history (including resolved entries) survives independently.
    discrepancies: RwLock<BTreeMap<String, Vec<Discrepancy>>>,
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore::default()
    }

    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.nodes.read().unwrap().get(id).cloned()
    }

    pub fn upsert_node(&self, node: Node) {
        self.nodes.write().unwrap().insert(node.id.clone(), node);
    }

    pub fn get_edge(&self, id: &str) -> Option<Edge> {
        self.edges.read().unwrap().get(id).cloned()
    }

    pub fn upsert_edge(&self, edge: Edge) {
        self.edges.write().unwrap().insert(edge.id.clone(), edge);
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.read().unwrap().values().cloned().collect()
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.edges.read().unwrap().values().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.read().unwrap().len()
    }

    pub fn discrepancies_for(&self, node_id: &str) -> Vec<Discrepancy> {
        self.discrepancies.read().unwrap().get(node_id).cloned().unwrap_or_default()
    }

    /// Replaces a node's full discrepancy list in one shot; the caller
    /// (reconciliation) owns the upsert/resolve logic and hands back
    /// the complete, already-merged list.
    pub fn set_discrepancies(&self, node_id: &str, discrepancies: Vec<Discrepancy>) {
        if discrepancies.is_empty() {
            self.discrepancies.write().unwrap().remove(node_id);
        } else {
            self.discrepancies.write().unwrap().insert(node_id.to_string(), discrepancies);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn upsert_node_replaces_by_id() {
        let store = GraphStore::new();
        let node = Node::new("n1", "10.0.0.1", Utc::now());
        store.upsert_node(node.clone());
        assert_eq!(store.node_count(), 1);
        store.upsert_node(node);
        assert_eq!(store.node_count(), 1);
    }
}
