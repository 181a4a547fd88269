//! GraphFragment: the unit of work an adapter hands to the reconciler.
//! A fragment is a partial, source-scoped view of the graph; it never
//! carries enough context to be the whole truth, only one source's
//! contribution to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::node::Node;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFragment {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl GraphFragment {
    pub fn new() -> Self {
        GraphFragment::default()
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fragment_reports_empty() {
        assert!(GraphFragment::new().is_empty());
    }

    #[test]
    fn fragment_with_a_node_is_not_empty() {
        let node = Node::new("abc", "10.0.0.1", Utc::now());
        let fragment = GraphFragment::new().with_node(node);
        assert!(!fragment.is_empty());
    }
}
