//! Canonical JSON codec: a direct, lossless serialization of the graph
//! domain types. This is the format the engine reads and writes for
//! its own snapshots.

use specularium_core::edge::Edge;
use specularium_core::fragment::GraphFragment;
use specularium_core::node::Node;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::traits::{Exporter, Importer};

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

pub struct JsonCodec;

impl Importer for JsonCodec {
    fn parse(&self, input: &str) -> Result<GraphFragment, CodecError> {
        let doc: JsonDocument = serde_json::from_str(input)?;
        let mut fragment = GraphFragment::new();
        for node in doc.nodes {
            fragment = fragment.with_node(node);
        }
        for edge in doc.edges {
            fragment = fragment.with_edge(edge);
        }
        Ok(fragment)
    }
}

impl Exporter for JsonCodec {
    fn export(&self, nodes: &[Node], edges: &[Edge]) -> Result<String, CodecError> {
        let doc = JsonDocument {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn round_trips_a_single_node() {
        let codec = JsonCodec;
        let node = Node::new("n1", "10.0.0.1", Utc::now());
        let exported = codec.export(&[node], &[]).unwrap();
        let fragment = codec.parse(&exported).unwrap();
        assert_eq!(fragment.nodes.len(), 1);
        assert_eq!(fragment.nodes[0].id, "n1");
    }
}
