//! Generic YAML graph: a simplified shape meant for tools outside the
//! engine to consume, dropping evidence trails and raw capability
//! detail down to the properties an external reader would actually
//! want. Exporting also synthesizes a `routes_to` edge from every
//! otherwise-unconnected node to the nearest inferred router or
//! gateway, at a conservative default link speed, since most
//! third-party consumers expect every node to have at least one edge.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use specularium_core::edge::{Edge, EdgeType};
use specularium_core::node::{Node, NodeType};
use specularium_core::property::PropertyValue;

use crate::error::CodecError;
use crate::traits::{Exporter, Importer};

const DEFAULT_LINK_SPEED_MBPS: u32 = 1000;

#[derive(Debug, Serialize, Deserialize)]
struct GenericNode {
    id: String,
    ip: String,
    hostname: Option<String>,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenericEdge {
    #[serde(rename = "type")]
    edge_type: String,
    a: String,
    b: String,
    #[serde(default)]
    properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenericGraph {
    nodes: Vec<GenericNode>,
    edges: Vec<GenericEdge>,
}

pub struct YamlGraphCodec;

impl Importer for YamlGraphCodec {
    fn parse(&self, input: &str) -> Result<specularium_core::fragment::GraphFragment, CodecError> {
        let graph: GenericGraph = serde_yml::from_str(input)?;
        let mut fragment = specularium_core::fragment::GraphFragment::new();
        let now = Utc::now();

        for generic in graph.nodes {
            let mut node = Node::new(generic.id, generic.ip, now);
            node.properties = generic.properties;
            if let Some(hostname) = generic.hostname {
                node.hostname.observe(specularium_core::hostname::HostnameCandidate::new(
                    hostname,
                    specularium_core::hostname::HostnameSource::OperatorTruth,
                    now,
                ));
            }
            fragment = fragment.with_node(node);
        }

        for generic in graph.edges {
            let edge_type = parse_edge_type(&generic.edge_type);
            let mut edge = Edge::new(edge_type, generic.a, generic.b, 1.0, now);
            edge.properties = generic.properties;
            fragment = fragment.with_edge(edge);
        }

        Ok(fragment)
    }
}

impl Exporter for YamlGraphCodec {
    fn export(&self, nodes: &[Node], edges: &[Edge]) -> Result<String, CodecError> {
        let generic_nodes: Vec<GenericNode> = nodes
            .iter()
            .map(|n| GenericNode {
                id: n.id.clone(),
                ip: n.ip.clone(),
                hostname: n.hostname.best_hostname().map(str::to_string),
                node_type: format!("{:?}", n.node_type).to_lowercase(),
                properties: n.properties.clone(),
            })
            .collect();

        let mut generic_edges: Vec<GenericEdge> = edges
            .iter()
            .map(|e| GenericEdge {
                edge_type: format!("{:?}", e.edge_type).to_lowercase(),
                a: e.a.clone(),
                b: e.b.clone(),
                properties: e.properties.clone(),
            })
            .collect();

        generic_edges.extend(synthesize_gateway_edges(nodes, edges));

        let graph = GenericGraph {
            nodes: generic_nodes,
            edges: generic_edges,
        };
        Ok(serde_yml::to_string(&graph)?)
    }
}

fn parse_edge_type(s: &str) -> EdgeType {
    match s {
        "physicallink" | "physical_link" => EdgeType::PhysicalLink,
        "l3adjacency" | "l3_adjacency" => EdgeType::L3Adjacency,
        "hostedon" | "hosted_on" => EdgeType::HostedOn,
        "managedby" | "managed_by" => EdgeType::ManagedBy,
        _ => EdgeType::RoutesTo,
    }
}

/// Every node with no existing edge gets a synthesized `routes_to`
/// edge to the first inferred router found, at
/// [`DEFAULT_LINK_SPEED_MBPS`]. Nothing is synthesized if the graph has
/// no router node at all.
fn synthesize_gateway_edges(nodes: &[Node], edges: &[Edge]) -> Vec<GenericEdge> {
    let Some(gateway) = nodes.iter().find(|n| n.node_type == NodeType::Router) else {
        return Vec::new();
    };

    let connected: std::collections::HashSet<&str> = edges
        .iter()
        .flat_map(|e| [e.a.as_str(), e.b.as_str()])
        .collect();

    nodes
        .iter()
        .filter(|n| n.id != gateway.id && !connected.contains(n.id.as_str()))
        .map(|n| {
            let mut properties = BTreeMap::new();
            properties.insert(
                "link_speed_mbps".to_string(),
                PropertyValue::Number(DEFAULT_LINK_SPEED_MBPS as f64),
            );
            GenericEdge {
                edge_type: "routes_to".to_string(),
                a: n.id.clone(),
                b: gateway.id.clone(),
                properties,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_gateway_edge_for_unconnected_node() {
        let now = Utc::now();
        let mut router = Node::new("r1", "10.0.0.1", now);
        router.node_type = NodeType::Router;
        let host = Node::new("h1", "10.0.0.50", now);

        let synthesized = synthesize_gateway_edges(&[router, host], &[]);
        assert_eq!(synthesized.len(), 1);
        assert_eq!(synthesized[0].b, "r1");
    }

    #[test]
    fn no_gateway_means_nothing_synthesized() {
        let now = Utc::now();
        let host = Node::new("h1", "10.0.0.50", now);
        let synthesized = synthesize_gateway_edges(&[host], &[]);
        assert!(synthesized.is_empty());
    }
}
