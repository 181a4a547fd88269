//! Ansible inventory export/import: INI-style host groups, one group
//! per inferred node type, with `ansible_host` set from the node's IP
//! and `ansible_ssh_host_key_hostname` style vars omitted since this
//! format only carries what Ansible itself needs to target a host.
//!
//! Import is deliberately narrow: it recognizes `[group]` headers and
//! `name ansible_host=<ip>` lines and ignores anything else (group
//! vars sections, `:children`/`:vars` suffixes), since the inventory
//! format is meant as an export target first and an import source only
//! for inventories this codec itself produced.

use chrono::Utc;
use specularium_core::edge::Edge;
use specularium_core::fragment::GraphFragment;
use specularium_core::node::{Node, NodeType};

use crate::error::CodecError;
use crate::traits::{Exporter, Importer};

pub struct AnsibleInventoryCodec;

fn group_name(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Router => "routers",
        NodeType::Switch => "switches",
        NodeType::AccessPoint => "access_points",
        NodeType::Vm => "vms",
        NodeType::Vip => "vips",
        NodeType::Container => "containers",
        NodeType::Interface => "interfaces",
        NodeType::SelfNode => "self",
        NodeType::Server => "servers",
        NodeType::Unknown => "ungrouped",
    }
}

impl Exporter for AnsibleInventoryCodec {
    fn export(&self, nodes: &[Node], _edges: &[Edge]) -> Result<String, CodecError> {
        let mut groups: std::collections::BTreeMap<&str, Vec<&Node>> = std::collections::BTreeMap::new();
        for node in nodes {
            groups.entry(group_name(node.node_type)).or_default().push(node);
        }

        let mut out = String::new();
        for (group, members) in groups {
            out.push_str(&format!("[{group}]\n"));
            for node in members {
                let host_alias = node.hostname.best_hostname().unwrap_or(node.id.as_str());
                out.push_str(&format!("{host_alias} ansible_host={}\n", node.ip));
            }
            out.push('\n');
        }
        Ok(out)
    }
}

impl Importer for AnsibleInventoryCodec {
    fn parse(&self, input: &str) -> Result<GraphFragment, CodecError> {
        let mut fragment = GraphFragment::new();
        let now = Utc::now();

        for (line_no, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(alias) = parts.next() else { continue };
            let Some(host_var) = parts.find_map(|token| token.strip_prefix("ansible_host=")) else {
                return Err(CodecError::Inventory {
                    line: line_no + 1,
                    reason: format!("host entry '{alias}' is missing ansible_host="),
                });
            };
            fragment = fragment.with_node(Node::new(alias, host_var, now));
        }

        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_one_group_per_node_type() {
        let now = Utc::now();
        let mut router = Node::new("r1", "10.0.0.1", now);
        router.node_type = NodeType::Router;
        let mut vm = Node::new("w1", "10.0.0.50", now);
        vm.node_type = NodeType::Vm;

        let codec = AnsibleInventoryCodec;
        let output = codec.export(&[router, vm], &[]).unwrap();
        assert!(output.contains("[routers]"));
        assert!(output.contains("[vms]"));
        assert!(output.contains("ansible_host=10.0.0.1"));
    }

    #[test]
    fn import_parses_alias_and_host() {
        let codec = AnsibleInventoryCodec;
        let input = "[workstations]\ndesk1 ansible_host=10.0.0.50\n";
        let fragment = codec.parse(input).unwrap();
        assert_eq!(fragment.nodes.len(), 1);
        assert_eq!(fragment.nodes[0].ip, "10.0.0.50");
    }

    #[test]
    fn import_rejects_missing_ansible_host() {
        let codec = AnsibleInventoryCodec;
        let input = "[workstations]\ndesk1\n";
        assert!(codec.parse(input).is_err());
    }
}
