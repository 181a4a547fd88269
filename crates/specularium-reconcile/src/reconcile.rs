//! Reconciliation: folds one source's fragment into the graph store.
//! A fragment never replaces a node outright; it contributes to the
//! node's per-source discovered state, its capabilities, its hostname
//! candidates, and (if the node carries operator truth) its
//! discrepancies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use specularium_core::edge::Edge;
use specularium_core::fragment::GraphFragment;
use specularium_core::node::{Node, NodeType};
use specularium_core::property::PropertyValue;
use specularium_core::truth::{check_truth, Discrepancy, NodeTruth, TruthableKey};

use crate::store::GraphStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub nodes_touched: usize,
    pub edges_touched: usize,
    pub discrepancies_raised: usize,
}

/// Applies `fragment`, attributed to `source` at the given adapter
/// `priority`, to `store`. A fragment with no nodes and no edges is a
/// no-op and returns a zeroed outcome without taking any lock.
///
/// `priority` governs which source wins when two adapters report
/// different values for the same discovered property key: the
/// higher-priority source wins, and a tie is broken by whichever
/// observation is newer.
pub fn reconcile(
    store: &GraphStore,
    source: &str,
    priority: u8,
    fragment: GraphFragment,
    observed_at: DateTime<Utc>,
) -> ReconcileOutcome {
    if fragment.is_empty() {
        return ReconcileOutcome::default();
    }

    let mut outcome = ReconcileOutcome::default();

    for incoming in fragment.nodes {
        let node = match store.get_node(&incoming.id) {
            Some(mut existing) => {
                merge_node(&mut existing, incoming, source, priority, observed_at);
                existing
            }
            None => {
                let mut node = incoming;
                node.created_at = observed_at;
                node.updated_at = observed_at;
                node.source = source.to_string();
                node.winning_priority = priority;
                seed_discovered(&mut node, source);
                node
            }
        };
        let discrepancies = check_and_apply_truth(store, &mut node, source, observed_at);
        outcome.discrepancies_raised += discrepancies;
        store.upsert_node(node);
        outcome.nodes_touched += 1;
    }

    for edge in fragment.edges {
        if store.get_node(&edge.a).is_none() || store.get_node(&edge.b).is_none() {
            warn!(edge = %edge.id, "dropping edge with a dangling endpoint");
            continue;
        }
        merge_edge(store, edge, observed_at);
        outcome.edges_touched += 1;
    }

    outcome
}

/// A brand-new node still needs its own reported properties folded
/// into `discovered` under `source`, the same as a merge would do.
fn seed_discovered(node: &mut Node, source: &str) {
    let keys: Vec<(String, PropertyValue)> = node
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in keys {
        node.set_discovered(source, key, value);
    }
}

/// Property-key conflict resolution: the incoming value wins when no
/// prior writer held that key, when `incoming_priority` strictly
/// outranks the node's current effective priority, or on a tie (same
/// priority, later observation always supersedes).
fn merge_node(node: &mut Node, incoming: Node, source: &str, incoming_priority: u8, observed_at: DateTime<Utc>) {
    let incoming_wins = incoming_priority >= node.winning_priority;

    for candidate in incoming.hostname.candidates {
        node.hostname.observe(candidate);
    }

    for (kind, capability) in incoming.capabilities {
        match node.capabilities.get_mut(&kind) {
            Some(existing) => {
                for evidence in capability.evidence {
                    existing.add_evidence(evidence);
                }
            }
            None => {
                node.capabilities.insert(kind, capability);
            }
        }
    }

    for (key, value) in incoming.properties {
        node.set_discovered(source, key.clone(), value.clone());
        if incoming_wins || !node.properties.contains_key(&key) {
            node.properties.insert(key, value);
        }
    }
    if incoming_wins {
        node.winning_priority = incoming_priority;
    }

    if node.node_type == NodeType::Unknown && incoming.node_type != NodeType::Unknown {
        node.node_type = incoming.node_type;
    }

    if incoming.status != specularium_core::node::NodeStatus::Unverified {
        node.status = incoming.status;
    }
    if incoming.last_verified.is_some() {
        node.last_verified = incoming.last_verified;
    }
    if incoming.label.is_some() {
        node.label = incoming.label;
    }
    if incoming.parent_id.is_some() {
        node.parent_id = incoming.parent_id;
    }

    if node.truth.is_none() && incoming.truth.is_some() {
        node.truth = incoming.truth;
    }

    node.touch(source, observed_at);
    debug!(node = %node.id, source, incoming_priority, "merged fragment into node");
}

fn merge_edge(store: &GraphStore, incoming: Edge, observed_at: DateTime<Utc>) {
    let edge = match store.get_edge(&incoming.id) {
        Some(mut existing) => {
            existing.touch(observed_at);
            existing.confidence = existing.confidence.max(incoming.confidence);
            for (key, value) in incoming.properties {
                existing.properties.insert(key, value);
            }
            existing
        }
        None => {
            let mut edge = incoming;
            edge.first_seen = observed_at;
            edge.last_seen = observed_at;
            edge
        }
    };
    store.upsert_edge(edge);
}

fn truthable_key_name(key: TruthableKey) -> &'static str {
    match key {
        TruthableKey::Existence => "existence",
        TruthableKey::Ip => "ip",
        TruthableKey::Hostname => "hostname",
        TruthableKey::MacAddress => "mac_address",
        TruthableKey::Type => "type",
        TruthableKey::Description => "description",
        TruthableKey::Location => "location",
        TruthableKey::Owner => "owner",
        TruthableKey::ExpectedPorts => "expected_ports",
    }
}

fn discovered_view(node: &Node) -> BTreeMap<TruthableKey, PropertyValue> {
    let mut view = BTreeMap::new();
    view.insert(TruthableKey::Existence, PropertyValue::Bool(true));
    view.insert(TruthableKey::Ip, PropertyValue::Text(node.ip.clone()));
    if let Some(hostname) = node.hostname.best_hostname() {
        view.insert(TruthableKey::Hostname, PropertyValue::Text(hostname.to_string()));
    }
    for key in TruthableKey::ALL {
        if key == TruthableKey::Existence || key == TruthableKey::Ip || key == TruthableKey::Hostname {
            continue;
        }
        if let Some(value) = node.discovered_value(truthable_key_name(key)) {
            view.insert(key, value.clone());
        }
    }
    view
}

/// Recomputes discrepancies for a node that carries operator truth,
/// upserting against the store's existing discrepancy list for this
/// node: a key that stops disagreeing gets resolved instead of
/// deleted, preserving its history. Keeps `node.has_discrepancy` in
/// sync and returns the number of discrepancies left open.
fn check_and_apply_truth(store: &GraphStore, node: &mut Node, source: &str, observed_at: DateTime<Utc>) -> usize {
    let mut existing = store.discrepancies_for(&node.id);

    let Some(truth) = node.truth.clone() else {
        node.has_discrepancy = existing.iter().any(Discrepancy::is_open);
        return existing.iter().filter(|d| d.is_open()).count();
    };
    if truth.properties.is_empty() {
        node.has_discrepancy = existing.iter().any(Discrepancy::is_open);
        return existing.iter().filter(|d| d.is_open()).count();
    }

    let discovered = discovered_view(node);
    let computed = check_truth(&node.id, &truth, |key| discovered.get(&key), source, observed_at);
    let computed_keys: Vec<TruthableKey> = computed.iter().map(|d| d.property_key).collect();

    for discrepancy in computed {
        match existing.iter_mut().find(|d| d.property_key == discrepancy.property_key) {
            Some(found) => found.touch(discrepancy.actual_value, source, observed_at),
            None => existing.push(discrepancy),
        }
    }

    for open in existing.iter_mut() {
        if !computed_keys.contains(&open.property_key) && open.is_open() {
            open.resolve(specularium_core::truth::Resolution::FixedReality, observed_at);
        }
    }

    let open_count = existing.iter().filter(|d| d.is_open()).count();
    node.has_discrepancy = open_count > 0;
    store.set_discrepancies(&node.id, existing);
    open_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use specularium_core::evidence::{Evidence, EvidenceSource};
    use specularium_core::hostname::{HostnameCandidate, HostnameSource};

    fn fragment_with_node(id: &str, ip: &str, key: &str, value: PropertyValue) -> GraphFragment {
        let mut node = Node::new(id, ip, Utc::now());
        node.properties.insert(key.to_string(), value);
        GraphFragment::new().with_node(node)
    }

    #[test]
    fn empty_fragment_is_a_no_op() {
        let store = GraphStore::new();
        let outcome = reconcile(&store, "scanner", 50, GraphFragment::new(), Utc::now());
        assert_eq!(outcome, ReconcileOutcome::default());
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn new_node_is_inserted_with_discovered_state() {
        let store = GraphStore::new();
        let fragment = fragment_with_node("n1", "10.0.0.1", "open_ports", PropertyValue::Ports(vec![22]));
        reconcile(&store, "scanner", 50, fragment, Utc::now());

        let node = store.get_node("n1").unwrap();
        assert!(node.discovered["scanner"].contains_key("open_ports"));
    }

    #[test]
    fn reconciling_twice_is_idempotent_on_node_count() {
        let store = GraphStore::new();
        let fragment = fragment_with_node("n1", "10.0.0.1", "open_ports", PropertyValue::Ports(vec![22]));
        reconcile(&store, "scanner", 50, fragment.clone(), Utc::now());
        reconcile(&store, "scanner", 50, fragment, Utc::now());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn second_source_does_not_clobber_first_sources_key() {
        let store = GraphStore::new();
        let first = fragment_with_node("n1", "10.0.0.1", "open_ports", PropertyValue::Ports(vec![22]));
        reconcile(&store, "scanner", 50, first, Utc::now());

        let second = fragment_with_node("n1", "10.0.0.1", "open_ports", PropertyValue::Ports(vec![22, 3389]));
        reconcile(&store, "verifier", 50, second, Utc::now());

        let node = store.get_node("n1").unwrap();
        assert!(node.discovered.contains_key("scanner"));
        assert!(node.discovered.contains_key("verifier"));
    }

    #[test]
    fn higher_priority_source_wins_a_property_conflict() {
        let store = GraphStore::new();
        let low = fragment_with_node("n1", "10.0.0.1", "open_ports", PropertyValue::Ports(vec![22]));
        reconcile(&store, "nmap", 30, low, Utc::now());

        let high = fragment_with_node("n1", "10.0.0.1", "open_ports", PropertyValue::Ports(vec![22, 443]));
        reconcile(&store, "subnet_scanner", 100, high, Utc::now());

        let node = store.get_node("n1").unwrap();
        assert_eq!(node.properties["open_ports"], PropertyValue::Ports(vec![22, 443]));

        let later_low = fragment_with_node("n1", "10.0.0.1", "open_ports", PropertyValue::Ports(vec![22]));
        reconcile(&store, "nmap", 30, later_low, Utc::now());
        let node = store.get_node("n1").unwrap();
        assert_eq!(node.properties["open_ports"], PropertyValue::Ports(vec![22, 443]));
    }

    #[test]
    fn capability_evidence_accumulates_across_fragments() {
        let store = GraphStore::new();
        let mut node = Node::new("n1", "10.0.0.1", Utc::now());
        let mut capability = specularium_core::capability::Capability::new("ssh");
        capability.add_evidence(Evidence::new(
            "capability",
            "ssh",
            PropertyValue::Bool(true),
            EvidenceSource::PortOpen,
            Utc::now(),
        ));
        node.capabilities.insert("ssh".to_string(), capability);
        reconcile(&store, "scanner", 50, GraphFragment::new().with_node(node), Utc::now());

        let mut node2 = Node::new("n1", "10.0.0.1", Utc::now());
        let mut capability2 = specularium_core::capability::Capability::new("ssh");
        capability2.add_evidence(Evidence::new(
            "capability",
            "ssh",
            PropertyValue::Bool(true),
            EvidenceSource::CredentialedShellProbe,
            Utc::now(),
        ));
        node2.capabilities.insert("ssh".to_string(), capability2);
        reconcile(&store, "ssh_probe", 50, GraphFragment::new().with_node(node2), Utc::now());

        let merged = store.get_node("n1").unwrap();
        assert_eq!(merged.capabilities["ssh"].evidence.len(), 2);
    }

    #[test]
    fn hostname_discrepancy_is_raised_then_resolved() {
        let store = GraphStore::new();
        let mut node = Node::new("n1", "10.0.0.1", Utc::now());
        let mut truth = NodeTruth::new("operator", Utc::now());
        truth.assert(TruthableKey::Hostname, PropertyValue::Text("db1".into()));
        node.truth = Some(truth);
        node.hostname.observe(HostnameCandidate::new("wrong-name", HostnameSource::ReverseDns, Utc::now()));
        reconcile(&store, "verifier", 50, GraphFragment::new().with_node(node), Utc::now());

        let after_mismatch = store.get_node("n1").unwrap();
        assert!(after_mismatch.has_discrepancy);
        let discrepancies = store.discrepancies_for("n1");
        assert_eq!(discrepancies.len(), 1);
        assert!(discrepancies[0].is_open());

        let mut corrected = after_mismatch.clone();
        corrected.hostname.observe(HostnameCandidate::new("db1", HostnameSource::ShellProbe, Utc::now()));
        reconcile(&store, "ssh_probe", 50, GraphFragment::new().with_node(corrected), Utc::now());

        let resolved = store.get_node("n1").unwrap();
        assert!(!resolved.has_discrepancy);
        let discrepancies = store.discrepancies_for("n1");
        assert!(!discrepancies[0].is_open());
    }
}
