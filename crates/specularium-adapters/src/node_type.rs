//! Node type inference: an exact, ordered predicate chain over a
//! node's open ports. The order is load-bearing — a host with both
//! DNS and a web UI should classify as a router before the generic
//! "has a web port" rule ever gets a chance to fire, so rules are
//! evaluated top to bottom and the first match wins.

use specularium_core::node::NodeType;

fn has(open_ports: &[u16], port: u16) -> bool {
    open_ports.contains(&port)
}

fn has_any(open_ports: &[u16], ports: &[u16]) -> bool {
    ports.iter().any(|p| open_ports.contains(p))
}

/// First matching rule wins; [`NodeType::Unknown`] if nothing matches.
/// Implementations must preserve this exact order.
pub fn infer_node_type(open_ports: &[u16]) -> NodeType {
    if has(open_ports, 53) && has_any(open_ports, &[80, 443]) {
        return NodeType::Router;
    }
    if has_any(open_ports, &[6443, 10250]) {
        return NodeType::Server;
    }
    if has_any(open_ports, &[3389, 445]) {
        return NodeType::Server;
    }
    if has(open_ports, 22) && has_any(open_ports, &[80, 443]) {
        return NodeType::Server;
    }
    if has(open_ports, 161) || (has(open_ports, 80) && !has(open_ports, 22) && !has(open_ports, 443)) {
        return NodeType::Switch;
    }
    if has(open_ports, 5900) {
        return NodeType::Vm;
    }
    if has(open_ports, 22) {
        return NodeType::Server;
    }
    if has_any(open_ports, &[80, 443, 8080]) {
        return NodeType::Server;
    }
    NodeType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_with_web_is_router() {
        assert_eq!(infer_node_type(&[53, 80]), NodeType::Router);
    }

    #[test]
    fn kubernetes_ports_are_server() {
        assert_eq!(infer_node_type(&[6443]), NodeType::Server);
        assert_eq!(infer_node_type(&[10250]), NodeType::Server);
    }

    #[test]
    fn rdp_and_smb_are_server() {
        assert_eq!(infer_node_type(&[3389]), NodeType::Server);
        assert_eq!(infer_node_type(&[445]), NodeType::Server);
    }

    #[test]
    fn ssh_with_web_is_server() {
        assert_eq!(infer_node_type(&[22, 443]), NodeType::Server);
    }

    #[test]
    fn snmp_port_implies_switch() {
        assert_eq!(infer_node_type(&[161]), NodeType::Switch);
    }

    #[test]
    fn bare_web_port_without_ssh_is_switch() {
        assert_eq!(infer_node_type(&[80]), NodeType::Switch);
    }

    #[test]
    fn vnc_port_is_vm() {
        assert_eq!(infer_node_type(&[5900]), NodeType::Vm);
    }

    #[test]
    fn bare_ssh_is_server() {
        assert_eq!(infer_node_type(&[22]), NodeType::Server);
    }

    #[test]
    fn web_alt_port_alone_is_server() {
        assert_eq!(infer_node_type(&[8080]), NodeType::Server);
    }

    #[test]
    fn no_known_ports_is_unknown() {
        assert_eq!(infer_node_type(&[54321]), NodeType::Unknown);
    }
}
