//! Subnet scanner: a one-shot adapter that expands configured CIDR
//! blocks and discovers which hosts are alive. Runs at the highest
//! priority since every other adapter needs the nodes this one finds.
//!
//! Each host goes through two phases: a reachability check against the
//! configured discovery ports, then (for hosts that answer) a service
//! scan that names what's listening on each open port and grabs a
//! best-effort banner.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use specularium_adapter::adapter::{Adapter, AdapterKind};
use specularium_adapter::error::AdapterError;
use specularium_adapter::event::{AdapterEvent, EventBus};
use specularium_config::PostureProfile;
use specularium_core::evidence::{Evidence, EvidenceSource};
use specularium_core::fragment::GraphFragment;
use specularium_core::node::{Node, NodeStatus};
use specularium_core::property::{PortInfo, PropertyValue};

use crate::cidr::expand_ipv4_cidr;
use crate::node_type::infer_node_type;

pub struct SubnetScannerAdapter {
    subnets: Vec<String>,
    discovery_ports: Vec<u16>,
    behavior: PostureProfile,
    events: EventBus,
}

impl SubnetScannerAdapter {
    pub fn new(subnets: Vec<String>, discovery_ports: Vec<u16>, behavior: PostureProfile, events: EventBus) -> Self {
        SubnetScannerAdapter {
            subnets,
            discovery_ports,
            behavior,
            events,
        }
    }

    /// A node id derived from the IP itself rather than a hash of it, so
    /// an operator can eyeball a graph export and tell which host is
    /// which without a lookup table.
    fn node_id(ip: Ipv4Addr) -> String {
        ip.to_string().replace('.', "-")
    }

    /// Per-host spacing before a probe starts: the profile's base
    /// interval randomized by its jitter fraction, so a stealth sweep
    /// doesn't produce the perfectly periodic timing an IDS keys on.
    fn throttle_delay(&self) -> Duration {
        let base = self.behavior.per_host_min_interval_ms;
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = self.behavior.jitter_pct.clamp(0.0, 1.0);
        let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
        Duration::from_millis((base as f64 * factor).max(0.0) as u64)
    }

    /// Phase one: is anything listening on any of the discovery ports.
    async fn reachable_ports(&self, ip: Ipv4Addr) -> Vec<u16> {
        let timeout_duration = Duration::from_secs(self.behavior.timeout_secs.max(1));
        let mut open = Vec::new();
        for &port in &self.discovery_ports {
            if timeout(timeout_duration, TcpStream::connect((ip, port))).await.is_ok_and(|r| r.is_ok()) {
                open.push(port);
            }
        }
        open
    }

    /// Phase two: names the service on each open port and, for the ones
    /// worth it, grabs a best-effort banner. Never fails the sweep over
    /// one host's refused banner read.
    async fn fingerprint_services(&self, ip: Ipv4Addr, open_ports: &[u16]) -> BTreeMap<u16, PortInfo> {
        let timeout_duration = Duration::from_secs(self.behavior.timeout_secs.max(1));
        let mut services = BTreeMap::new();
        for &port in open_ports {
            let banner = self.grab_banner(ip, port, timeout_duration).await;
            services.insert(
                port,
                PortInfo {
                    port,
                    service: well_known_service(port).map(str::to_string),
                    banner,
                },
            );
        }
        services
    }

    async fn grab_banner(&self, ip: Ipv4Addr, port: u16, timeout_duration: Duration) -> Option<String> {
        let mut stream = timeout(timeout_duration, TcpStream::connect((ip, port))).await.ok()?.ok()?;

        if matches!(port, 80 | 8080) {
            timeout(timeout_duration, stream.write_all(b"HEAD / HTTP/1.0\r\n\r\n")).await.ok()?.ok()?;
        }

        let mut buf = [0u8; 256];
        let n = timeout(timeout_duration, stream.read(&mut buf)).await.ok()?.ok()?;
        if n == 0 {
            return None;
        }
        String::from_utf8_lossy(&buf[..n]).lines().next().map(|line| line.trim().to_string())
    }

    async fn probe_host(&self, ip: Ipv4Addr) -> Option<Node> {
        tokio::time::sleep(self.throttle_delay()).await;

        let open_ports = self.reachable_ports(ip).await;
        if open_ports.is_empty() {
            self.events.emit(AdapterEvent::DiscoveryProgress {
                adapter: self.name().to_string(),
                phase: "reachability".to_string(),
                node_id: None,
                ip: Some(ip.to_string()),
                ports: None,
                services: None,
                mac: None,
                hostname: None,
                latency: None,
                error: Some("no discovery port responded".to_string()),
            });
            return None;
        }

        let services = self.fingerprint_services(ip, &open_ports).await;

        let now = Utc::now();
        let mut node = Node::new(Self::node_id(ip), ip.to_string(), now);
        node.node_type = infer_node_type(&open_ports);
        node.set_status(NodeStatus::Verified, now);
        node.properties
            .insert("open_ports".to_string(), PropertyValue::Ports(open_ports.clone()));
        node.properties
            .insert("services".to_string(), PropertyValue::Services(services.clone()));

        let evidence = Evidence::new(
            "network",
            "open_ports",
            PropertyValue::Ports(open_ports.clone()),
            EvidenceSource::PortOpen,
            now,
        );
        let mut capability = specularium_core::capability::Capability::new("reachable");
        capability.add_evidence(evidence);
        node.capabilities.insert("reachable".to_string(), capability);

        self.events.emit(AdapterEvent::DiscoveryProgress {
            adapter: self.name().to_string(),
            phase: "service_scan".to_string(),
            node_id: Some(node.id.clone()),
            ip: Some(ip.to_string()),
            ports: Some(open_ports),
            services: Some(services),
            mac: None,
            hostname: None,
            latency: None,
            error: None,
        });

        Some(node)
    }
}

fn well_known_service(port: u16) -> Option<&'static str> {
    match port {
        22 => Some("ssh"),
        53 => Some("dns"),
        80 => Some("http"),
        161 => Some("snmp"),
        443 => Some("https"),
        445 => Some("smb"),
        3389 => Some("rdp"),
        5900 => Some("vnc"),
        6443 => Some("kubernetes-api"),
        8080 => Some("http-alt"),
        9100 => Some("printer"),
        10250 => Some("kubelet"),
        _ => None,
    }
}

#[async_trait]
impl Adapter for SubnetScannerAdapter {
    fn name(&self) -> &str {
        "subnet_scanner"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Oneshot
    }

    fn priority(&self) -> u8 {
        100
    }

    async fn sync(&self) -> Result<GraphFragment, AdapterError> {
        let mut targets = Vec::new();
        for subnet in &self.subnets {
            let hosts = expand_ipv4_cidr(subnet)
                .map_err(|e| AdapterError::SyncFailed("subnet_scanner".to_string(), e.to_string()))?;
            targets.extend(hosts);
        }

        self.events.emit(AdapterEvent::DiscoveryStarted {
            adapter: self.name().to_string(),
            phase: "reachability".to_string(),
            total: targets.len(),
            message: format!("sweeping {} subnet(s)", self.subnets.len()),
        });

        let concurrency = self.behavior.max_concurrent_scans.max(1) as usize;
        let total = targets.len();
        let nodes: Vec<Node> = stream::iter(targets)
            .map(|ip| self.probe_host(ip))
            .buffer_unordered(concurrency)
            .filter_map(|node| async { node })
            .collect()
            .await;

        self.events.emit(AdapterEvent::DiscoveryComplete {
            adapter: self.name().to_string(),
            total,
            discovered: nodes.len(),
            verified: nodes.len(),
            unreachable: total.saturating_sub(nodes.len()),
            degraded: 0,
            message: format!("{} of {} hosts responded", nodes.len(), total),
        });

        let mut fragment = GraphFragment::new();
        for node in nodes {
            fragment = fragment.with_node(node);
        }
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_ports() -> Vec<u16> {
        vec![22, 80, 443]
    }

    #[test]
    fn node_id_is_stable_for_the_same_ip() {
        let a = SubnetScannerAdapter::node_id(Ipv4Addr::new(10, 0, 0, 1));
        let b = SubnetScannerAdapter::node_id(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn node_id_is_the_sanitized_ip() {
        assert_eq!(SubnetScannerAdapter::node_id(Ipv4Addr::new(192, 168, 1, 1)), "192-168-1-1");
    }

    #[test]
    fn throttle_delay_stays_within_jittered_bounds() {
        let adapter = SubnetScannerAdapter::new(
            Vec::new(),
            default_ports(),
            specularium_config::Posture::Stealth.profile(),
            EventBus::new(),
        );
        let profile = specularium_config::Posture::Stealth.profile();
        let bound = (profile.per_host_min_interval_ms as f64 * (1.0 + profile.jitter_pct)) as u128;
        for _ in 0..50 {
            let delay = adapter.throttle_delay();
            assert!(delay.as_millis() <= bound);
        }
    }

    #[test]
    fn throttle_delay_is_zero_when_unthrottled() {
        let adapter = SubnetScannerAdapter::new(
            Vec::new(),
            default_ports(),
            specularium_config::Posture::Aggressive.profile(),
            EventBus::new(),
        );
        assert_eq!(adapter.throttle_delay(), Duration::ZERO);
    }

    #[test]
    fn well_known_ports_resolve_to_service_names() {
        assert_eq!(well_known_service(22), Some("ssh"));
        assert_eq!(well_known_service(80), Some("http"));
        assert_eq!(well_known_service(54321), None);
    }

    #[tokio::test]
    async fn empty_subnet_list_produces_an_empty_fragment() {
        let adapter = SubnetScannerAdapter::new(
            Vec::new(),
            default_ports(),
            specularium_config::Posture::Balanced.profile(),
            EventBus::new(),
        );
        let fragment = adapter.sync().await.unwrap();
        assert!(fragment.is_empty());
    }
}
