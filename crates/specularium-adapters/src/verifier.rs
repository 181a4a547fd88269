//! Verifier: re-confirms nodes the subnet scanner already found, rather
//! than introducing new nodes of its own. Reachability comes from an
//! ICMP ping (shelling out to the system `ping`, the same pattern the
//! nmap and ssh_probe adapters use for tools this workspace carries no
//! native implementation of), port state from a direct reconnect,
//! identity from reverse DNS and a banner scan, and physical address
//! from the kernel's ARP table.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;

use specularium_adapter::adapter::{Adapter, AdapterKind};
use specularium_adapter::error::AdapterError;
use specularium_config::PostureProfile;
use specularium_core::evidence::{Evidence, EvidenceSource};
use specularium_core::fragment::GraphFragment;
use specularium_core::hostname::{HostnameCandidate, HostnameSource};
use specularium_core::node::{Node, NodeStatus};
use specularium_core::property::PropertyValue;
use specularium_reconcile::GraphStore;

pub struct VerifierAdapter {
    store: Arc<GraphStore>,
    behavior: PostureProfile,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl VerifierAdapter {
    pub fn new(store: Arc<GraphStore>, behavior: PostureProfile) -> Self {
        VerifierAdapter {
            store,
            behavior,
            last_run: Mutex::new(None),
        }
    }

    /// Whether enough time has passed since the last completed sweep for
    /// another one to be due, per the profile's `verify_interval`.
    async fn is_due(&self) -> bool {
        match *self.last_run.lock().await {
            None => true,
            Some(last) => Utc::now() - last >= chrono::Duration::from_std(self.behavior.verify_interval).unwrap_or_default(),
        }
    }

    async fn ping(&self, ip: IpAddr) -> Option<f64> {
        let timeout_secs = self.behavior.timeout_secs.max(1);
        let output = Command::new("ping")
            .args(["-c", "1", "-W", &timeout_secs.to_string(), &ip.to_string()])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_ping_latency(&String::from_utf8_lossy(&output.stdout))
    }

    async fn reverify_ports(&self, ip: IpAddr, candidates: &[u16]) -> Vec<u16> {
        let timeout_duration = Duration::from_secs(self.behavior.timeout_secs.max(1));
        let mut confirmed = Vec::new();
        for &port in candidates {
            if timeout(timeout_duration, TcpStream::connect((ip, port))).await.is_ok_and(|r| r.is_ok()) {
                confirmed.push(port);
            }
        }
        confirmed
    }

    async fn reverse_dns(&self, ip: IpAddr) -> Option<String> {
        let output = Command::new("getent")
            .args(["hosts", &ip.to_string()])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_getent_hostname(&String::from_utf8_lossy(&output.stdout))
    }

    async fn ssh_banner_hostname(&self, ip: IpAddr, open_ports: &[u16]) -> Option<String> {
        if !open_ports.contains(&22) {
            return None;
        }
        let timeout_duration = Duration::from_secs(self.behavior.timeout_secs.max(1));
        let mut stream = timeout(timeout_duration, TcpStream::connect((ip, 22))).await.ok()?.ok()?;
        let mut buf = [0u8; 256];
        let n = timeout(timeout_duration, stream.read(&mut buf)).await.ok()?.ok()?;
        fqdn_token(&String::from_utf8_lossy(&buf[..n]))
    }

    async fn arp_mac(&self, ip: IpAddr) -> Option<String> {
        let table = tokio::fs::read_to_string("/proc/net/arp").await.ok()?;
        lookup_arp_mac(&table, &ip.to_string())
    }

    async fn reverify(&self, node: &Node) -> Option<(Node, NodeStatus)> {
        let ip: IpAddr = node.ip.parse().ok()?;
        let candidate_ports: Vec<u16> = node
            .properties
            .get("open_ports")
            .and_then(|v| match v {
                PropertyValue::Ports(ports) => Some(ports.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let latency = self.ping(ip).await;
        let confirmed = self.reverify_ports(ip, &candidate_ports).await;
        let reachable = latency.is_some() || !confirmed.is_empty();
        if !reachable {
            return Some((Node::new(node.id.clone(), node.ip.clone(), Utc::now()), NodeStatus::Unreachable));
        }

        let status = if confirmed.is_empty() { NodeStatus::Degraded } else { NodeStatus::Verified };

        let now = Utc::now();
        let mut fragment_node = Node::new(node.id.clone(), node.ip.clone(), now);
        fragment_node
            .properties
            .insert("open_ports".to_string(), PropertyValue::Ports(confirmed.clone()));

        let mut capability = specularium_core::capability::Capability::new("reachable");
        capability.add_evidence(Evidence::new(
            "network",
            "open_ports",
            PropertyValue::Ports(confirmed.clone()),
            EvidenceSource::ServiceBanner,
            now,
        ));
        fragment_node.capabilities.insert("reachable".to_string(), capability);

        if let Some(hostname) = self.reverse_dns(ip).await {
            fragment_node
                .hostname
                .observe(HostnameCandidate::new(hostname, HostnameSource::ReverseDns, now));
        }
        if let Some(hostname) = self.ssh_banner_hostname(ip, &confirmed).await {
            fragment_node
                .hostname
                .observe(HostnameCandidate::new(hostname, HostnameSource::ServiceBanner, now));
        }
        if let Some(mac) = self.arp_mac(ip).await {
            fragment_node
                .properties
                .insert("mac_address".to_string(), PropertyValue::Text(mac));
        }

        Some((fragment_node, status))
    }
}

fn parse_ping_latency(output: &str) -> Option<f64> {
    let marker = output.find("time=")?;
    let rest = &output[marker + "time=".len()..];
    let end = rest.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    rest[..end].parse().ok()
}

fn parse_getent_hostname(output: &str) -> Option<String> {
    output.lines().next()?.split_whitespace().nth(1).map(str::to_string)
}

/// Scans whitespace-delimited tokens in a service banner for the first
/// one that looks like a fully-qualified hostname (contains a `.` and
/// no `/`).
fn fqdn_token(banner: &str) -> Option<String> {
    banner
        .split(|c: char| c.is_whitespace() || c == ',')
        .find(|token| token.contains('.') && !token.contains('/') && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'))
        .map(str::to_string)
}

/// Parses `/proc/net/arp`'s fixed-column table, returning the hardware
/// address for `ip` unless it's the kernel's unresolved placeholder.
fn lookup_arp_mac(table: &str, ip: &str) -> Option<String> {
    for line in table.lines().skip(1) {
        let mut columns = line.split_whitespace();
        let row_ip = columns.next()?;
        if row_ip != ip {
            continue;
        }
        let mac = columns.nth(2)?;
        if mac == "00:00:00:00:00:00" {
            return None;
        }
        return Some(mac.to_string());
    }
    None
}

#[async_trait]
impl Adapter for VerifierAdapter {
    fn name(&self) -> &str {
        "verifier"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Polling
    }

    fn priority(&self) -> u8 {
        50
    }

    async fn sync(&self) -> Result<GraphFragment, AdapterError> {
        if !self.is_due().await {
            return Ok(GraphFragment::new());
        }

        let mut fragment = GraphFragment::new();
        for node in self.store.nodes() {
            if let Some((mut reverified, status)) = self.reverify(&node).await {
                let now = Utc::now();
                reverified.set_status(status, now);
                fragment = fragment.with_node(reverified);
            }
        }

        *self.last_run.lock().await = Some(Utc::now());
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_latency_from_ping_output() {
        let output = "64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=1.23 ms\n";
        assert_eq!(parse_ping_latency(output), Some(1.23));
    }

    #[test]
    fn missing_time_field_yields_no_latency() {
        assert_eq!(parse_ping_latency("Destination Host Unreachable"), None);
    }

    #[test]
    fn parses_hostname_from_getent_output() {
        let output = "10.0.0.1         db1.internal.lan db1\n";
        assert_eq!(parse_getent_hostname(output), Some("db1.internal.lan".to_string()));
    }

    #[test]
    fn fqdn_token_finds_dotted_host_in_banner() {
        let banner = "220 mail.internal.lan ESMTP Postfix";
        assert_eq!(fqdn_token(banner), Some("mail.internal.lan".to_string()));
    }

    #[test]
    fn fqdn_token_is_none_without_a_dotted_candidate() {
        let banner = "SSH-2.0-OpenSSH_8.9";
        assert_eq!(fqdn_token(banner), None);
    }

    #[test]
    fn arp_lookup_skips_unresolved_entries() {
        let table = "IP address       HW type     Flags       HW address            Mask     Device\n\
                      10.0.0.1          0x1         0x2         aa:bb:cc:dd:ee:ff      *        eth0\n\
                      10.0.0.2          0x1         0x0         00:00:00:00:00:00      *        eth0\n";
        assert_eq!(lookup_arp_mac(table, "10.0.0.1"), Some("aa:bb:cc:dd:ee:ff".to_string()));
        assert_eq!(lookup_arp_mac(table, "10.0.0.2"), None);
    }

    #[tokio::test]
    async fn empty_store_produces_an_empty_fragment() {
        let store = Arc::new(GraphStore::new());
        let adapter = VerifierAdapter::new(store, specularium_config::Posture::Cautious.profile());
        let fragment = adapter.sync().await.unwrap();
        assert!(fragment.is_empty());
    }

    #[tokio::test]
    async fn second_sweep_within_the_interval_is_skipped() {
        let store = Arc::new(GraphStore::new());
        let adapter = VerifierAdapter::new(store, specularium_config::Posture::Aggressive.profile());
        adapter.sync().await.unwrap();
        *adapter.last_run.lock().await = Some(Utc::now());
        let fragment = adapter.sync().await.unwrap();
        assert!(fragment.is_empty());
    }
}
