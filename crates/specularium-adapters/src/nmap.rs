//! nmap wrapper: shells out to the system `nmap` binary for OS and
//! service fingerprinting the scanner's raw connect probes can't do,
//! and parses its greppable output format.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::sync::Mutex;

use specularium_adapter::adapter::{Adapter, AdapterKind};
use specularium_adapter::error::AdapterError;
use specularium_config::PostureProfile;
use specularium_core::evidence::{Evidence, EvidenceSource};
use specularium_core::fragment::GraphFragment;
use specularium_core::node::Node;
use specularium_core::property::{OsInfo, PortInfo, PropertyValue};
use specularium_reconcile::GraphStore;

pub struct NmapAdapter {
    store: Arc<GraphStore>,
    behavior: PostureProfile,
    binary: String,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl NmapAdapter {
    pub fn new(store: Arc<GraphStore>, behavior: PostureProfile) -> Self {
        NmapAdapter {
            store,
            behavior,
            binary: "nmap".to_string(),
            last_run: Mutex::new(None),
        }
    }

    /// Whether enough time has passed since the last completed sweep for
    /// another one to be due, per the profile's `scan_interval`.
    async fn is_due(&self) -> bool {
        match *self.last_run.lock().await {
            None => true,
            Some(last) => Utc::now() - last >= chrono::Duration::from_std(self.behavior.scan_interval).unwrap_or_default(),
        }
    }

    async fn scan_host(&self, ip: &str) -> Option<(BTreeMap<u16, PortInfo>, Option<OsInfo>)> {
        let retries = self.behavior.retries.max(1);
        for attempt in 0..retries {
            let output = Command::new(&self.binary)
                .args(["-oG", "-", "--open", "-T4", ip])
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .output()
                .await
                .ok()?;

            if output.status.success() {
                let text = String::from_utf8_lossy(&output.stdout);
                return Some(parse_greppable(&text));
            }
            tracing::debug!(ip, attempt, "nmap invocation failed, retrying");
        }
        None
    }
}

/// Parses nmap's `-oG` greppable output: a `Ports:` field of
/// `port/state/proto/.../service/...` entries separated by commas.
fn parse_greppable(text: &str) -> (BTreeMap<u16, PortInfo>, Option<OsInfo>) {
    let mut ports = BTreeMap::new();
    for line in text.lines() {
        let Some(ports_field) = line.split("Ports: ").nth(1) else {
            continue;
        };
        let ports_field = ports_field.split('\t').next().unwrap_or(ports_field);
        for entry in ports_field.split(", ") {
            let fields: Vec<&str> = entry.split('/').collect();
            if fields.len() < 5 {
                continue;
            }
            let Ok(port) = fields[0].parse::<u16>() else {
                continue;
            };
            if fields[1] != "open" {
                continue;
            }
            let service = fields[4];
            ports.insert(
                port,
                PortInfo {
                    port,
                    service: if service.is_empty() { None } else { Some(service.to_string()) },
                    banner: None,
                },
            );
        }
    }
    (ports, None)
}

#[async_trait]
impl Adapter for NmapAdapter {
    fn name(&self) -> &str {
        "nmap"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Polling
    }

    fn priority(&self) -> u8 {
        80
    }

    async fn sync(&self) -> Result<GraphFragment, AdapterError> {
        if !self.is_due().await {
            return Ok(GraphFragment::new());
        }

        let mut fragment = GraphFragment::new();
        for node in self.store.nodes() {
            let Some((services, os_info)) = self.scan_host(&node.ip).await else {
                continue;
            };
            if services.is_empty() {
                continue;
            }

            let now = Utc::now();
            let mut fragment_node = Node::new(node.id.clone(), node.ip.clone(), now);
            fragment_node
                .properties
                .insert("services".to_string(), PropertyValue::Services(services.clone()));
            if let Some(os) = os_info.clone() {
                fragment_node.properties.insert("os_info".to_string(), PropertyValue::OsInfo(os));
            }

            let mut capability = specularium_core::capability::Capability::new("service_fingerprint");
            capability.add_evidence(Evidence::new(
                "network",
                "services",
                PropertyValue::Services(services),
                EvidenceSource::ServiceBanner,
                now,
            ));
            fragment_node
                .capabilities
                .insert("service_fingerprint".to_string(), capability);

            fragment = fragment.with_node(fragment_node);
        }
        *self.last_run.lock().await = Some(Utc::now());
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_ports_from_greppable_output() {
        let text = "Host: 10.0.0.1 ()\tPorts: 22/open/tcp//ssh///, 80/open/tcp//http///\n";
        let (ports, _) = parse_greppable(text);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[&22].service.as_deref(), Some("ssh"));
    }

    #[test]
    fn skips_closed_ports() {
        let text = "Host: 10.0.0.1 ()\tPorts: 23/closed/tcp//telnet///\n";
        let (ports, _) = parse_greppable(text);
        assert!(ports.is_empty());
    }
}
