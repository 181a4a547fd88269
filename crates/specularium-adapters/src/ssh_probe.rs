//! SSH probe: confirms a node actually accepts the credential it's
//! configured with, rather than just having port 22 open. Shells out
//! to the system `ssh` client since the workspace carries no native
//! SSH protocol implementation.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::sync::Mutex;

use specularium_adapter::adapter::{Adapter, AdapterKind};
use specularium_adapter::error::AdapterError;
use specularium_capability::{CapabilityManager, Credential};
use specularium_config::PostureProfile;
use specularium_core::evidence::{Evidence, EvidenceSource};
use specularium_core::fragment::GraphFragment;
use specularium_core::node::Node;
use specularium_core::property::PropertyValue;
use specularium_reconcile::GraphStore;

pub struct SshProbeAdapter {
    store: Arc<GraphStore>,
    capabilities: Arc<CapabilityManager>,
    credential_reference: String,
    behavior: PostureProfile,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl SshProbeAdapter {
    pub fn new(
        store: Arc<GraphStore>,
        capabilities: Arc<CapabilityManager>,
        credential_reference: impl Into<String>,
        behavior: PostureProfile,
    ) -> Self {
        SshProbeAdapter {
            store,
            capabilities,
            credential_reference: credential_reference.into(),
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

    async fn probe(&self, ip: &str, credential: &Credential) -> bool {
        let key_path = match credential {
            Credential::SshKey { private_key_path, .. } => private_key_path.clone(),
            _ => return false,
        };

        let status = Command::new("ssh")
            .args([
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                &format!("ConnectTimeout={}", self.behavior.timeout_secs.max(1)),
                "-i",
                &key_path,
                ip,
                "true",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        matches!(status, Ok(exit) if exit.success())
    }
}

#[async_trait]
impl Adapter for SshProbeAdapter {
    fn name(&self) -> &str {
        "ssh_probe"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Polling
    }

    fn priority(&self) -> u8 {
        60
    }

    async fn sync(&self) -> Result<GraphFragment, AdapterError> {
        if !self.is_due().await {
            return Ok(GraphFragment::new());
        }

        let credential = match self.capabilities.get_secret(&self.credential_reference) {
            Ok(credential) => credential,
            Err(_) => return Ok(GraphFragment::new()),
        };

        let mut fragment = GraphFragment::new();
        for node in self.store.nodes() {
            let has_ssh_port = node
                .properties
                .get("open_ports")
                .and_then(|v| match v {
                    PropertyValue::Ports(ports) => Some(ports.contains(&22)),
                    _ => None,
                })
                .unwrap_or(false);
            if !has_ssh_port {
                continue;
            }

            if self.probe(&node.ip, &credential).await {
                let now = Utc::now();
                let mut fragment_node = Node::new(node.id.clone(), node.ip.clone(), now);
                let mut capability = specularium_core::capability::Capability::new("ssh");
                capability.add_evidence(Evidence::new(
                    "capability",
                    "ssh",
                    PropertyValue::Bool(true),
                    EvidenceSource::CredentialedShellProbe,
                    now,
                ));
                fragment_node.capabilities.insert("ssh".to_string(), capability);
                fragment = fragment.with_node(fragment_node);
            }
        }
        *self.last_run.lock().await = Some(Utc::now());
        Ok(fragment)
    }
}
