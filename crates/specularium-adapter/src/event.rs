//! Event bus: broadcasts adapter lifecycle and progress events to
//! whatever is watching (the CLI's status line today, potentially more
//! than one subscriber later). Dispatch never blocks on subscribers and
//! never fails the caller if nobody is listening.

use std::collections::BTreeMap;

use tokio::sync::broadcast;
use tracing::trace;

use specularium_core::property::PortInfo;

/// Ring buffer depth for the broadcast channel. Sized to absorb a burst
/// from every adapter syncing at once without triggering a lagged
/// receiver under normal operation.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum AdapterEvent {
    Started { adapter: String },
    Stopped { adapter: String },
    SyncStarted { adapter: String },
    SyncCompleted { adapter: String, nodes: usize, edges: usize },
    SyncFailed { adapter: String, error: String },
    Progress { adapter: String, percent: f32, message: String },
    /// A discovery sweep (subnet scan or verification pass) has begun.
    DiscoveryStarted {
        adapter: String,
        phase: String,
        total: usize,
        message: String,
    },
    /// One host's discovery/verification result within a sweep already
    /// announced by `DiscoveryStarted`.
    DiscoveryProgress {
        adapter: String,
        phase: String,
        node_id: Option<String>,
        ip: Option<String>,
        ports: Option<Vec<u16>>,
        services: Option<BTreeMap<u16, PortInfo>>,
        mac: Option<String>,
        hostname: Option<String>,
        latency: Option<f64>,
        error: Option<String>,
    },
    /// A discovery sweep has finished.
    DiscoveryComplete {
        adapter: String,
        total: usize,
        discovered: usize,
        verified: usize,
        unreachable: usize,
        degraded: usize,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AdapterEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdapterEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: AdapterEvent) {
        match self.sender.send(event) {
            Ok(_subscribers) => {}
            Err(broadcast::error::SendError(event)) => {
                trace!(?event, "no subscribers for adapter event");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(AdapterEvent::Started {
            adapter: "subnet_scanner".into(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AdapterEvent::Started { .. }));
    }

    #[tokio::test]
    async fn emit_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit(AdapterEvent::Stopped {
            adapter: "verifier".into(),
        });
    }
}
