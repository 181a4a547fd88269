//! Bootstrap-as-adapter: wraps the bootstrap engine so it runs through
//! the same registry every other adapter does, at priority 0 so its
//! fragment (and the posture it recommends) lands before anything else
//! syncs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use specularium_adapter::adapter::{Adapter, AdapterKind};
use specularium_adapter::error::AdapterError;
use specularium_bootstrap::BootstrapEngine;
use specularium_config::Mode;
use specularium_core::fragment::GraphFragment;
use specularium_core::node::{Node, NodeType};
use specularium_core::property::PropertyValue;

pub struct BootstrapAdapter {
    engine: BootstrapEngine,
    recommended_mode: RwLock<Option<Mode>>,
}

impl BootstrapAdapter {
    pub fn new() -> Self {
        BootstrapAdapter {
            engine: BootstrapEngine::new(),
            recommended_mode: RwLock::new(None),
        }
    }

    pub async fn recommended_mode(&self) -> Option<Mode> {
        *self.recommended_mode.read().await
    }
}

impl Default for BootstrapAdapter {
    fn default() -> Self {
        BootstrapAdapter::new()
    }
}

#[async_trait]
impl Adapter for BootstrapAdapter {
    fn name(&self) -> &str {
        "bootstrap"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Oneshot
    }

    fn priority(&self) -> u8 {
        0
    }

    async fn sync(&self) -> Result<GraphFragment, AdapterError> {
        let report = self.engine.run().await;
        *self.recommended_mode.write().await = Some(report.recommended_mode);

        let mut node = Node::new("self", "127.0.0.1", chrono::Utc::now());
        node.node_type = NodeType::SelfNode;
        for key in report.evidence.keys() {
            if let Some(value) = report.evidence.best_value(key) {
                node.properties.insert(key.to_string(), value.clone());
            }
        }
        node.properties.insert(
            "recommended_mode".to_string(),
            PropertyValue::Text(format!("{:?}", report.recommended_mode)),
        );

        Ok(GraphFragment::new().with_node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sync_populates_recommended_mode() {
        let adapter = BootstrapAdapter::new();
        adapter.sync().await.unwrap();
        assert!(adapter.recommended_mode().await.is_some());
    }
}
