//! Registry: owns every adapter instance, starts and stops them, and
//! drives sync sweeps in priority order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use specularium_core::fragment::GraphFragment;

use crate::adapter::Adapter;
use crate::error::AdapterError;
use crate::event::{AdapterEvent, EventBus};

pub struct Registry {
    adapters: RwLock<BTreeMap<String, Arc<dyn Adapter>>>,
    events: EventBus,
}

impl Registry {
    pub fn new(events: EventBus) -> Self {
        Registry {
            adapters: RwLock::new(BTreeMap::new()),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn register(&self, adapter: Arc<dyn Adapter>) -> Result<(), AdapterError> {
        let name = adapter.name().to_string();
        let mut adapters = self.adapters.write().await;
        if adapters.contains_key(&name) {
            return Err(AdapterError::AlreadyRegistered(name));
        }
        adapters.insert(name, adapter);
        Ok(())
    }

    /// Starts every registered adapter, highest priority first. An
    /// adapter that fails to start is logged and skipped rather than
    /// aborting the remaining starts, matching the bootstrap engine's
    /// isolated-failure model.
    #[instrument(skip(self))]
    pub async fn start_all(&self) {
        for adapter in self.ordered_by_priority().await {
            let name = adapter.name().to_string();
            match adapter.start().await {
                Ok(()) => {
                    self.events.emit(AdapterEvent::Started { adapter: name.clone() });
                    info!(adapter = %name, "adapter started");
                }
                Err(error) => {
                    warn!(adapter = %name, %error, "adapter failed to start");
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn stop_all(&self) {
        for adapter in self.ordered_by_priority().await {
            let name = adapter.name().to_string();
            if let Err(error) = adapter.stop().await {
                warn!(adapter = %name, %error, "adapter failed to stop cleanly");
            }
            self.events.emit(AdapterEvent::Stopped { adapter: name });
        }
    }

    /// Runs one adapter's sync and returns its fragment. Errors are
    /// returned to the caller rather than swallowed, since a single
    /// triggered sync usually has someone waiting on the result.
    #[instrument(skip(self))]
    pub async fn trigger_sync(&self, name: &str) -> Result<GraphFragment, AdapterError> {
        let adapter = {
            let adapters = self.adapters.read().await;
            adapters
                .get(name)
                .cloned()
                .ok_or_else(|| AdapterError::NotRegistered(name.to_string()))?
        };

        self.events.emit(AdapterEvent::SyncStarted {
            adapter: name.to_string(),
        });

        match adapter.sync().await {
            Ok(fragment) => {
                self.events.emit(AdapterEvent::SyncCompleted {
                    adapter: name.to_string(),
                    nodes: fragment.nodes.len(),
                    edges: fragment.edges.len(),
                });
                Ok(fragment)
            }
            Err(error) => {
                self.events.emit(AdapterEvent::SyncFailed {
                    adapter: name.to_string(),
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Runs every adapter's sync, highest priority first, and returns
    /// the fragments that succeeded along with the adapter name and
    /// priority that produced each one, so a caller reconciling them
    /// can enforce source-authority ordering. One adapter's failure
    /// never prevents the others from running; callers wanting to know
    /// about failures should watch the event bus.
    #[instrument(skip(self))]
    pub async fn trigger_sync_all(&self) -> Vec<(String, u8, GraphFragment)> {
        let mut fragments = Vec::new();
        for adapter in self.ordered_by_priority().await {
            let name = adapter.name().to_string();
            let priority = adapter.priority();
            if let Ok(fragment) = self.trigger_sync(&name).await {
                fragments.push((name, priority, fragment));
            }
        }
        fragments
    }

    async fn ordered_by_priority(&self) -> Vec<Arc<dyn Adapter>> {
        let adapters = self.adapters.read().await;
        let mut list: Vec<_> = adapters.values().cloned().collect();
        list.sort_by(|a, b| b.priority().cmp(&a.priority()));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAdapter {
        name: String,
        priority: u8,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Adapter for CountingAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::Oneshot
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        async fn sync(&self) -> Result<GraphFragment, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GraphFragment::new())
        }
    }

    #[tokio::test]
    async fn trigger_sync_all_runs_every_adapter() {
        let registry = Registry::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));

        registry
            .register(Arc::new(CountingAdapter {
                name: "a".into(),
                priority: 10,
                calls: calls.clone(),
            }))
            .await
            .unwrap();
        registry
            .register(Arc::new(CountingAdapter {
                name: "b".into(),
                priority: 90,
                calls: calls.clone(),
            }))
            .await
            .unwrap();

        registry.trigger_sync_all().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let registry = Registry::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = Arc::new(CountingAdapter {
            name: "a".into(),
            priority: 10,
            calls,
        });
        registry.register(adapter.clone()).await.unwrap();
        let result = registry.register(adapter).await;
        assert!(matches!(result, Err(AdapterError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn trigger_sync_on_unknown_adapter_errors() {
        let registry = Registry::new(EventBus::new());
        let result = registry.trigger_sync("ghost").await;
        assert!(matches!(result, Err(AdapterError::NotRegistered(_))));
    }
}
