//! The adapter contract. Every concrete adapter (subnet scanner,
//! verifier, nmap wrapper, SSH probe, bootstrap) implements
//! [`Adapter`]; adapters that accept data pushed to them, serve
//! webhooks, or report fractional progress also implement the relevant
//! optional trait.

use async_trait::async_trait;
use specularium_core::fragment::GraphFragment;

use crate::error::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// Runs once and produces a fragment, then is done (bootstrap, a
    /// one-shot subnet sweep).
    Oneshot,
    /// Runs its `sync` repeatedly on a schedule the registry drives.
    Polling,
    /// Produces fragments only in response to an inbound webhook call.
    Webhook,
    /// Both polls and accepts pushed updates.
    Bidirectional,
}

#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> AdapterKind;

    /// Higher runs first when the registry triggers a full sync sweep.
    /// The bootstrap adapter runs at priority 0 so every other adapter
    /// observes an already-bootstrapped environment.
    fn priority(&self) -> u8 {
        50
    }

    async fn start(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn sync(&self) -> Result<GraphFragment, AdapterError>;
}

/// An adapter that can also accept a fragment pushed to it out of band
/// (for example, an operator-triggered re-scan of one host) rather than
/// only producing fragments from its own `sync`.
#[async_trait]
pub trait PushAdapter: Adapter {
    async fn push(&self, fragment: GraphFragment) -> Result<(), AdapterError>;
}

/// An adapter whose fragments arrive via an inbound HTTP callback
/// instead of polling. The registry itself does not serve HTTP; a
/// caller wires `handle_webhook` to whatever receives the callback.
#[async_trait]
pub trait WebhookAdapter: Adapter {
    async fn handle_webhook(&self, payload: &[u8]) -> Result<GraphFragment, AdapterError>;
}

/// An adapter that can report how far through its current sync it is,
/// for adapters whose sync takes long enough that a caller wants to
/// show progress (an nmap sweep of a large subnet, for instance).
pub trait ProgressAdapter: Adapter {
    /// Fraction complete, `0.0..=1.0`, or `None` if no sync is running.
    fn progress(&self) -> Option<f32>;
}
