//! Adapter framework: the trait concrete adapters implement, the
//! registry that owns and drives them, and the event bus that reports
//! what they're doing.

pub mod adapter;
pub mod error;
pub mod event;
pub mod registry;

pub use adapter::{Adapter, AdapterKind, ProgressAdapter, PushAdapter, WebhookAdapter};
pub use error::AdapterError;
pub use event::{AdapterEvent, EventBus};
pub use registry::Registry;
