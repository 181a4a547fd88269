use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("adapter '{0}' failed to start: {1}")]
    StartFailed(String, String),

    #[error("adapter '{0}' sync failed: {1}")]
    SyncFailed(String, String),

    #[error("adapter '{0}' does not support webhook delivery")]
    NotAWebhookAdapter(String),

    #[error("adapter '{0}' is not registered")]
    NotRegistered(String),

    #[error("adapter '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
