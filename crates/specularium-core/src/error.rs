use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid property value for key '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("node '{id}' has no entry for discovered key '{key}'")]
    MissingDiscoveredKey { id: String, key: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
