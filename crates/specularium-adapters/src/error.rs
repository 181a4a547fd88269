use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdaptersError {
    #[error("invalid CIDR block '{0}'")]
    InvalidCidr(String),

    #[error("command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("no credential available for reference '{0}'")]
    NoCredential(String),
}

impl From<AdaptersError> for specularium_adapter::AdapterError {
    fn from(error: AdaptersError) -> Self {
        specularium_adapter::AdapterError::SyncFailed("adapters".to_string(), error.to_string())
    }
}
