use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("no secret registered for reference '{0}'")]
    Unknown(String),

    #[error("secret '{reference}' could not be read: {source}")]
    Unreadable {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("environment variable '{0}' is not set")]
    EnvVarMissing(String),

    #[error("secret source for '{0}' is not supported in this build")]
    UnsupportedSource(String),

    #[error("secret '{0}' resolved to an empty value")]
    Empty(String),
}
