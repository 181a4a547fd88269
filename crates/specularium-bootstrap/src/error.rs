use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("phase '{phase}' probe failed: {reason}")]
    ProbeFailed { phase: &'static str, reason: String },

    #[error("io error during bootstrap: {0}")]
    Io(#[from] std::io::Error),
}
