use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("malformed inventory at line {line}: {reason}")]
    Inventory { line: usize, reason: String },
}
