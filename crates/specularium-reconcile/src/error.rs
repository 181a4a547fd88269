use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("node '{0}' referenced by an edge does not exist")]
    DanglingEdgeEndpoint(String),
}
