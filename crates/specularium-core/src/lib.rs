//! Domain model shared by every other crate in the workspace: nodes,
//! edges, evidence, capabilities, hostname inference, operator truth,
//! discrepancies, secrets metadata, and the graph fragments adapters
//! hand to the reconciler.

pub mod capability;
pub mod edge;
pub mod error;
pub mod evidence;
pub mod fragment;
pub mod hostname;
pub mod node;
pub mod property;
pub mod secret;
pub mod truth;

pub mod prelude {
    pub use crate::capability::{Capability, CapabilityStatus};
    pub use crate::edge::{Edge, EdgeType};
    pub use crate::error::CoreError;
    pub use crate::evidence::{Evidence, EvidenceSource};
    pub use crate::fragment::GraphFragment;
    pub use crate::hostname::{HostnameCandidate, HostnameInference, HostnameSource};
    pub use crate::node::{Node, NodeStatus, NodeType};
    pub use crate::property::{OsInfo, PortInfo, PropertyBag, PropertyValue};
    pub use crate::secret::{SecretSource, SecretStatus, SecretSummary, SecretType};
    pub use crate::truth::{check_truth, Discrepancy, NodeTruth, Resolution, TruthableKey};
}
