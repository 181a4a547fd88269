//! Concrete adapters built on the [`specularium_adapter`] framework.

pub mod bootstrap_adapter;
pub mod cidr;
pub mod error;
pub mod nmap;
pub mod node_type;
pub mod ssh_probe;
pub mod subnet_scanner;
pub mod verifier;

pub use bootstrap_adapter::BootstrapAdapter;
pub use error::AdaptersError;
pub use nmap::NmapAdapter;
pub use node_type::infer_node_type;
pub use ssh_probe::SshProbeAdapter;
pub use subnet_scanner::SubnetScannerAdapter;
pub use verifier::VerifierAdapter;
