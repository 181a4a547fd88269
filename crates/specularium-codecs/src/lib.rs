//! Import/export pairs for moving graph data in and out of the engine:
//! the canonical lossless JSON format, a simplified YAML shape for
//! external tools, and an Ansible inventory target.

pub mod ansible;
pub mod error;
pub mod json;
pub mod traits;
pub mod yaml;

pub use ansible::AnsibleInventoryCodec;
pub use error::CodecError;
pub use json::JsonCodec;
pub use traits::{Exporter, Importer};
pub use yaml::YamlGraphCodec;
