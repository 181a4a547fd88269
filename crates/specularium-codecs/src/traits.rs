use specularium_core::edge::Edge;
use specularium_core::fragment::GraphFragment;
use specularium_core::node::Node;

use crate::error::CodecError;

pub trait Importer {
    fn parse(&self, input: &str) -> Result<GraphFragment, CodecError>;
}

pub trait Exporter {
    fn export(&self, nodes: &[Node], edges: &[Edge]) -> Result<String, CodecError>;
}
