mod build;
mod graph;
mod index;

pub use build::{BuildReport, NetworkGraphBuilder};
pub use graph::{Edge, EdgeId, Graph, NodeId};
pub use index::{EdgeHit, SegmentIndex};
