mod area;
mod csr;
mod dijkstra;
mod solve;
mod walkable;

pub use area::ReachableSpan;
pub use solve::{ServiceArea, ServiceAreaSolver};
pub use walkable::WalkableArea;
