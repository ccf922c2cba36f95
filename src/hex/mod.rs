mod grid;

pub use grid::{HexCell, HexGridGenerator, HexId};
