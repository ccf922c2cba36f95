mod dissolve;
mod geom;
mod rtree;

pub(crate) use dissolve::*;
pub(crate) use geom::*;
pub(crate) use rtree::*;
