mod generate;
mod parks;

pub use generate::{Candidate, EntranceGenerator, EntrancePoint, EntranceSet};
pub use parks::ParkUnit;
