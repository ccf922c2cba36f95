mod district;
mod hex;
mod overlay;
mod record;
mod summary;

pub use district::{DistrictAggregator, DistrictCoverage, DistrictReport};
pub use hex::{HexAggregator, HexCoverage, HexReport};
pub use record::{CoverageRecord, GroupCoverage};
pub use summary::{CoverageSummary, UnitRatio};
