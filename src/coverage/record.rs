use serde::Serialize;

/// `part / whole`, or 0 when `whole` is not positive.
#[inline]
pub(crate) fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

/// Totals of one demographic group within a unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupCoverage {
    pub name: String,
    pub total: f64,
    pub accessible: f64,
    pub ratio: f64,
}

/// Population and area coverage of one unit (district or hex cell).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CoverageRecord {
    pub total_population: f64,
    pub accessible_population: f64,
    pub population_ratio: f64,
    pub total_area: f64,
    pub accessible_area: f64,
    pub area_ratio: f64,
    pub points_with_access: usize,
    pub points_without_access: usize,
    pub groups: Vec<GroupCoverage>,
}

impl CoverageRecord {
    /// True if any population in the unit can reach a park.
    #[inline] pub fn has_access(&self) -> bool { self.accessible_population > 0.0 }

    #[inline] pub fn point_count(&self) -> usize { self.points_with_access + self.points_without_access }

    /// Population ratio as a percentage.
    #[inline] pub fn population_percent(&self) -> f64 { self.population_ratio * 100.0 }

    /// Area ratio as a percentage.
    #[inline] pub fn area_percent(&self) -> f64 { self.area_ratio * 100.0 }
}
